//! The events-per-second admission control core.
//!
//! `EpsLimiter` gates each event-processing operation behind a pool of
//! credits refilled on a sliding timeframe. Ingestion workers call
//! [`EpsLimiter::acquire_credit`] before processing an event; a ticker
//! (driven by [`EpsLimiter::spawn_ticker`] or, in tests, by direct calls to
//! [`EpsLimiter::tick`]) advances the window once per second, retiring the
//! oldest slot of consumption back into circulation.
//!
//! The limiter is a plain value — share it behind an `Arc` rather than a
//! process-global static, per the redesign direction in SPEC_FULL.md.

pub mod config;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

pub use config::{
    ConfigSource, EnvConfigSource, JsonFileConfigSource, LimitsDocument, StaticConfigSource,
    DISABLED_SENTINEL,
};

const MAX_EPS: u32 = 100_000;
const MIN_EPS: u32 = 1;
const DEFAULT_TIMEFRAME: u32 = 10;
const MIN_TIMEFRAME: u32 = 1;
const MAX_TIMEFRAME: u32 = 3_600;

/// Fatal failures of the limiter subsystem. Configuration faults are never
/// represented here — they are always recovered locally via coercion or
/// disablement (see [`EpsLimiter::load`]).
#[derive(Debug, Error)]
pub enum EpsLimiterError {
    #[error("failed to allocate circular buffer for {timeframe} slots")]
    Alloc { timeframe: u32 },
}

/// A point-in-time snapshot of the limiter's configuration, useful for
/// health endpoints and tests. Not the limiter's internal representation —
/// the concurrency-sensitive fields (ring buffer, semaphore, wait counter)
/// live directly on [`EpsLimiter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitsState {
    pub enabled: bool,
    pub eps: u32,
    pub timeframe: u32,
    pub max_events: u32,
}

/// Coarse state machine described in SPEC_FULL.md §4.2.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterStatus {
    Disabled,
    Enabled,
    ShuttingDown,
}

struct RingState {
    circ_buf: Vec<u32>,
    current_cell: usize,
}

/// The EPS credit scheduler. Share via `Arc<EpsLimiter>`; all operations
/// take `&self`.
pub struct EpsLimiter {
    enabled: AtomicBool,
    shutting_down: AtomicBool,
    state: Mutex<LimitsState>,
    ring: Mutex<Option<RingState>>,
    credits: Semaphore,
    wait_counter: AtomicUsize,
}

impl EpsLimiter {
    /// A new limiter starts disabled, with no credits and an empty ring.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            enabled: AtomicBool::new(false),
            shutting_down: AtomicBool::new(false),
            state: Mutex::new(LimitsState::default()),
            ring: Mutex::new(None),
            credits: Semaphore::new(0),
            wait_counter: AtomicUsize::new(0),
        })
    }

    /// Whether admission control is currently active.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> LimiterStatus {
        if self.shutting_down.load(Ordering::SeqCst) {
            LimiterStatus::ShuttingDown
        } else if self.is_enabled() {
            LimiterStatus::Enabled
        } else {
            LimiterStatus::Disabled
        }
    }

    /// A snapshot of the current configuration.
    pub fn snapshot(&self) -> LimitsState {
        *self.state.lock().unwrap()
    }

    /// Number of acquirers currently blocked inside [`Self::acquire_credit`].
    pub fn wait_counter(&self) -> usize {
        self.wait_counter.load(Ordering::SeqCst)
    }

    /// Current pool size (available, unconsumed credits).
    pub fn available_credits(&self) -> usize {
        self.credits.available_permits()
    }

    /// Reads the configuration document from `source`, validates and
    /// coerces it, then initializes (or disables) the limiter. Idempotent —
    /// calling it again simply re-derives state from a fresh lookup. A
    /// no-op once the limiter has entered `SHUTTING_DOWN` (terminal state).
    ///
    /// Configuration faults are always recovered locally: every branch here
    /// either coerces to a safe default (warning) or falls back to disabled
    /// (informing). The only error this can return is a fatal circular
    /// buffer allocation failure.
    pub fn load(
        &self,
        daemon_name: &str,
        source: &dyn ConfigSource,
    ) -> Result<(), EpsLimiterError> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Ok(());
        }

        let (doc, status) = source.load_limits_file(daemon_name);

        if status == DISABLED_SENTINEL {
            tracing::info!("eps limit disabled");
            self.disable();
            return Ok(());
        }

        let eps = match doc.max_eps.as_ref().and_then(|v| v.as_f64()) {
            None => {
                tracing::warn!("eps limit not found, value set: '0'");
                tracing::info!("eps limit disabled");
                self.disable();
                return Ok(());
            }
            Some(n) if n == 0.0 => {
                tracing::warn!("eps limit not found, value set: '0'");
                tracing::info!("eps limit disabled");
                self.disable();
                return Ok(());
            }
            Some(n) if n > MAX_EPS as f64 => {
                tracing::warn!("eps limit exceeded, value set: '{}'", MAX_EPS);
                MAX_EPS
            }
            Some(n) => (n as u32).max(MIN_EPS),
        };

        let timeframe = match doc.timeframe_eps.as_ref().and_then(|v| v.as_f64()) {
            None => {
                tracing::warn!("timeframe not found, dafault value set: '10'");
                DEFAULT_TIMEFRAME
            }
            Some(n) if n == 0.0 => {
                tracing::warn!("timeframe limit exceeded, value set: '1'");
                MIN_TIMEFRAME
            }
            Some(n) if n > MAX_TIMEFRAME as f64 => {
                tracing::warn!("timeframe limit exceeded, value set: '{}'", MAX_TIMEFRAME);
                MAX_TIMEFRAME
            }
            Some(n) => (n as u32).max(MIN_TIMEFRAME),
        };

        self.enable(eps, timeframe)?;
        tracing::info!(
            "eps limit enabled, eps: '{}', timeframe: '{}', events per timeframe: '{}'",
            eps,
            timeframe,
            eps as u64 * timeframe as u64
        );
        Ok(())
    }

    fn enable(&self, eps: u32, timeframe: u32) -> Result<(), EpsLimiterError> {
        let max_events = eps * timeframe;

        let mut circ_buf = Vec::new();
        circ_buf
            .try_reserve_exact(timeframe as usize)
            .map_err(|_| EpsLimiterError::Alloc { timeframe })?;
        circ_buf.resize(timeframe as usize, 0);

        {
            let mut state = self.state.lock().unwrap();
            *state = LimitsState {
                enabled: true,
                eps,
                timeframe,
                max_events,
            };
        }
        {
            let mut ring = self.ring.lock().unwrap();
            *ring = Some(RingState {
                circ_buf,
                current_cell: 0,
            });
        }
        // The ticker fills the pool from zero; forget whatever remained
        // from a previous configuration so stale credits don't survive a
        // reload with a smaller ceiling.
        let stale = self.credits.available_permits();
        if stale > 0 {
            self.credits.forget_permits(stale);
        }
        self.enabled.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disable(&self) {
        {
            let mut state = self.state.lock().unwrap();
            *state = LimitsState::default();
        }
        {
            let mut ring = self.ring.lock().unwrap();
            *ring = None;
        }
        self.enabled.store(false, Ordering::SeqCst);
    }

    /// Blocks until a credit is available, then records the consumption in
    /// the slot the ticker is currently filling. A no-op when disabled.
    pub async fn acquire_credit(&self) {
        if !self.is_enabled() {
            return;
        }

        self.wait_counter.fetch_add(1, Ordering::SeqCst);
        let permit = self.credits.acquire().await;
        self.wait_counter.fetch_sub(1, Ordering::SeqCst);

        let Ok(permit) = permit else {
            // The semaphore is never closed in this design; shutdown
            // unblocks waiters by posting permits, not by closing it.
            return;
        };
        // The credit is spent, not returned to the pool.
        permit.forget();

        let mut ring = self.ring.lock().unwrap();
        if let Some(ring) = ring.as_mut() {
            let cell = ring.current_cell;
            ring.circ_buf[cell] += 1;
        }
    }

    /// Adds `n` credits to the pool without exceeding `max_events`.
    pub fn generate_credits(&self, n: u32) {
        if n == 0 {
            return;
        }
        let max_events = self.state.lock().unwrap().max_events;
        let current = self.credits.available_permits() as u32;
        let room = max_events.saturating_sub(current);
        let add = n.min(room);
        if add > 0 {
            self.credits.add_permits(add as usize);
        }
    }

    /// Removes up to `n` credits from the pool non-blockingly. If the pool
    /// holds fewer than `n`, stops at zero; the shortfall is not reported
    /// (see SPEC_FULL.md §9 open question decision).
    pub fn clean_credits(&self, n: u32) {
        let _ = self.credits.forget_permits(n as usize);
    }

    /// One sliding-window step: retires the next slot's consumption back
    /// into the pool and advances the slot the ticker is filling. A no-op
    /// while disabled.
    pub fn tick(&self) {
        let max_events = {
            let state = self.state.lock().unwrap();
            if !state.enabled {
                return;
            }
            state.max_events
        };

        let retired = {
            let mut ring = self.ring.lock().unwrap();
            let Some(ring) = ring.as_mut() else {
                return;
            };
            let timeframe = ring.circ_buf.len();
            let next_cell = (ring.current_cell + 1) % timeframe;
            let consumed = ring.circ_buf[next_cell];
            ring.circ_buf[next_cell] = 0;
            ring.current_cell = next_cell;
            consumed
        };

        let _ = max_events; // clamping happens inside generate_credits
        self.generate_credits(retired);
    }

    /// Releases all blocked acquirers, frees the ring buffer, and marks the
    /// limiter permanently disabled. Terminal: once shutting down, `load`
    /// is a no-op and the limiter never re-enables.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        let waiters = self.wait_counter.load(Ordering::SeqCst);
        // +1 tolerates a late entrant arriving between the waiter count
        // being read here and `disable()` taking effect.
        self.credits.add_permits(waiters + 1);
        self.disable();
    }

    /// Spawns a background task that calls [`Self::tick`] once per second
    /// until the returned handle is dropped.
    pub fn spawn_ticker(self: &Arc<Self>) -> TickerHandle {
        let limiter = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                limiter.tick();
            }
        });
        TickerHandle { task }
    }
}

/// Handle to a background ticker task. Dropping it stops the ticker.
pub struct TickerHandle {
    task: JoinHandle<()>,
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
