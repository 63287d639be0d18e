//! Configuration sources for the EPS limiter.
//!
//! `EpsLimiter::load` consumes a [`ConfigSource`] rather than reading any
//! particular storage directly, mirroring how the rest of the daemon keeps
//! collaborators behind narrow interfaces. Two production sources are
//! provided — a JSON file and the process environment — plus a static
//! in-memory source used by tests.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

/// Status returned by [`ConfigSource::load_limits_file`] meaning "admission
/// control is disabled by operator"; every other status means "present,
/// parse the document".
pub const DISABLED_SENTINEL: i32 = -2;

/// The two numeric fields read from the configuration document. Fields are
/// kept as raw [`Value`] so "present but non-numeric" is representable
/// distinctly from "absent" — `EpsLimiter::load` applies coercion on top.
#[derive(Debug, Clone, Default)]
pub struct LimitsDocument {
    pub max_eps: Option<Value>,
    pub timeframe_eps: Option<Value>,
}

impl LimitsDocument {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Lookup function abstraction for the limiter's configuration document.
pub trait ConfigSource: Send + Sync {
    fn load_limits_file(&self, daemon_name: &str) -> (LimitsDocument, i32);
}

/// A fixed document and status, for tests and simple embeddings.
#[derive(Debug, Clone)]
pub struct StaticConfigSource {
    document: LimitsDocument,
    status: i32,
}

impl StaticConfigSource {
    pub fn new(document: LimitsDocument, status: i32) -> Self {
        Self { document, status }
    }

    pub fn disabled() -> Self {
        Self::new(LimitsDocument::empty(), DISABLED_SENTINEL)
    }

    pub fn present(max_eps: impl Into<Value>, timeframe_eps: impl Into<Value>) -> Self {
        Self::new(
            LimitsDocument {
                max_eps: Some(max_eps.into()),
                timeframe_eps: Some(timeframe_eps.into()),
            },
            0,
        )
    }
}

impl ConfigSource for StaticConfigSource {
    fn load_limits_file(&self, _daemon_name: &str) -> (LimitsDocument, i32) {
        (self.document.clone(), self.status)
    }
}

/// Reads `max_eps`/`timeframe_eps` from a JSON file. A top-level
/// `"disabled": true` field is the on-disk spelling of the disabled
/// sentinel. A missing or unreadable file is treated as "present, empty
/// document" so the usual "eps limit not found" coercion path handles it —
/// a missing config file is not itself a fatal condition.
#[derive(Debug, Clone)]
pub struct JsonFileConfigSource {
    path: PathBuf,
}

impl JsonFileConfigSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ConfigSource for JsonFileConfigSource {
    fn load_limits_file(&self, daemon_name: &str) -> (LimitsDocument, i32) {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), daemon = daemon_name, error = %err, "failed to read eps limits file");
                return (LimitsDocument::empty(), 0);
            }
        };
        let parsed: Value = match serde_json::from_str(&contents) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), daemon = daemon_name, error = %err, "failed to parse eps limits file");
                return (LimitsDocument::empty(), 0);
            }
        };

        if parsed
            .get("disabled")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            return (LimitsDocument::empty(), DISABLED_SENTINEL);
        }

        (
            LimitsDocument {
                max_eps: parsed.get("max_eps").cloned(),
                timeframe_eps: parsed.get("timeframe_eps").cloned(),
            },
            0,
        )
    }
}

/// Reads `EPS_MAX`/`EPS_TIMEFRAME` from the process environment.
/// `EPS_DISABLED=1` (or `true`) is the environment spelling of the disabled
/// sentinel. Values that fail to parse as numbers are kept as strings so
/// the "present but non-numeric" coercion path is exercised the same way
/// it would be for a malformed file-backed document.
#[derive(Debug, Clone, Default)]
pub struct EnvConfigSource;

impl EnvConfigSource {
    pub fn new() -> Self {
        Self
    }

    fn env_value(var: &str) -> Option<Value> {
        let raw = env::var(var).ok()?;
        match raw.trim().parse::<f64>() {
            Ok(n) => serde_json::Number::from_f64(n).map(Value::Number),
            Err(_) => Some(Value::String(raw)),
        }
    }
}

impl ConfigSource for EnvConfigSource {
    fn load_limits_file(&self, _daemon_name: &str) -> (LimitsDocument, i32) {
        let disabled = env::var("EPS_DISABLED")
            .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True"))
            .unwrap_or(false);
        if disabled {
            return (LimitsDocument::empty(), DISABLED_SENTINEL);
        }

        (
            LimitsDocument {
                max_eps: Self::env_value("EPS_MAX"),
                timeframe_eps: Self::env_value("EPS_TIMEFRAME"),
            },
            0,
        )
    }
}
