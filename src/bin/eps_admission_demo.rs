//! Thin bootstrap for the demo daemon: builds an [`EpsLimiter`] from the
//! environment, spawns its ticker, and serves [`eps_admission_core::demo::app`]
//! — the same `main.rs`-is-thin, `lib.rs::app`-does-the-wiring split the
//! teacher uses.

use std::env;
use std::sync::Arc;

use anyhow::Context;
use eps_admission_core::demo::{app, AppState};
use eps_admission_core::limiter::{EnvConfigSource, JsonFileConfigSource};
use eps_admission_core::{ConfigSource, EpsLimiter};
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{fmt, EnvFilter};

fn config_source() -> Box<dyn ConfigSource> {
    match env::var("EPS_LIMITS_FILE") {
        Ok(path) => Box::new(JsonFileConfigSource::new(path)),
        Err(_) => Box::new(EnvConfigSource::new()),
    }
}

/// Mirrors the teacher's `parse_optional_u64`/`parse_bool_env` helpers in
/// `config.rs`: an environment value that's present but unparseable is a
/// configuration error, not a silent fallback to the default.
fn listen_port() -> anyhow::Result<u16> {
    match env::var("PORT") {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<u16>()
            .with_context(|| format!("PORT must be a valid port number, got '{}'", value)),
        _ => Ok(8080),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let limiter = EpsLimiter::new();
    let source = config_source();
    limiter.load("eps-admission-demo", source.as_ref())?;
    let _ticker = limiter.is_enabled().then(|| limiter.spawn_ticker());

    let state = AppState {
        limiter: Arc::clone(&limiter),
    };
    let app = app(state);

    let port = listen_port().map_err(|e| -> Box<dyn std::error::Error> { e.into() })?;
    let addr: std::net::SocketAddr = ([0, 0, 0, 0], port).into();

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(limiter))
        .await?;
    Ok(())
}

async fn shutdown_signal(limiter: Arc<EpsLimiter>) {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
    limiter.shutdown();
}
