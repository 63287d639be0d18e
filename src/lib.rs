//! EPS admission control core plus the inter-component response envelope.
//!
//! Two pieces live here, leaves first:
//!
//! - [`envelope`] — the `{data, error, message?}` document every internal
//!   component uses to answer a request, so callers parse one shape
//!   regardless of producer.
//! - [`limiter`] — the events-per-second credit scheduler that gates event
//!   ingestion so the daemon never processes more than a configured rate.
//!
//! Everything else a real daemon needs — transports, event parsing, rule
//! matching, log rotation — is an external collaborator. This crate only
//! consumes or exposes the narrow interfaces described in `SPEC_FULL.md`.

pub mod demo;
pub mod envelope;
pub mod limiter;

pub use envelope::{EnvelopeError, ResponseEnvelope};
pub use limiter::{
    ConfigSource, EpsLimiter, EpsLimiterError, LimiterStatus, LimitsDocument, LimitsState,
    TickerHandle,
};
