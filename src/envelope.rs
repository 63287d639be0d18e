//! The response envelope exchanged between internal components.
//!
//! Every control-plane reply in the daemon — API handlers, module-to-module
//! calls, anything that answers a request — uses the same `{data, error,
//! message?}` document so callers can parse one shape regardless of which
//! component produced it. This module is a pure value layer: encoding and
//! decoding only, no I/O.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};
use thiserror::Error;

/// Success. No error occurred.
pub const OK: i32 = 0;
/// An error occurred but does not fall into one of the other known categories.
pub const UNKNOWN_ERROR: i32 = 1;
/// The request body was not well-formed JSON.
pub const INVALID_JSON_REQUEST: i32 = 2;
/// The request exceeded the maximum accepted message size.
pub const INVALID_MSG_SIZE: i32 = 3;

/// A standard protocol for internal communication between components.
///
/// `data` must be a JSON object or array; `error` is `0` for success and a
/// well-known or opaque nonzero code otherwise; `message` is an optional
/// human-readable note.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    data: Value,
    error: i32,
    message: Option<String>,
}

/// Failure modes for [`ResponseEnvelope::from_str`]. Envelope *construction*
/// never fails — only decoding a textual document can.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("invalid response: {0}")]
    NotJson(#[from] serde_json::Error),
    #[error("Error field not found or is not an integer")]
    MissingError,
    #[error("Data field not found")]
    MissingData,
    #[error("Data field is not a json object or array")]
    InvalidDataKind,
    #[error("Message field is not a string")]
    InvalidMessageKind,
}

impl ResponseEnvelope {
    /// Construct an envelope from an already-structured `data` value.
    pub fn new(data: Value, error: i32, message: Option<String>) -> Self {
        Self {
            data,
            error,
            message,
        }
    }

    /// Construct an envelope carrying only a message: `data = {}`, `error = 0`.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            data: Value::Object(Map::new()),
            error: OK,
            message: Some(message.into()),
        }
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn error(&self) -> i32 {
        self.error
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn set_data(&mut self, data: Value) {
        self.data = data;
    }

    pub fn set_error(&mut self, error: i32) {
        self.error = error;
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    /// A valid envelope has `data` of kind object or array.
    pub fn is_valid(&self) -> bool {
        self.data.is_object() || self.data.is_array()
    }

    /// `error = 2`, "Invalid request, malformed JSON".
    pub fn invalid_request() -> Self {
        Self::new(
            Value::Object(Map::new()),
            INVALID_JSON_REQUEST,
            Some("Invalid request, malformed JSON".to_string()),
        )
    }

    /// `error = 3`, "Invalid Size".
    pub fn invalid_size() -> Self {
        Self::new(
            Value::Object(Map::new()),
            INVALID_MSG_SIZE,
            Some("Invalid Size".to_string()),
        )
    }

    /// `error = 1`, "Unknown error".
    pub fn unknown_error() -> Self {
        Self::new(
            Value::Object(Map::new()),
            UNKNOWN_ERROR,
            Some("Unknown error".to_string()),
        )
    }
}

impl Default for ResponseEnvelope {
    /// Empty object data, error 0, no message.
    fn default() -> Self {
        Self::new(Value::Object(Map::new()), OK, None)
    }
}

impl fmt::Display for ResponseEnvelope {
    /// Key order is fixed: `data`, `error`, `message?`. The message is
    /// omitted entirely (not emitted as `null`) when absent.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(
                f,
                "{{\"data\":{},\"error\":{},\"message\":{}}}",
                self.data,
                self.error,
                Value::String(message.clone())
            ),
            None => write!(f, "{{\"data\":{},\"error\":{}}}", self.data, self.error),
        }
    }
}

impl FromStr for ResponseEnvelope {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: Value = serde_json::from_str(s)?;

        let error = raw
            .get("error")
            .and_then(Value::as_i64)
            .ok_or(EnvelopeError::MissingError)? as i32;

        let data = raw.get("data").cloned().ok_or(EnvelopeError::MissingData)?;
        if !(data.is_object() || data.is_array()) {
            return Err(EnvelopeError::InvalidDataKind);
        }

        let message = match raw.get("message") {
            None => None,
            Some(Value::String(message)) => Some(message.clone()),
            Some(_) => return Err(EnvelopeError::InvalidMessageKind),
        };

        Ok(Self {
            data,
            error,
            message,
        })
    }
}
