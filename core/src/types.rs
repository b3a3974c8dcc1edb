//! Result types delivered to a `ResultSink`.
//!
//! # Design
//! Every executed request ends in exactly one `ExecutionOutcome` (or none,
//! when cancelled before start or when a 2xx response carries no reason
//! phrase). Failures keep the numeric status so callers can render the
//! historic text code via [`Failure::code`]; `0` marks anything that went
//! wrong below HTTP, including a JSON body that failed to decode.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// A classified response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DecodedPayload {
    Text(String),
    JsonObject(Map<String, Value>),
    JsonArray(Vec<Value>),
}

/// Why a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection, I/O or transport-level error. Status is 0.
    Transport,
    /// The server answered outside 2xx.
    HttpStatus,
    /// The body claimed JSON but parsed as neither object nor array. Status is 0.
    Decode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub status: u16,
    pub kind: FailureKind,
}

impl Failure {
    pub fn transport() -> Self {
        Self { status: 0, kind: FailureKind::Transport }
    }

    pub fn decode() -> Self {
        Self { status: 0, kind: FailureKind::Decode }
    }

    pub fn http_status(status: u16) -> Self {
        Self { status, kind: FailureKind::HttpStatus }
    }

    /// The status rendered as text, `"0"` for transport and decode failures.
    pub fn code(&self) -> String {
        self.status.to_string()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Transport => write!(f, "transport failure"),
            FailureKind::HttpStatus => write!(f, "HTTP {}", self.status),
            FailureKind::Decode => write!(f, "response body is not a JSON object or array"),
        }
    }
}

/// The terminal result of one execution.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Success { status: u16, payload: DecodedPayload },
    Failure(Failure),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success { .. })
    }

    pub fn into_result(self) -> Result<DecodedPayload, Failure> {
        match self {
            ExecutionOutcome::Success { payload, .. } => Ok(payload),
            ExecutionOutcome::Failure(failure) => Err(failure),
        }
    }
}
