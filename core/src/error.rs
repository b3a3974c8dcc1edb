//! Error types for the web client.
//!
//! # Design
//! Two layers. `WebClientError` is returned synchronously from construction
//! and builder calls, so a malformed URL or unencodable value is visible to
//! the caller before anything is sent. `TransportError` is produced on the
//! worker thread during a round trip; it never reaches the caller directly
//! and is folded into a status-0 `Failure` by the worker.

use thiserror::Error;

/// Errors returned while building a request.
#[derive(Debug, Error)]
pub enum WebClientError {
    /// The target is not a syntactically valid absolute URL.
    #[error("malformed URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A form value could not be represented as text.
    #[error("value for key {key:?} is not valid UTF-8")]
    Encoding { key: String },
}

/// Errors raised by a transport during a round trip.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP transport error: {0}")]
    Http(#[from] ureq::Error),

    /// The transport cannot express the requested operation.
    #[error("unsupported by transport: {0}")]
    Unsupported(String),

    /// The transport panicked mid round trip.
    #[error("transport panicked")]
    Panicked,
}
