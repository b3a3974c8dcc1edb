//! Minimal asynchronous HTTP request builder and executor.
//!
//! # Overview
//! Build a GET or POST request, attach URL-encoded or multipart data, and
//! send it. The round trip runs on a dedicated worker thread and its single
//! outcome is delivered to a caller-supplied [`ResultSink`].
//!
//! ```no_run
//! use webclient_core::{oneshot_sink, WebClient};
//!
//! let (tx, rx) = oneshot_sink();
//! WebClient::get("http://localhost:3000/search")?
//!     .with_query_or_body_data([("q", "rust http")])?
//!     .send(tx);
//! let outcome = rx.blocking_recv();
//! # Ok::<(), webclient_core::WebClientError>(())
//! ```
//!
//! # Design
//! - The transport is a capability (`Transport`/`Connection`), so the
//!   pipeline is testable without a network; `UreqTransport` is the default.
//! - Request data is encoded eagerly by the builder, so encoding and URL
//!   errors surface synchronously as `WebClientError`.
//! - A client executes at most once: `send` consumes it.
//! - Responses are classified by status and content type into text, JSON
//!   object or JSON array payloads, or a `Failure` carrying the status code
//!   (0 for transport and decode failures).

pub mod classify;
pub mod client;
pub mod encoding;
pub mod error;
pub mod http;
pub mod request;
pub mod sink;
pub mod transport;
pub mod types;
pub mod worker;

pub use classify::{classify, classify_parts, Classification};
pub use client::WebClient;
pub use encoding::{encode_multipart, encode_url_encoded, EncodedPayload, PayloadEncoding};
pub use error::{TransportError, WebClientError};
pub use http::{Connection, HttpMethod, HttpRequest, HttpResponse, Transport};
pub use request::RequestSpec;
pub use sink::{callbacks, oneshot_sink, CallbackSink, ResultSink};
pub use transport::UreqTransport;
pub use types::{DecodedPayload, ExecutionOutcome, Failure, FailureKind};
pub use worker::{ExecutionHandle, ExecutionState};
