//! Single-use asynchronous HTTP client.
//!
//! # Design
//! `WebClient` is a builder around a `RequestSpec` plus the transport that
//! will carry it. `send` consumes the client, hands the frozen request to a
//! dedicated worker thread and returns at once. Because the client is moved,
//! a second submission cannot be written and the request cannot be mutated
//! while in flight.
//!
//! `cancel` may be called on the client before sending or on the returned
//! `ExecutionHandle` afterwards; either way it only stops a request that has
//! not started yet.

use std::sync::Arc;
use std::time::Duration;

use crate::error::WebClientError;
use crate::http::{HttpMethod, Transport};
use crate::request::RequestSpec;
use crate::sink::ResultSink;
use crate::transport::UreqTransport;
use crate::worker::{self, ExecutionHandle, ExecutionState, SharedState};

pub struct WebClient<T: Transport = UreqTransport> {
    spec: RequestSpec,
    transport: Arc<T>,
    state: SharedState,
}

impl WebClient<UreqTransport> {
    pub fn new(url: &str, method: HttpMethod) -> Result<Self, WebClientError> {
        Self::with_transport(url, method, UreqTransport)
    }

    pub fn get(url: &str) -> Result<Self, WebClientError> {
        Self::new(url, HttpMethod::Get)
    }

    pub fn post(url: &str) -> Result<Self, WebClientError> {
        Self::new(url, HttpMethod::Post)
    }

    /// Build a GET request and send it immediately.
    pub fn send_get<S: ResultSink>(url: &str, sink: S) -> Result<ExecutionHandle, WebClientError> {
        Ok(Self::get(url)?.send(sink))
    }

    /// Build a POST request without data and send it immediately.
    pub fn send_post<S: ResultSink>(url: &str, sink: S) -> Result<ExecutionHandle, WebClientError> {
        Ok(Self::post(url)?.send(sink))
    }
}

impl<T: Transport> WebClient<T> {
    pub fn with_transport(url: &str, method: HttpMethod, transport: T) -> Result<Self, WebClientError> {
        Ok(Self::from_spec(RequestSpec::new(url, method)?, transport))
    }

    pub fn from_spec(spec: RequestSpec, transport: T) -> Self {
        Self {
            spec,
            transport: Arc::new(transport),
            state: SharedState::new(),
        }
    }

    pub fn spec(&self) -> &RequestSpec {
        &self.spec
    }

    /// See [`RequestSpec::with_query_or_body_data`].
    pub fn with_query_or_body_data<I, K, V>(mut self, data: I) -> Result<Self, WebClientError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<[u8]>,
    {
        self.spec = self.spec.with_query_or_body_data(data)?;
        Ok(self)
    }

    /// See [`RequestSpec::with_multipart_upload`].
    pub fn with_multipart_upload<I, K, V>(
        mut self,
        attachment: &[u8],
        field_name: &str,
        fields: I,
    ) -> Result<Self, WebClientError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<[u8]>,
    {
        self.spec = self.spec.with_multipart_upload(attachment, field_name, fields)?;
        Ok(self)
    }

    /// See [`RequestSpec::with_headers`].
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.spec = self.spec.with_headers(headers);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.spec = self.spec.with_timeout(timeout);
        self
    }

    /// Cancel before sending. A cancelled client delivers nothing when sent.
    pub fn cancel(&self) -> bool {
        self.state.cancel()
    }

    pub fn state(&self) -> ExecutionState {
        self.state.load()
    }

    /// Dispatch the request on a background worker and return immediately.
    ///
    /// `sink` receives exactly one outcome, unless the request is cancelled
    /// before it starts or a 2xx response arrives without a reason phrase.
    pub fn send<S: ResultSink>(self, sink: S) -> ExecutionHandle {
        worker::submit(self.transport, self.spec.into_request(), sink, self.state)
    }
}
