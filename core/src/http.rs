//! HTTP transport types and the connection capability the worker drives.
//!
//! # Design
//! Requests and responses are plain data. The core never opens a socket
//! itself: a [`Transport`] hands out [`Connection`]s and the worker drives
//! each one through configure, write, send, close. Any HTTP stack that can
//! satisfy these two traits can carry a request; [`crate::transport`] ships a
//! `ureq`-backed one.
//!
//! All fields use owned types (`String`, `Vec`) so a request can be moved
//! onto the worker thread without lifetime concerns.

use std::time::Duration;

use url::Url;

use crate::error::TransportError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    /// Method token as written on the request line.
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// A frozen HTTP request, ready to be written to a connection.
///
/// Produced by `RequestSpec::into_request` when the client is sent.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub body_content_type: Option<String>,
    pub timeout: Duration,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
///
/// `reason` is the status line's reason phrase. `None` means the server sent
/// no response message at all, which only a transport that sees the raw
/// status line can tell. The classifier suppresses 2xx responses with `None`.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

pub(crate) fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Opens connections to a target URL.
///
/// Shared by reference with the worker thread, hence `Send + Sync`.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;

    fn open(&self, url: &Url) -> Result<Self::Connection, TransportError>;
}

/// A single-use connection to one target.
///
/// The worker calls the setters, optionally `write_body`, then `send`
/// exactly once. `close` is always called afterwards, on every path,
/// including when `send` was never reached.
pub trait Connection: Send {
    fn set_method(&mut self, method: HttpMethod);

    fn set_timeouts(&mut self, connect: Duration, read: Duration);

    fn set_follow_redirects(&mut self, follow: bool);

    /// Set a request header, replacing any previous value for `name`.
    fn set_header(&mut self, name: &str, value: &str);

    fn write_body(&mut self, body: &[u8]) -> Result<(), TransportError>;

    /// Perform the round trip and read the complete response.
    fn send(&mut self) -> Result<HttpResponse, TransportError>;

    fn close(&mut self);
}
