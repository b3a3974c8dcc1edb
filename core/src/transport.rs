//! Default blocking transport built on `ureq`.
//!
//! A `UreqConnection` buffers everything the worker configures and performs
//! the whole exchange in `send`. Status codes come back as data, never as
//! errors, and redirects are only followed when explicitly enabled.
//!
//! ureq does not expose the reason phrase the server sent, so every response
//! carries `Some` reason (the canonical phrase, or empty for unregistered
//! codes). A 2xx response is therefore never suppressed by this transport.
//! Bodies are read in full, without ureq's default size cap.

use std::time::Duration;

use url::Url;

use crate::error::TransportError;
use crate::http::{Connection, HttpMethod, HttpResponse, Transport};

const MAX_REDIRECTS_WHEN_FOLLOWING: u32 = 10;

#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

impl Transport for UreqTransport {
    type Connection = UreqConnection;

    fn open(&self, url: &Url) -> Result<UreqConnection, TransportError> {
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(TransportError::Unsupported(format!("URL scheme {other:?}"))),
        }
        Ok(UreqConnection {
            url: url.clone(),
            method: HttpMethod::Get,
            connect_timeout: None,
            read_timeout: None,
            follow_redirects: true,
            headers: Vec::new(),
            body: None,
        })
    }
}

#[derive(Debug)]
pub struct UreqConnection {
    url: Url,
    method: HttpMethod,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    follow_redirects: bool,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl UreqConnection {
    fn agent(&self) -> ureq::Agent {
        let max_redirects = if self.follow_redirects { MAX_REDIRECTS_WHEN_FOLLOWING } else { 0 };
        ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(self.connect_timeout)
            .timeout_recv_response(self.read_timeout)
            .timeout_recv_body(self.read_timeout)
            .max_redirects(max_redirects)
            .build()
            .new_agent()
    }
}

impl Connection for UreqConnection {
    fn set_method(&mut self, method: HttpMethod) {
        self.method = method;
    }

    fn set_timeouts(&mut self, connect: Duration, read: Duration) {
        self.connect_timeout = Some(connect);
        self.read_timeout = Some(read);
    }

    fn set_follow_redirects(&mut self, follow: bool) {
        self.follow_redirects = follow;
    }

    fn set_header(&mut self, name: &str, value: &str) {
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    fn write_body(&mut self, body: &[u8]) -> Result<(), TransportError> {
        if self.method != HttpMethod::Post {
            return Err(TransportError::Unsupported(format!(
                "{} request with a body",
                self.method.as_str()
            )));
        }
        self.body = Some(body.to_vec());
        Ok(())
    }

    fn send(&mut self) -> Result<HttpResponse, TransportError> {
        let agent = self.agent();
        let url = self.url.as_str();

        let mut response = match self.method {
            HttpMethod::Get => {
                let mut request = agent.get(url);
                for (name, value) in &self.headers {
                    request = request.header(name.as_str(), value.as_str());
                }
                request.call()?
            }
            HttpMethod::Post => {
                let mut request = agent.post(url);
                for (name, value) in &self.headers {
                    // ureq derives Content-Length from the body it sends.
                    if name.eq_ignore_ascii_case("content-length") {
                        continue;
                    }
                    request = request.header(name.as_str(), value.as_str());
                }
                match self.body.as_deref() {
                    Some(body) => request.send(body)?,
                    None => request.send_empty()?,
                }
            }
        };

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.body_mut().with_config().limit(u64::MAX).read_to_vec()?;

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: Some(status.canonical_reason().unwrap_or_default().to_string()),
            headers,
            body,
        })
    }

    fn close(&mut self) {
        self.body = None;
        self.headers.clear();
    }
}
