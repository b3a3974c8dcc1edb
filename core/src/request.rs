//! Request builder: accumulates method, target, headers and body.
//!
//! A `RequestSpec` is mutated only through its builder methods and is
//! frozen into an [`HttpRequest`] when the owning client is sent.

use std::time::Duration;

use url::Url;

use crate::encoding::{self, EncodedPayload};
use crate::error::WebClientError;
use crate::http::{HttpMethod, HttpRequest};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

#[derive(Debug, Clone)]
pub struct RequestSpec {
    method: HttpMethod,
    url: Url,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    body_content_type: Option<String>,
    timeout: Duration,
}

impl RequestSpec {
    /// Start a request. Fails if `url` is not a valid absolute URL.
    pub fn new(url: &str, method: HttpMethod) -> Result<Self, WebClientError> {
        Ok(Self {
            method,
            url: parse_url(url)?,
            headers: Vec::new(),
            body: None,
            body_content_type: None,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn body_content_type(&self) -> Option<&str> {
        self.body_content_type.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Attach form data: the query string for GET, the body for POST.
    ///
    /// Empty data is ignored. For GET each call appends another `?...`
    /// segment to the current target.
    pub fn with_query_or_body_data<I, K, V>(mut self, data: I) -> Result<Self, WebClientError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<[u8]>,
    {
        let mut data = data.into_iter().peekable();
        if data.peek().is_none() {
            return Ok(self);
        }

        match self.method {
            HttpMethod::Get => {
                let query = encoding::encode_url_encoded(data)?;
                self.url = parse_url(&format!("{}?{query}", self.url))?;
            }
            HttpMethod::Post => {
                let payload = EncodedPayload::url_encoded(data)?;
                self.body = Some(payload.bytes);
                self.body_content_type = Some(payload.content_type);
            }
        }
        Ok(self)
    }

    /// Attach a binary upload plus text fields as multipart/form-data.
    ///
    /// Only applies to POST with a non-empty attachment. Overwrites the
    /// `Connection` and `Content-Type` headers.
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
        if self.method != HttpMethod::Post {
            tracing::debug!(method = self.method.as_str(), "multipart upload ignored");
            return Ok(self);
        }
        let Some(payload) = encoding::encode_multipart(fields, attachment, field_name)? else {
            return Ok(self);
        };

        set_header(&mut self.headers, "Connection", "Keep-Alive");
        set_header(&mut self.headers, "Content-Type", &payload.content_type);
        self.body = Some(payload.bytes);
        self.body_content_type = None;
        Ok(self)
    }

    /// Replace the whole header set. An empty set is ignored.
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut replacement = Vec::new();
        for (name, value) in headers {
            let (name, value): (String, String) = (name.into(), value.into());
            set_header(&mut replacement, &name, &value);
        }
        if !replacement.is_empty() {
            self.headers = replacement;
        }
        self
    }

    /// Connect and read timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn into_request(self) -> HttpRequest {
        HttpRequest {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            body_content_type: self.body_content_type,
            timeout: self.timeout,
        }
    }
}

/// Insert or overwrite a header, matching names case-insensitively.
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
        Some(entry) => entry.1 = value.to_string(),
        None => headers.push((name.to_string(), value.to_string())),
    }
}

fn parse_url(url: &str) -> Result<Url, WebClientError> {
    Url::parse(url).map_err(|e| {
        tracing::warn!(url, error = %e, "malformed URL");
        WebClientError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn get(url: &str) -> RequestSpec {
        RequestSpec::new(url, HttpMethod::Get).unwrap()
    }

    fn post(url: &str) -> RequestSpec {
        RequestSpec::new(url, HttpMethod::Post).unwrap()
    }

    #[test]
    fn new_has_defaults() {
        let spec = get("http://x/api");
        assert_eq!(spec.method(), HttpMethod::Get);
        assert_eq!(spec.url().as_str(), "http://x/api");
        assert!(spec.headers().is_empty());
        assert!(spec.body().is_none());
        assert_eq!(spec.timeout(), Duration::from_millis(30_000));
    }

    #[test]
    fn malformed_url_is_reported() {
        let err = RequestSpec::new("not a url", HttpMethod::Get).unwrap_err();
        assert!(matches!(err, WebClientError::InvalidUrl { ref url, .. } if url == "not a url"));
    }

    #[test]
    fn relative_url_is_rejected() {
        assert!(RequestSpec::new("/api/items", HttpMethod::Post).is_err());
    }

    #[test]
    fn get_data_goes_to_query() {
        let spec = get("http://x/api").with_query_or_body_data([("q", "a b")]).unwrap();
        assert_eq!(spec.url().as_str(), "http://x/api?q=a%20b");
        assert!(spec.body().is_none());
    }

    #[test]
    fn get_data_compounds_across_calls() {
        let spec = get("http://x/api")
            .with_query_or_body_data([("a", "1")])
            .unwrap()
            .with_query_or_body_data([("b", "2")])
            .unwrap();
        assert_eq!(spec.url().as_str(), "http://x/api?a=1?b=2");
    }

    #[test]
    fn post_data_goes_to_body() {
        let spec = post("http://x/api").with_query_or_body_data([("a", "1")]).unwrap();
        assert_eq!(spec.url().as_str(), "http://x/api");
        assert_eq!(spec.body(), Some(&b"a=1"[..]));
        assert_eq!(spec.body_content_type(), Some(encoding::FORM_URLENCODED));
    }

    #[test]
    fn post_data_replaces_previous_body() {
        let spec = post("http://x/api")
            .with_query_or_body_data([("a", "1")])
            .unwrap()
            .with_query_or_body_data([("b", "2")])
            .unwrap();
        assert_eq!(spec.body(), Some(&b"b=2"[..]));
    }

    #[test]
    fn empty_data_is_noop() {
        let empty: HashMap<String, String> = HashMap::new();
        let spec = get("http://x/api").with_query_or_body_data(&empty).unwrap();
        assert_eq!(spec.url().as_str(), "http://x/api");

        let spec = post("http://x/api").with_query_or_body_data(&empty).unwrap();
        assert!(spec.body().is_none());
    }

    #[test]
    fn headers_replace_wholesale() {
        let spec = get("http://x/api")
            .with_headers([("X-One", "1"), ("X-Two", "2")])
            .with_headers([("X-Three", "3")]);
        assert_eq!(spec.headers(), &[("X-Three".to_string(), "3".to_string())]);
    }

    #[test]
    fn empty_headers_are_ignored() {
        let none: Vec<(String, String)> = Vec::new();
        let spec = get("http://x/api").with_headers([("X-One", "1")]).with_headers(none);
        assert_eq!(spec.headers().len(), 1);
    }

    #[test]
    fn duplicate_header_names_keep_last_value() {
        let spec = get("http://x/api").with_headers([("Accept", "text/plain"), ("accept", "application/json")]);
        assert_eq!(spec.headers(), &[("Accept".to_string(), "application/json".to_string())]);
    }

    #[test]
    fn multipart_sets_body_and_overwrites_content_type() {
        let spec = post("http://x/upload")
            .with_headers([("Content-Type", "text/plain"), ("X-Keep", "yes")])
            .with_query_or_body_data([("a", "1")])
            .unwrap()
            .with_multipart_upload(b"JPEG", "photo", [("title", "t")])
            .unwrap();

        let request = spec.into_request();
        let content_type = request.header("content-type").unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary=----WebKitFormBoundary"));
        assert_eq!(request.header("connection"), Some("Keep-Alive"));
        assert_eq!(request.header("x-keep"), Some("yes"));
        assert!(request.body_content_type.is_none());
        let body = String::from_utf8_lossy(request.body.as_deref().unwrap()).into_owned();
        assert!(body.contains("name=\"photo\""));
    }

    #[test]
    fn multipart_ignored_for_get() {
        let spec = get("http://x/api")
            .with_multipart_upload(b"JPEG", "photo", [("title", "t")])
            .unwrap();
        assert!(spec.body().is_none());
        assert!(spec.headers().is_empty());
    }

    #[test]
    fn multipart_ignored_for_empty_attachment() {
        let spec = post("http://x/api")
            .with_multipart_upload(&[], "photo", [("title", "t")])
            .unwrap();
        assert!(spec.body().is_none());
        assert!(spec.headers().is_empty());
    }

    #[test]
    fn timeout_override() {
        let spec = get("http://x/api").with_timeout(Duration::from_secs(5));
        assert_eq!(spec.into_request().timeout, Duration::from_secs(5));
    }
}
