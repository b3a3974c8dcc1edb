//! Request payload encoders: URL-encoded forms and multipart/form-data.
//!
//! # Design
//! Pure functions, no I/O. Pair order always follows the iteration order of
//! the caller's collection, so a `HashMap` yields an arbitrary order and a
//! `BTreeMap` or `Vec` a deterministic one.
//!
//! Multipart output is deterministic except for the boundary token and the
//! attachment filename, which are derived from the clock. The token only
//! has millisecond resolution and is not checked against field contents.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::WebClientError;

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

const BOUNDARY_PREFIX: &str = "----WebKitFormBoundary";
const ATTACHMENT_CONTENT_TYPE: &str = "image/jpeg";
const CRLF: &str = "\r\n";

/// Which wire format an [`EncodedPayload`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    UrlEncoded,
    Multipart,
}

/// An encoded request body plus the `Content-Type` that describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    pub encoding: PayloadEncoding,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl EncodedPayload {
    /// URL-encode `data` as a form body.
    pub fn url_encoded<I, K, V>(data: I) -> Result<Self, WebClientError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<[u8]>,
    {
        Ok(Self {
            encoding: PayloadEncoding::UrlEncoded,
            bytes: encode_url_encoded(data)?.into_bytes(),
            content_type: FORM_URLENCODED.to_string(),
        })
    }

    /// Boundary token, for multipart payloads.
    pub fn boundary(&self) -> Option<&str> {
        self.content_type
            .split_once("boundary=")
            .map(|(_, boundary)| boundary)
    }
}

/// Encode pairs as `k1=v1&k2=v2`, percent-encoding each value.
///
/// Keys are emitted as given. Fails if a value is not valid UTF-8.
pub fn encode_url_encoded<I, K, V>(data: I) -> Result<String, WebClientError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<[u8]>,
{
    let mut pairs = Vec::new();
    for (key, value) in data {
        let key = key.as_ref();
        let value = std::str::from_utf8(value.as_ref()).map_err(|_| {
            tracing::warn!(key, "form value is not valid UTF-8");
            WebClientError::Encoding { key: key.to_string() }
        })?;
        pairs.push(format!("{key}={}", urlencoding::encode(value)));
    }
    Ok(pairs.join("&"))
}

/// Encode `fields` plus one binary attachment as multipart/form-data.
///
/// Returns `Ok(None)` when `attachment` is empty.
pub fn encode_multipart<I, K, V>(
    fields: I,
    attachment: &[u8],
    attachment_field: &str,
) -> Result<Option<EncodedPayload>, WebClientError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<[u8]>,
{
    encode_multipart_at(fields, attachment, attachment_field, SystemTime::now())
}

/// [`encode_multipart`] with an explicit clock reading.
pub fn encode_multipart_at<I, K, V>(
    fields: I,
    attachment: &[u8],
    attachment_field: &str,
    now: SystemTime,
) -> Result<Option<EncodedPayload>, WebClientError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<[u8]>,
{
    if attachment.is_empty() {
        return Ok(None);
    }

    let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default();
    let boundary = format!("{BOUNDARY_PREFIX}{}", since_epoch.as_millis());
    let filename = format!("{}.jpg", since_epoch.as_secs());

    let mut bytes = Vec::with_capacity(attachment.len() + 256);
    for (key, value) in fields {
        let key = key.as_ref();
        let value = value.as_ref();
        if std::str::from_utf8(value).is_err() {
            tracing::warn!(key, "multipart field is not valid UTF-8");
            return Err(WebClientError::Encoding { key: key.to_string() });
        }
        bytes.extend_from_slice(format!("--{boundary}{CRLF}").as_bytes());
        bytes.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{key}\"{CRLF}{CRLF}").as_bytes(),
        );
        bytes.extend_from_slice(value);
        bytes.extend_from_slice(CRLF.as_bytes());
    }

    bytes.extend_from_slice(format!("--{boundary}{CRLF}").as_bytes());
    bytes.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{attachment_field}\"; filename=\"{filename}\"{CRLF}"
        )
        .as_bytes(),
    );
    bytes.extend_from_slice(format!("Content-Type: {ATTACHMENT_CONTENT_TYPE}{CRLF}{CRLF}").as_bytes());
    bytes.extend_from_slice(attachment);
    bytes.extend_from_slice(CRLF.as_bytes());
    bytes.extend_from_slice(format!("--{boundary}--{CRLF}").as_bytes());

    Ok(Some(EncodedPayload {
        encoding: PayloadEncoding::Multipart,
        bytes,
        content_type: format!("multipart/form-data; boundary={boundary}"),
    }))
}
