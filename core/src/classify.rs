//! Response classification: status split and content-type driven decoding.

use serde_json::{Map, Value};

use crate::http::HttpResponse;
use crate::types::{DecodedPayload, ExecutionOutcome, Failure};

const JSON_CONTENT_TYPE: &str = "application/json";

/// What the worker should do with a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Deliver(ExecutionOutcome),
    /// A 2xx response without a reason phrase. Nothing is delivered.
    Suppress,
}

pub fn classify(response: &HttpResponse) -> Classification {
    classify_parts(
        response.status,
        response.reason.as_deref(),
        response.header("content-type"),
        &response.body,
    )
}

/// Classify a response from its parts.
///
/// Non-2xx statuses fail with the status code and the body is never read.
/// A 2xx body is decoded as JSON only when the content type says so; a JSON
/// body that is neither an object nor an array fails with status 0.
pub fn classify_parts(
    status: u16,
    reason: Option<&str>,
    content_type: Option<&str>,
    body: &[u8],
) -> Classification {
    if !(200..300).contains(&status) {
        return Classification::Deliver(ExecutionOutcome::Failure(Failure::http_status(status)));
    }
    if reason.is_none() {
        return Classification::Suppress;
    }

    let text = String::from_utf8_lossy(body).into_owned();
    let is_json = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains(JSON_CONTENT_TYPE));
    if !is_json {
        return Classification::Deliver(ExecutionOutcome::Success {
            status,
            payload: DecodedPayload::Text(text),
        });
    }

    let outcome = match decode_json(&text) {
        Some(payload) => ExecutionOutcome::Success { status, payload },
        None => ExecutionOutcome::Failure(Failure::decode()),
    };
    Classification::Deliver(outcome)
}

fn decode_json(text: &str) -> Option<DecodedPayload> {
    if let Ok(object) = serde_json::from_str::<Map<String, Value>>(text) {
        return Some(DecodedPayload::JsonObject(object));
    }
    serde_json::from_str::<Vec<Value>>(text)
        .ok()
        .map(DecodedPayload::JsonArray)
}
