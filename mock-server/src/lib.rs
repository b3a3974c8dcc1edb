use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// What the server saw of a request to `/echo`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub type Hits = Arc<AtomicUsize>;

pub fn app() -> Router {
    let hits: Hits = Arc::new(AtomicUsize::new(0));
    Router::new()
        .route("/echo", get(echo).post(echo))
        .route("/hits", get(hit_count))
        .route("/text", get(text))
        .route("/array", get(array))
        .route("/bad-json", get(bad_json))
        .route("/status/{code}", get(status).post(status))
        .with_state(hits)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(
    State(hits): State<Hits>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Echo> {
    hits.fetch_add(1, Ordering::SeqCst);
    tracing::debug!(%method, %uri, len = body.len(), "echo");
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    Json(Echo {
        method: method.to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn hit_count(State(hits): State<Hits>) -> String {
    hits.load(Ordering::SeqCst).to_string()
}

async fn text() -> &'static str {
    "plain text"
}

async fn array() -> Json<Vec<u32>> {
    Json(vec![1, 2, 3])
}

async fn bad_json() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], "{bad")
}

async fn status(Path(code): Path<u16>) -> impl IntoResponse {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, format!("status {code}"))
}
