use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

/// One webhook call as the receiver saw it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReceivedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ReceivedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

pub type Inbox = Arc<RwLock<Vec<ReceivedRequest>>>;

pub fn app() -> Router {
    app_with_inbox(Inbox::default())
}

/// Routes:
/// - `GET /_inbox` lists everything received so far.
/// - `ANY /status/{code}` records the call and answers with `code`.
/// - anything else is recorded and answered with 200.
pub fn app_with_inbox(inbox: Inbox) -> Router {
    Router::new()
        .route("/_inbox", get(list_received))
        .route("/status/{code}", any(respond_with_status))
        .fallback(receive)
        .with_state(inbox)
}

pub async fn run(listener: TcpListener, inbox: Inbox) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_inbox(inbox)).await
}

async fn list_received(State(inbox): State<Inbox>) -> Json<Vec<ReceivedRequest>> {
    Json(inbox.read().await.clone())
}

async fn receive(
    State(inbox): State<Inbox>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    record(&inbox, method, uri, headers, body).await;
    (StatusCode::OK, Json(serde_json::json!({ "received": true })))
}

async fn respond_with_status(
    State(inbox): State<Inbox>,
    Path(code): Path<u16>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    record(&inbox, method, uri, headers, body).await;
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, status.canonical_reason().unwrap_or_default().to_string())
}

async fn record(inbox: &Inbox, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) {
    let request = ReceivedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_str().unwrap_or_default().to_string()))
            .collect(),
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    tracing::info!(method = %request.method, path = %request.path, "webhook received");
    inbox.write().await.push(request);
}
