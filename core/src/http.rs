//! HTTP request and response values for the host-does-IO pattern.
//!
//! # Design
//! The builder produces a [`RequestArgs`] value and never touches the
//! network. Whatever implements [`Transport`](crate::dispatch::Transport)
//! executes it and hands back an [`HttpResponse`]. Headers are an ordered
//! list rather than a map because the same header name may legitimately
//! appear more than once.

use std::fmt;

use serde_json::{Map, Value};

use crate::query;

/// Ordered request headers. Duplicate names are allowed and all are sent.
pub type Headers = Vec<(String, String)>;

/// Request payload: body key to value, in configured order.
pub type Payload = Map<String, Value>;

/// HTTP method for a webhook request.
///
/// Feeds store the method as free text, so anything outside the five
/// methods offered in the settings UI is carried through as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Other(String),
}

impl HttpMethod {
    /// Upper-cases `raw` and maps it onto a known method where possible.
    pub fn parse(raw: &str) -> Self {
        let upper = raw.trim().to_uppercase();
        match upper.as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "PATCH" => HttpMethod::Patch,
            "DELETE" => HttpMethod::Delete,
            _ => HttpMethod::Other(upper),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Other(method) => method,
        }
    }

    /// GET and DELETE carry the payload in the query string and send no body.
    pub fn uses_query_string(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Delete)
    }

    /// Only POST and PUT honour the feed's JSON request format.
    pub fn accepts_json_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a webhook request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Payload already encoded as a JSON string.
    Json(String),
    /// Payload map, form-encoded by the transport.
    Form(Payload),
}

impl RequestBody {
    /// Content type the transport should send when no header sets one.
    pub fn content_type(&self) -> &'static str {
        match self {
            RequestBody::Json(_) => "application/json",
            RequestBody::Form(_) => "application/x-www-form-urlencoded",
        }
    }

    /// Wire encoding of the body.
    pub fn encode(&self) -> String {
        match self {
            RequestBody::Json(json) => json.clone(),
            RequestBody::Form(payload) => query::build_query(payload),
        }
    }
}

/// Everything needed to execute one webhook call.
///
/// Built fresh for each dispatch by
/// [`RequestBuilder::build`](crate::builder::RequestBuilder::build) and
/// discarded once the transport returns.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestArgs {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: Option<RequestBody>,
    pub ssl_verify: bool,
}

impl RequestArgs {
    /// First header value whose name matches `name` case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response described as plain data.
///
/// Any status, including 4xx and 5xx, is a completed dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: String,
}
