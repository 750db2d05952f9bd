//! Blocking HTTP transport backed by `ureq`.
//!
//! Non-2xx statuses come back as responses, not errors. Only connection,
//! DNS, TLS and timeout failures surface as [`TransportError`]. No timeout
//! is set here; the agent default applies. Methods outside the common five
//! are sent as-is; only a token that is not a valid HTTP method fails.

use std::fmt;

use tracing::warn;
use ureq::http::{Method, Request, Response};
use ureq::tls::TlsConfig;
use ureq::typestate::WithBody;
use ureq::{Agent, Body, RequestBuilder};

use crate::dispatch::{Transport, TransportResult};
use crate::error::TransportError;
use crate::http::{HttpMethod, HttpResponse, RequestArgs};

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        TransportError::request_failed(err.to_string())
    }
}

/// One agent that verifies certificates and one that does not, picked per
/// request from `RequestArgs::ssl_verify`.
pub struct UreqTransport {
    verified: Agent,
    unverified: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self {
            verified: agent(true),
            unverified: agent(false),
        }
    }

    fn agent_for(&self, ssl_verify: bool) -> &Agent {
        if ssl_verify {
            &self.verified
        } else {
            &self.unverified
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

fn agent(verify_tls: bool) -> Agent {
    Agent::config_builder()
        .http_status_as_error(false)
        .allow_non_standard_methods(true)
        .tls_config(TlsConfig::builder().disable_verification(!verify_tls).build())
        .build()
        .new_agent()
}

impl Transport for UreqTransport {
    fn execute(&self, request: &RequestArgs) -> TransportResult {
        let agent = self.agent_for(request.ssl_verify);
        let url = request.url.as_str();

        let response = match &request.method {
            HttpMethod::Get | HttpMethod::Delete => {
                if request.body.is_some() {
                    warn!(method = %request.method, "Dropping request body; method sends no body");
                }
                let builder = if request.method == HttpMethod::Get {
                    agent.get(url)
                } else {
                    agent.delete(url)
                };
                with_headers(builder, request).call()
            }
            HttpMethod::Post => send(agent.post(url), request),
            HttpMethod::Put => send(agent.put(url), request),
            HttpMethod::Patch => send(agent.patch(url), request),
            HttpMethod::Other(method) => run_custom(agent, method, request),
        };

        let mut response = response?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_str().unwrap_or_default().to_string()))
            .collect();
        let body = response.body_mut().read_to_string()?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, request: &RequestArgs) -> RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

/// Send a method ureq has no shorthand for. An empty body is not sent.
fn run_custom(agent: &Agent, method: &str, request: &RequestArgs) -> Result<Response<Body>, ureq::Error> {
    let method = Method::from_bytes(method.as_bytes()).map_err(|err| ureq::Error::Http(err.into()))?;
    let mut builder = Request::builder().method(method).uri(request.url.as_str());
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    let encoded = request
        .body
        .as_ref()
        .map(|body| (body.content_type(), body.encode()))
        .filter(|(_, encoded)| !encoded.is_empty());
    match encoded {
        Some((content_type, encoded)) => {
            if request.header("Content-Type").is_none() {
                builder = builder.header("Content-Type", content_type);
            }
            agent.run(builder.body(encoded).map_err(ureq::Error::Http)?)
        }
        None => agent.run(builder.body(()).map_err(ureq::Error::Http)?),
    }
}

fn send(builder: RequestBuilder<WithBody>, request: &RequestArgs) -> Result<Response<Body>, ureq::Error> {
    let builder = with_headers(builder, request);
    match &request.body {
        Some(body) => {
            let builder = if request.header("Content-Type").is_some() {
                builder
            } else {
                builder.content_type(body.content_type())
            };
            builder.send(body.encode().as_bytes())
        }
        None => builder.send_empty(),
    }
}
