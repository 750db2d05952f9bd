//! Executes a built webhook request and reports the outcome.
//!
//! # Design
//! The dispatcher makes exactly one blocking transport call per feed and
//! never retries. A transport failure or a blank URL becomes a feed error
//! through [`FeedErrorLog`]; any HTTP status, including 4xx and 5xx, is a
//! completed dispatch that is only logged at debug level. The outcome is
//! returned for callers that want it, but nothing is raised to the code that
//! handled the submission.

use tracing::{debug, error};

use crate::builder::RequestBuilder;
use crate::error::{TransportError, WebhookError};
use crate::hooks::{HookContext, Hooks};
use crate::http::{HttpResponse, RequestArgs};
use crate::types::{Entry, Feed, Form};

/// What the transport hands back for one request.
pub type TransportResult = Result<HttpResponse, TransportError>;

/// Host HTTP primitive.
pub trait Transport: Send + Sync {
    /// Execute `request`. Only failures below the HTTP layer are `Err`.
    fn execute(&self, request: &RequestArgs) -> TransportResult;
}

/// Host sink for errors recorded against a feed and entry.
pub trait FeedErrorLog: Send + Sync {
    fn add_feed_error(&self, message: &str, feed: &Feed, entry: &Entry, form: &Form);
}

/// Feed error sink that only emits a `tracing` error event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFeedErrorLog;

impl FeedErrorLog for TracingFeedErrorLog {
    fn add_feed_error(&self, message: &str, feed: &Feed, entry: &Entry, form: &Form) {
        error!(
            feed_id = feed.id,
            form_id = form.id,
            entry_id = ?entry.id(),
            feed_name = %feed.meta.feed_name,
            "{message}"
        );
    }
}

/// Result of one dispatch attempt.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A response came back; its status may still be 4xx/5xx.
    Sent(HttpResponse),
    /// The transport failed; a feed error was recorded.
    Failed(TransportError),
    /// The request was never sent; a feed error was recorded.
    Aborted(WebhookError),
}

impl DispatchOutcome {
    /// True when a feed error was recorded for this dispatch.
    pub fn is_error(&self) -> bool {
        !matches!(self, DispatchOutcome::Sent(_))
    }

    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            DispatchOutcome::Sent(response) => Some(response),
            _ => None,
        }
    }
}

pub struct Dispatcher<'a> {
    builder: RequestBuilder<'a>,
    transport: &'a dyn Transport,
    feed_errors: &'a dyn FeedErrorLog,
    hooks: &'a Hooks,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        builder: RequestBuilder<'a>,
        transport: &'a dyn Transport,
        feed_errors: &'a dyn FeedErrorLog,
        hooks: &'a Hooks,
    ) -> Self {
        Self {
            builder,
            transport,
            feed_errors,
            hooks,
        }
    }

    /// Build, send and report one webhook for `entry`.
    pub fn process_feed(&self, feed: &Feed, entry: &Entry, form: &Form) -> DispatchOutcome {
        let args = match self.builder.build(feed, entry, form) {
            Ok(args) => args,
            Err(err) => {
                self.feed_errors.add_feed_error(&err.to_string(), feed, entry, form);
                return DispatchOutcome::Aborted(err);
            }
        };

        debug!(
            feed_id = feed.id,
            url = %args.url,
            ?args,
            "Sending webhook request"
        );

        let result = self.transport.execute(&args);
        match &result {
            Ok(response) => debug!(
                feed_id = feed.id,
                status = response.status,
                body = %response.body,
                "Webhook successfully executed"
            ),
            Err(err) => {
                let message = WebhookError::Transport(err.clone()).to_string();
                self.feed_errors.add_feed_error(&message, feed, entry, form);
            }
        }

        self.hooks
            .notify_post_request(&result, &args, &HookContext::new(feed, entry, form));

        match result {
            Ok(response) => DispatchOutcome::Sent(response),
            Err(err) => DispatchOutcome::Failed(err),
        }
    }
}
