//! Outbound webhooks for form submissions.
//!
//! # Overview
//! A host form platform stores webhook *feeds* per form. When a qualifying
//! submission arrives, the host hands the feed, the entry and the form to
//! [`WebhooksAddOn`], which builds one HTTP request from the feed settings
//! and sends it through a host-supplied [`Transport`].
//!
//! # Design
//! - [`RequestBuilder`] is stateless and never does I/O. It turns
//!   `(Feed, Entry, Form)` into [`RequestArgs`].
//! - [`Dispatcher`] makes exactly one transport call and records failures
//!   against the feed. It never retries, and an HTTP error status is not a
//!   failure.
//! - Every stage runs through ordered [`Hooks`] so outside code can reshape
//!   the method, headers, payload, URL, TLS flag and final arguments.
//! - Host collaborators are traits: merge tags, field maps, transport,
//!   feed-error log, scheduling and registration.

pub mod addon;
pub mod builder;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod field_map;
pub mod hooks;
pub mod http;
pub mod merge_tags;
pub mod query;
pub mod settings;
pub mod site_tags;
#[cfg(feature = "ureq")]
pub mod transport;
pub mod types;

pub use addon::{
    bootstrap, AddOnDescriptor, AddOnRegistry, FeedAddOn, FeedListProvider, FeedOutcome, FeedProcessor,
    FeedScheduler, FeedSettingsProvider, HostServices, InlineScheduler, Scheduling, WebhooksAddOn,
};
pub use builder::RequestBuilder;
pub use config::SiteConfig;
pub use dispatch::{DispatchOutcome, Dispatcher, FeedErrorLog, TracingFeedErrorLog, Transport, TransportResult};
pub use error::{ConfigError, TransportError, WebhookError};
pub use hooks::{HookContext, Hooks};
pub use http::{Headers, HttpMethod, HttpResponse, Payload, RequestArgs, RequestBody};
pub use merge_tags::{MergeTagEngine, ReplaceOptions, VariableReplacer};
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use types::{Entry, Feed, FeedMeta, Form, FormField, MapEntry, RequestBodyType, RequestFormat};
