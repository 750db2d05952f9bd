//! Extension points around request construction and dispatch.
//!
//! # Design
//! Each stage owns an ordered [`FilterChain`]. A filter receives the current
//! value plus the feed/entry/form being processed and returns the value the
//! next filter sees. Filters registered for every form run first, then
//! filters registered for the form being processed, each group in
//! registration order. `post_request` listeners are notify-only.

use std::fmt;

use crate::dispatch::TransportResult;
use crate::http::{Headers, Payload, RequestArgs};
use crate::types::{Entry, Feed, Form};

/// The feed, entry and form a hook is running for.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    pub feed: &'a Feed,
    pub entry: &'a Entry,
    pub form: &'a Form,
}

impl<'a> HookContext<'a> {
    pub fn new(feed: &'a Feed, entry: &'a Entry, form: &'a Form) -> Self {
        Self { feed, entry, form }
    }
}

type Filter<T> = Box<dyn Fn(T, &HookContext<'_>) -> T + Send + Sync>;
type SslVerifyFilter = Box<dyn Fn(bool, &str) -> bool + Send + Sync>;
type PostRequestListener = Box<dyn Fn(&TransportResult, &RequestArgs, &HookContext<'_>) + Send + Sync>;

/// Ordered transforms for one value type.
pub struct FilterChain<T> {
    filters: Vec<(Option<u64>, Filter<T>)>,
}

impl<T> FilterChain<T> {
    /// Register a filter that runs for every form.
    pub fn add<F>(&mut self, filter: F)
    where
        F: Fn(T, &HookContext<'_>) -> T + Send + Sync + 'static,
    {
        self.filters.push((None, Box::new(filter)));
    }

    /// Register a filter that only runs for `form_id`.
    pub fn add_for_form<F>(&mut self, form_id: u64, filter: F)
    where
        F: Fn(T, &HookContext<'_>) -> T + Send + Sync + 'static,
    {
        self.filters.push((Some(form_id), Box::new(filter)));
    }

    pub fn apply(&self, value: T, ctx: &HookContext<'_>) -> T {
        let global = self.filters.iter().filter(|(scope, _)| scope.is_none());
        let scoped = self
            .filters
            .iter()
            .filter(|(scope, _)| *scope == Some(ctx.form.id));
        global.chain(scoped).fold(value, |value, (_, filter)| filter(value, ctx))
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl<T> Default for FilterChain<T> {
    fn default() -> Self {
        Self { filters: Vec::new() }
    }
}

impl<T> fmt::Debug for FilterChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain").field("filters", &self.filters.len()).finish()
    }
}

/// All extension points, grouped by stage.
#[derive(Default)]
pub struct Hooks {
    pub request_method: FilterChain<String>,
    pub request_headers: FilterChain<Headers>,
    pub request_data: FilterChain<Payload>,
    pub request_url: FilterChain<String>,
    pub request_args: FilterChain<RequestArgs>,
    ssl_verify: Vec<SslVerifyFilter>,
    post_request: Vec<PostRequestListener>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter over the TLS verification flag. It also sees the URL.
    pub fn add_ssl_verify_filter<F>(&mut self, filter: F)
    where
        F: Fn(bool, &str) -> bool + Send + Sync + 'static,
    {
        self.ssl_verify.push(Box::new(filter));
    }

    /// Register a listener that runs after every executed request.
    pub fn on_post_request<F>(&mut self, listener: F)
    where
        F: Fn(&TransportResult, &RequestArgs, &HookContext<'_>) + Send + Sync + 'static,
    {
        self.post_request.push(Box::new(listener));
    }

    pub fn apply_ssl_verify(&self, verify: bool, url: &str) -> bool {
        self.ssl_verify.iter().fold(verify, |verify, filter| filter(verify, url))
    }

    pub fn notify_post_request(&self, result: &TransportResult, args: &RequestArgs, ctx: &HookContext<'_>) {
        for listener in &self.post_request {
            listener(result, args, ctx);
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("request_method", &self.request_method)
            .field("request_headers", &self.request_headers)
            .field("request_data", &self.request_data)
            .field("request_url", &self.request_url)
            .field("request_args", &self.request_args)
            .field("ssl_verify", &self.ssl_verify.len())
            .field("post_request", &self.post_request.len())
            .finish()
    }
}
