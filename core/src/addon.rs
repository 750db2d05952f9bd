//! The add-on object the host registers and calls into.
//!
//! # Design
//! The host sees the add-on through three small capability traits (settings,
//! list columns, feed processing) combined in [`FeedAddOn`]. One
//! [`WebhooksAddOn`] is built at bootstrap and shared by `Arc`; there is no
//! global instance. The host's collaborators (merge tags, field maps,
//! transport, error log, scheduler) are supplied once through
//! [`HostServices`].

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::builder::RequestBuilder;
use crate::config::SiteConfig;
use crate::dispatch::{DispatchOutcome, Dispatcher, FeedErrorLog, Transport, TracingFeedErrorLog};
use crate::field_map::{FieldMapResolver, GenericMapResolver};
use crate::hooks::Hooks;
use crate::merge_tags::{MergeTagEngine, StandardFormatter, ValueFormatter, VariableReplacer};
use crate::settings::{self, ListColumn, SettingsSection};
use crate::site_tags::{SiteUrlTags, WithSiteUrlTags};
use crate::types::{Entry, Feed, Form};

pub const SLUG: &str = "gravityformswebhooks";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Static registration data for the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddOnDescriptor {
    pub slug: &'static str,
    pub path: &'static str,
    pub url: &'static str,
    pub title: &'static str,
    pub short_title: &'static str,
    pub version: &'static str,
    pub min_host_version: &'static str,
    pub capabilities: Vec<&'static str>,
    pub capabilities_settings_page: &'static str,
    pub capabilities_form_settings: &'static str,
    pub capabilities_uninstall: &'static str,
    pub async_feed_processing: bool,
}

impl Default for AddOnDescriptor {
    fn default() -> Self {
        Self {
            slug: SLUG,
            path: "gravityformswebhooks/webhooks.php",
            url: "http://www.gravityforms.com",
            title: "Gravity Forms Webhooks Add-On",
            short_title: "Webhooks",
            version: VERSION,
            min_host_version: "2.2",
            capabilities: vec!["gravityforms_webhooks", "gravityforms_webhooks_uninstall"],
            capabilities_settings_page: "gravityforms_webhooks",
            capabilities_form_settings: "gravityforms_webhooks",
            capabilities_uninstall: "gravityforms_webhooks_uninstall",
            async_feed_processing: true,
        }
    }
}

/// A stylesheet the host should enqueue on the given admin pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleSheet {
    pub handle: String,
    pub src: String,
    pub version: String,
    pub admin_pages: Vec<String>,
}

/// How the host wants a qualifying feed to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduling {
    Inline,
    Deferred,
}

/// Host feed-processing scheduler. The add-on never queues work itself.
pub trait FeedScheduler: Send + Sync {
    fn scheduling(&self, feed: &Feed, entry: &Entry, form: &Form) -> Scheduling;

    /// True while a payment-gateway delay holds this feed back.
    fn is_delayed(&self, _feed: &Feed, _entry: &Entry, _form: &Form) -> bool {
        false
    }

    /// Hand a deferred feed to the host's background processing.
    fn defer(&self, feed: Feed, entry: Entry, form: Form);
}

/// Runs every feed inline. Used when the host has no background processing.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineScheduler;

impl FeedScheduler for InlineScheduler {
    fn scheduling(&self, _feed: &Feed, _entry: &Entry, _form: &Form) -> Scheduling {
        Scheduling::Inline
    }

    fn defer(&self, _feed: Feed, _entry: Entry, _form: Form) {}
}

/// What `maybe_process_feed` did with a feed.
#[derive(Debug)]
pub enum FeedOutcome {
    Processed(DispatchOutcome),
    Deferred,
    Delayed,
    Inactive,
}

/// Host collaborators the add-on consumes.
#[derive(Clone)]
pub struct HostServices {
    pub merge_tags: Arc<dyn VariableReplacer>,
    pub formatter: Arc<dyn ValueFormatter>,
    /// When `None`, mappings resolve through the merge-tag replacer.
    pub field_map: Option<Arc<dyn FieldMapResolver>>,
    pub transport: Arc<dyn Transport>,
    pub feed_errors: Arc<dyn FeedErrorLog>,
    pub scheduler: Arc<dyn FeedScheduler>,
}

impl HostServices {
    /// Reference merge tags, inline scheduling and tracing-only feed errors
    /// around the given transport.
    pub fn standalone(transport: Arc<dyn Transport>) -> Self {
        let formatter: Arc<dyn ValueFormatter> = Arc::new(StandardFormatter);
        Self {
            merge_tags: Arc::new(MergeTagEngine::new(formatter.clone())),
            formatter,
            field_map: None,
            transport,
            feed_errors: Arc::new(TracingFeedErrorLog),
            scheduler: Arc::new(InlineScheduler),
        }
    }

    pub fn with_feed_errors(mut self, feed_errors: Arc<dyn FeedErrorLog>) -> Self {
        self.feed_errors = feed_errors;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn FeedScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }
}

pub trait FeedSettingsProvider {
    fn feed_settings_fields(&self) -> Vec<SettingsSection>;
}

pub trait FeedListProvider {
    fn feed_list_columns(&self) -> Vec<ListColumn>;

    fn can_duplicate_feed(&self, feed_id: u64) -> bool;
}

pub trait FeedProcessor {
    fn process_feed(&self, feed: &Feed, entry: &Entry, form: &Form) -> DispatchOutcome;
}

/// Everything the host needs from a registered feed add-on.
pub trait FeedAddOn: FeedSettingsProvider + FeedListProvider + FeedProcessor + Send + Sync {
    fn descriptor(&self) -> &AddOnDescriptor;

    fn styles(&self) -> Vec<StyleSheet>;
}

/// Host registry the add-on registers itself with at load time.
pub trait AddOnRegistry {
    /// False when the host lacks the feed add-on framework.
    fn supports_feed_add_ons(&self) -> bool;

    fn register(&mut self, add_on: Arc<dyn FeedAddOn>);
}

pub struct WebhooksAddOn {
    descriptor: AddOnDescriptor,
    config: SiteConfig,
    hooks: Hooks,
    merge_tags: Arc<dyn VariableReplacer>,
    field_map: Arc<dyn FieldMapResolver>,
    transport: Arc<dyn Transport>,
    feed_errors: Arc<dyn FeedErrorLog>,
    scheduler: Arc<dyn FeedScheduler>,
}

impl WebhooksAddOn {
    pub fn new(config: SiteConfig, hooks: Hooks, services: HostServices) -> Self {
        let merge_tags: Arc<dyn VariableReplacer> = Arc::new(WithSiteUrlTags::new(
            services.merge_tags,
            SiteUrlTags::from_config(&config),
            services.formatter,
        ));
        let field_map: Arc<dyn FieldMapResolver> = match services.field_map {
            Some(field_map) => field_map,
            None => Arc::new(GenericMapResolver::new(merge_tags.clone())),
        };
        Self {
            descriptor: AddOnDescriptor::default(),
            config,
            hooks,
            merge_tags,
            field_map,
            transport: services.transport,
            feed_errors: services.feed_errors,
            scheduler: services.scheduler,
        }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Merge-tag replacer including the site URL tags.
    pub fn merge_tags(&self) -> &dyn VariableReplacer {
        self.merge_tags.as_ref()
    }

    pub fn request_builder(&self) -> RequestBuilder<'_> {
        RequestBuilder::new(self.merge_tags.as_ref(), self.field_map.as_ref(), &self.hooks)
            .with_ssl_verify(self.config.ssl_verify)
    }

    pub fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(
            self.request_builder(),
            self.transport.as_ref(),
            self.feed_errors.as_ref(),
            &self.hooks,
        )
    }

    /// Entry point for a qualifying submission.
    ///
    /// `force_sync` (used when resending from the admin) skips the delay and
    /// scheduling decisions and dispatches inline.
    pub fn maybe_process_feed(&self, feed: &Feed, entry: &Entry, form: &Form, force_sync: bool) -> FeedOutcome {
        if !feed.is_active {
            debug!(feed_id = feed.id, "Feed is inactive; skipping");
            return FeedOutcome::Inactive;
        }
        if !force_sync {
            if self.scheduler.is_delayed(feed, entry, form) {
                debug!(feed_id = feed.id, "Feed processing is delayed");
                return FeedOutcome::Delayed;
            }
            if self.descriptor.async_feed_processing
                && self.scheduler.scheduling(feed, entry, form) == Scheduling::Deferred
            {
                debug!(feed_id = feed.id, "Deferring feed to background processing");
                self.scheduler.defer(feed.clone(), entry.clone(), form.clone());
                return FeedOutcome::Deferred;
            }
        }
        FeedOutcome::Processed(self.process_feed(feed, entry, form))
    }
}

impl FeedSettingsProvider for WebhooksAddOn {
    fn feed_settings_fields(&self) -> Vec<SettingsSection> {
        settings::feed_settings_fields(self.config.host_version())
    }
}

impl FeedListProvider for WebhooksAddOn {
    fn feed_list_columns(&self) -> Vec<ListColumn> {
        settings::feed_list_columns()
    }

    fn can_duplicate_feed(&self, _feed_id: u64) -> bool {
        true
    }
}

impl FeedProcessor for WebhooksAddOn {
    fn process_feed(&self, feed: &Feed, entry: &Entry, form: &Form) -> DispatchOutcome {
        self.dispatcher().process_feed(feed, entry, form)
    }
}

impl FeedAddOn for WebhooksAddOn {
    fn descriptor(&self) -> &AddOnDescriptor {
        &self.descriptor
    }

    fn styles(&self) -> Vec<StyleSheet> {
        vec![StyleSheet {
            handle: format!("{}_form_settings", self.descriptor.slug),
            src: format!("{}/css/form_settings.css", self.config.base_url()),
            version: self.descriptor.version.to_string(),
            admin_pages: vec!["form_settings".to_string()],
        }]
    }
}

/// Build the add-on and register it, if the host can host feed add-ons.
pub fn bootstrap(
    registry: &mut dyn AddOnRegistry,
    config: SiteConfig,
    hooks: Hooks,
    services: HostServices,
) -> Option<Arc<WebhooksAddOn>> {
    if !registry.supports_feed_add_ons() {
        info!("Host has no feed add-on framework; webhooks add-on not loaded");
        return None;
    }
    let add_on = Arc::new(WebhooksAddOn::new(config, hooks, services));
    registry.register(add_on.clone());
    info!(slug = SLUG, version = VERSION, "Registered webhooks add-on");
    Some(add_on)
}
