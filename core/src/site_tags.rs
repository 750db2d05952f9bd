//! `{admin_ajax_url}` and `{rest_api_url}` merge tags.
//!
//! Both are plain, case-sensitive string replacements. They only apply when
//! the caller supplies both a form and an entry, and the replacement value
//! goes through the host value formatter with the caller's flags.

use std::sync::Arc;

use crate::config::SiteConfig;
use crate::merge_tags::{ReplaceOptions, ValueFormatter, VariableReplacer};
use crate::types::{Entry, Form};

pub const ADMIN_AJAX_URL_TAG: &str = "{admin_ajax_url}";
pub const REST_API_URL_TAG: &str = "{rest_api_url}";

/// Site endpoint URLs exposed as merge tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUrlTags {
    admin_ajax_url: String,
    rest_api_url: String,
}

impl SiteUrlTags {
    pub fn new(admin_ajax_url: impl Into<String>, rest_api_url: impl Into<String>) -> Self {
        Self {
            admin_ajax_url: admin_ajax_url.into(),
            rest_api_url: rest_api_url.into(),
        }
    }

    pub fn from_config(config: &SiteConfig) -> Self {
        Self::new(config.admin_ajax_url(), config.rest_api_url())
    }

    pub fn replace(
        &self,
        text: &str,
        form: Option<&Form>,
        entry: Option<&Entry>,
        options: &ReplaceOptions,
        formatter: &dyn ValueFormatter,
    ) -> String {
        if form.is_none() || entry.is_none() {
            return text.to_string();
        }
        let mut out = text.to_string();
        for (tag, url) in [
            (ADMIN_AJAX_URL_TAG, &self.admin_ajax_url),
            (REST_API_URL_TAG, &self.rest_api_url),
        ] {
            if out.contains(tag) {
                out = out.replace(tag, &formatter.format_variable_value(url, options));
            }
        }
        out
    }
}

/// Wraps the host replacer so the site URL tags resolve first.
pub struct WithSiteUrlTags {
    inner: Arc<dyn VariableReplacer>,
    tags: SiteUrlTags,
    formatter: Arc<dyn ValueFormatter>,
}

impl WithSiteUrlTags {
    pub fn new(
        inner: Arc<dyn VariableReplacer>,
        tags: SiteUrlTags,
        formatter: Arc<dyn ValueFormatter>,
    ) -> Self {
        Self {
            inner,
            tags,
            formatter,
        }
    }
}

impl VariableReplacer for WithSiteUrlTags {
    fn replace_variables(
        &self,
        text: &str,
        form: Option<&Form>,
        entry: Option<&Entry>,
        options: &ReplaceOptions,
    ) -> String {
        let text = self.tags.replace(text, form, entry, options, self.formatter.as_ref());
        self.inner.replace_variables(&text, form, entry, options)
    }
}
