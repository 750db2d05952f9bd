//! Merge-tag replacement contract and a reference engine.
//!
//! # Design
//! Merge-tag replacement belongs to the host. The add-on only needs the
//! contract: `(text, form, entry, options) -> String`, which never fails.
//! [`MergeTagEngine`] implements that contract for standalone use and for
//! tests. It resolves `{Label:id}`, `{id}` and `{Label}` against the entry
//! and leaves every other token untouched so that later replacers, or the
//! host, can still see it.

use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use serde_json::Value;

use crate::types::{Entry, Form};

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}\s][^{}]*)\}").expect("merge tag pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Html,
    Text,
}

/// Formatting flags passed along with every replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOptions {
    pub url_encode: bool,
    pub esc_html: bool,
    pub nl2br: bool,
    pub format: OutputFormat,
}

impl ReplaceOptions {
    /// Plain text: no escaping, no encoding, no line-break conversion.
    /// Used for request URLs and mapped header/body values.
    pub const fn text() -> Self {
        Self {
            url_encode: false,
            esc_html: false,
            nl2br: false,
            format: OutputFormat::Text,
        }
    }
}

impl Default for ReplaceOptions {
    fn default() -> Self {
        Self {
            url_encode: false,
            esc_html: true,
            nl2br: true,
            format: OutputFormat::Html,
        }
    }
}

/// Host merge-tag replacement.
pub trait VariableReplacer: Send + Sync {
    /// Replace tokens in `text`. Tokens that cannot be resolved are left
    /// as-is or emptied, at the implementation's discretion.
    fn replace_variables(
        &self,
        text: &str,
        form: Option<&Form>,
        entry: Option<&Entry>,
        options: &ReplaceOptions,
    ) -> String;
}

/// Host routine that formats a single substituted value.
pub trait ValueFormatter: Send + Sync {
    fn format_variable_value(&self, value: &str, options: &ReplaceOptions) -> String;
}

/// URL-encode, then HTML-escape, then convert newlines (html only).
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFormatter;

impl ValueFormatter for StandardFormatter {
    fn format_variable_value(&self, value: &str, options: &ReplaceOptions) -> String {
        let mut out = if options.url_encode {
            urlencoding::encode(value).into_owned()
        } else {
            value.to_string()
        };
        if options.esc_html {
            out = escape_html(&out);
        }
        if options.nl2br && options.format == OutputFormat::Html {
            out = out.replace("\r\n", "\n").replace('\n', "<br />\n");
        }
        out
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

/// Text form of an entry value: arrays joined by `, `, objects as JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(value_to_text).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// Field merge tags resolved straight from the entry.
#[derive(Clone)]
pub struct MergeTagEngine {
    formatter: Arc<dyn ValueFormatter>,
}

impl MergeTagEngine {
    pub fn new(formatter: Arc<dyn ValueFormatter>) -> Self {
        Self { formatter }
    }

    fn resolve(&self, token: &str, form: &Form, entry: &Entry) -> Option<String> {
        if token == "form_title" {
            return Some(form.title.clone());
        }
        let mut parts = token.splitn(3, ':');
        let label = parts.next().unwrap_or_default();
        if let Some(id) = parts.next().filter(|id| !id.is_empty()) {
            if let Some(value) = entry.get(id) {
                return Some(value_to_text(value));
            }
        }
        if let Some(value) = entry.get(token) {
            return Some(value_to_text(value));
        }
        let field = form.field_by_label(label)?;
        Some(entry.get(&field.id).map(value_to_text).unwrap_or_default())
    }
}

impl Default for MergeTagEngine {
    fn default() -> Self {
        Self::new(Arc::new(StandardFormatter))
    }
}

impl std::fmt::Debug for MergeTagEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeTagEngine").finish_non_exhaustive()
    }
}

impl VariableReplacer for MergeTagEngine {
    fn replace_variables(
        &self,
        text: &str,
        form: Option<&Form>,
        entry: Option<&Entry>,
        options: &ReplaceOptions,
    ) -> String {
        let (Some(form), Some(entry)) = (form, entry) else {
            return text.to_string();
        };
        TOKEN
            .replace_all(text, |caps: &Captures| match self.resolve(&caps[1], form, entry) {
                Some(value) => self.formatter.format_variable_value(&value, options),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}
