//! Resolution of generic-map settings into ordered key/value pairs.
//!
//! A mapping row names its key either directly or through `custom_key`, and
//! its value either as an entry field id, a literal template, or through
//! `custom_value`. Key and value templates both go through merge-tag
//! replacement in plain-text mode.

use std::sync::Arc;

use serde_json::Value;

use crate::merge_tags::{value_to_text, ReplaceOptions, VariableReplacer};
use crate::types::{Entry, Feed, Form, MapEntry, CUSTOM_VALUE};

/// Host routine that turns a generic-map setting into resolved pairs.
pub trait FieldMapResolver: Send + Sync {
    /// Resolve the mapping stored under `setting` (e.g. `requestHeaders`).
    /// Pairs come back in configured order; names may be empty.
    fn generic_map_fields(&self, feed: &Feed, setting: &str, form: &Form, entry: &Entry) -> Vec<(String, Value)>;
}

/// Default resolver backed by a merge-tag replacer.
#[derive(Clone)]
pub struct GenericMapResolver {
    merge_tags: Arc<dyn VariableReplacer>,
}

impl GenericMapResolver {
    pub fn new(merge_tags: Arc<dyn VariableReplacer>) -> Self {
        Self { merge_tags }
    }

    fn resolve_value(&self, mapping: &MapEntry, form: &Form, entry: &Entry) -> Value {
        if mapping.value == CUSTOM_VALUE {
            let template = mapping.custom_value.as_deref().unwrap_or_default();
            return Value::String(self.replace(template, form, entry));
        }
        match entry.get(&mapping.value) {
            Some(value) => value.clone(),
            None => Value::String(self.replace(&mapping.value, form, entry)),
        }
    }

    fn replace(&self, template: &str, form: &Form, entry: &Entry) -> String {
        self.merge_tags
            .replace_variables(template, Some(form), Some(entry), &ReplaceOptions::text())
    }
}

impl FieldMapResolver for GenericMapResolver {
    fn generic_map_fields(&self, feed: &Feed, setting: &str, form: &Form, entry: &Entry) -> Vec<(String, Value)> {
        feed.meta
            .generic_map(setting)
            .iter()
            .map(|mapping| {
                let name = self.replace(mapping.key_template(), form, entry);
                (name, self.resolve_value(mapping, form, entry))
            })
            .collect()
    }
}

/// Resolved value as header text.
pub fn header_value(value: &Value) -> String {
    value_to_text(value)
}
