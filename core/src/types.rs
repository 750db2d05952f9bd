//! Feed, form and entry values handed over by the host.
//!
//! # Design
//! The host owns all three and stores them; the add-on only reads them. Feed
//! meta keeps the host's camelCase keys on the wire so stored feeds
//! deserialize as-is. Entries are ordered JSON maps because an entry is sent
//! verbatim as the payload when a feed posts all fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sentinel stored in a mapping pair when the admin typed a custom key or value.
pub const CUSTOM_VALUE: &str = "gf_custom";

/// One saved webhook configuration attached to a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub id: u64,
    pub form_id: u64,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub meta: FeedMeta,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedMeta {
    pub feed_name: String,
    #[serde(rename = "requestURL")]
    pub request_url: String,
    /// Free text; upper-cased only after the method filter has run.
    pub request_method: String,
    pub request_format: RequestFormat,
    #[serde(default)]
    pub request_headers: Vec<MapEntry>,
    pub request_body_type: RequestBodyType,
    #[serde(default)]
    pub field_values: Vec<MapEntry>,
    /// Conditional logic evaluated by the host before a feed qualifies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_condition: Option<Value>,
}

impl FeedMeta {
    /// Mapping pairs stored under a generic-map setting name.
    pub fn generic_map(&self, name: &str) -> &[MapEntry] {
        match name {
            "requestHeaders" => &self.request_headers,
            "fieldValues" => &self.field_values,
            _ => &[],
        }
    }
}

/// One row of a generic-map setting (header name/value, body key/value).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapEntry {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_value: Option<String>,
}

impl MapEntry {
    /// A pair whose key and value are both templates.
    pub fn custom(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: CUSTOM_VALUE.to_string(),
            value: CUSTOM_VALUE.to_string(),
            custom_key: Some(key.into()),
            custom_value: Some(value.into()),
        }
    }

    /// A pair with a fixed key whose value is a template or entry field id.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            custom_key: None,
            custom_value: None,
        }
    }

    /// Key template: `custom_key` when the sentinel is selected.
    pub fn key_template(&self) -> &str {
        if self.key == CUSTOM_VALUE {
            self.custom_key.as_deref().unwrap_or_default()
        } else {
            &self.key
        }
    }
}

/// Body encoding for POST and PUT requests. Anything but `json` is form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestFormat {
    Json,
    Form,
}

impl From<String> for RequestFormat {
    fn from(raw: String) -> Self {
        if raw == "json" {
            RequestFormat::Json
        } else {
            RequestFormat::Form
        }
    }
}

impl From<RequestFormat> for String {
    fn from(format: RequestFormat) -> Self {
        match format {
            RequestFormat::Json => "json".to_string(),
            RequestFormat::Form => "form".to_string(),
        }
    }
}

/// Which data goes in the request. Anything but `all_fields` selects fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestBodyType {
    AllFields,
    SelectFields,
}

impl From<String> for RequestBodyType {
    fn from(raw: String) -> Self {
        if raw == "all_fields" {
            RequestBodyType::AllFields
        } else {
            RequestBodyType::SelectFields
        }
    }
}

impl From<RequestBodyType> for String {
    fn from(body_type: RequestBodyType) -> Self {
        match body_type {
            RequestBodyType::AllFields => "all_fields".to_string(),
            RequestBodyType::SelectFields => "select_fields".to_string(),
        }
    }
}

/// Host-owned form definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fields: Vec<FormField>,
}

impl Form {
    pub fn field_by_label(&self, label: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.label == label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
}

/// One submission's values, keyed by field id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entry(Map<String, Value>);

impl Entry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and host adapters.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The entry id, when the host included one.
    pub fn id(&self) -> Option<u64> {
        match self.0.get("id")? {
            Value::Number(number) => number.as_u64(),
            Value::String(text) => text.parse().ok(),
            _ => None,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Entry {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Entry {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
