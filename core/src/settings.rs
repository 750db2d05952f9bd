//! Declarative feed settings for the host's admin UI.
//!
//! # Design
//! Everything here is plain data serialized to JSON for the host renderer.
//! The only decisions made are which header names to offer and which
//! dependency shape the field-values map uses, which depends on the host
//! version.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ConfigError;

/// Common HTTP header names offered as key choices for request headers.
pub const COMMON_HEADERS: &[&str] = &[
    "Accept",
    "Accept-Charset",
    "Accept-Encoding",
    "Accept-Language",
    "Accept-Datetime",
    "Authorization",
    "Cache-Control",
    "Connection",
    "Cookie",
    "Content-Length",
    "Content-Type",
    "Date",
    "Expect",
    "Forwarded",
    "From",
    "Host",
    "If-Match",
    "If-Modified-Since",
    "If-None-Match",
    "If-Range",
    "If-Unmodified-Since",
    "Max-Forwards",
    "Origin",
    "Pragma",
    "Proxy-Authorization",
    "Range",
    "Referer",
    "TE",
    "User-Agent",
    "Upgrade",
    "Via",
    "Warning",
];

/// First host version that understands live dependency rules.
const LIVE_DEPENDENCY_VERSION: HostVersion = HostVersion([2, 5, 0]);

/// Dotted host version, compared numerically (`2.10` > `2.9`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostVersion([u32; 3]);

impl HostVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self([major, minor, patch])
    }

    pub fn supports_live_dependencies(&self) -> bool {
        *self >= LIVE_DEPENDENCY_VERSION
    }
}

impl FromStr for HostVersion {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidValue {
            key: "host_version",
            value: raw.to_string(),
        };
        let mut parts = [0u32; 3];
        let mut count = 0;
        for (slot, piece) in raw.trim().split('.').enumerate() {
            if slot >= parts.len() {
                break;
            }
            parts[slot] = piece.parse().map_err(|_| invalid())?;
            count += 1;
        }
        if count == 0 {
            return Err(invalid());
        }
        Ok(Self(parts))
    }
}

impl PartialOrd for HostVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HostVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Display for HostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0[0], self.0[1], self.0[2])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub label: String,
    pub value: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    fn same(value: &str) -> Self {
        Self::new(value, value)
    }
}

/// Header-name choices, headed by an empty placeholder.
pub fn header_choices() -> Vec<Choice> {
    std::iter::once(Choice::new("Select a Name", ""))
        .chain(COMMON_HEADERS.iter().map(|name| Choice::same(name)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Select,
    Radio,
    GenericMap,
    FeedCondition,
}

/// Choices for one column of a generic map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MapChoices {
    List(Vec<Choice>),
    /// The host fills this in with the form's fields.
    Named(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapColumn {
    pub choices: MapChoices,
    pub custom_value: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyRule {
    pub field: String,
    pub values: Vec<String>,
}

/// Show-if rule. Hosts from 2.5 evaluate the live form; older ones the saved value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Dependency {
    Live { live: bool, fields: Vec<DependencyRule> },
    Legacy(DependencyRule),
}

impl Dependency {
    pub fn for_host(version: HostVersion, rule: DependencyRule) -> Self {
        if version.supports_live_dependencies() {
            Dependency::Live {
                live: true,
                fields: vec![rule],
            }
        } else {
            Dependency::Legacy(rule)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub horizontal: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub merge_tags: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onchange: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_field: Option<MapColumn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_field: Option<MapColumn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency: Option<Dependency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkbox_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl SettingsField {
    fn new(name: &str, label: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            field_type,
            class: None,
            required: false,
            default_value: None,
            tooltip: None,
            choices: Vec::new(),
            horizontal: false,
            merge_tags: false,
            onchange: None,
            key_field: None,
            value_field: None,
            dependency: None,
            checkbox_label: None,
            instructions: None,
        }
    }

    fn class(mut self, class: &str) -> Self {
        self.class = Some(class.to_string());
        self
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn default_value(mut self, value: &str) -> Self {
        self.default_value = Some(value.to_string());
        self
    }

    fn tooltip(mut self, text: &str) -> Self {
        self.tooltip = Some(format!("<h6>{}</h6>{}", self.label, text));
        self
    }

    fn choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = choices;
        self
    }

    fn form_field_values(mut self) -> Self {
        self.merge_tags = true;
        self.value_field = Some(MapColumn {
            choices: MapChoices::Named("form_fields"),
            custom_value: true,
            title: None,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub fields: Vec<SettingsField>,
}

impl SettingsSection {
    fn of(fields: Vec<SettingsField>) -> Self {
        Self { title: None, fields }
    }
}

/// The feed settings form, in display order.
pub fn feed_settings_fields(host_version: HostVersion) -> Vec<SettingsSection> {
    vec![
        SettingsSection::of(vec![SettingsField::new("feedName", "Name", FieldType::Text)
            .class("medium")
            .required()
            .tooltip("Enter a feed name to uniquely identify this setup.")]),
        SettingsSection::of(vec![
            SettingsField::new("requestURL", "Request URL", FieldType::Text)
                .class("large merge-tag-support mt-position-right mt-hide_all_fields")
                .required()
                .tooltip("Enter the URL to be used in the webhook request."),
            SettingsField::new("requestMethod", "Request Method", FieldType::Select)
                .default_value("POST")
                .required()
                .tooltip("Select the HTTP method used for the webhook request.")
                .choices(["GET", "POST", "PUT", "PATCH", "DELETE"].into_iter().map(Choice::same).collect()),
            SettingsField::new("requestFormat", "Request Format", FieldType::Select)
                .default_value("json")
                .required()
                .tooltip("Select the format for the webhook request.")
                .choices(vec![Choice::new("JSON", "json"), Choice::new("FORM", "form")]),
        ]),
        SettingsSection::of(vec![request_headers_field()]),
        SettingsSection::of(vec![request_body_type_field(), field_values_field(host_version)]),
        SettingsSection::of(vec![feed_condition_field()]),
    ]
}

fn request_headers_field() -> SettingsField {
    let mut field = SettingsField::new("requestHeaders", "Request Headers", FieldType::GenericMap)
        .tooltip("Setup the HTTP headers to be sent with the webhook request.")
        .form_field_values();
    field.key_field = Some(MapColumn {
        choices: MapChoices::List(header_choices()),
        custom_value: true,
        title: Some("Name".to_string()),
    });
    field
}

fn request_body_type_field() -> SettingsField {
    let mut field = SettingsField::new("requestBodyType", "Request Body", FieldType::Radio)
        .default_value("all_fields")
        .required()
        .tooltip("Select if all fields or select fields should be sent with the webhook request.")
        .choices(vec![
            Choice::new("All Fields", "all_fields"),
            Choice::new("Select Fields", "select_fields"),
        ]);
    field.horizontal = true;
    field.onchange = Some("jQuery(this).closest('form').submit();".to_string());
    field
}

fn field_values_field(host_version: HostVersion) -> SettingsField {
    let mut field = SettingsField::new("fieldValues", "Field Values", FieldType::GenericMap)
        .required()
        .tooltip("Setup the fields to be sent in the webhook request.")
        .form_field_values();
    field.dependency = Some(Dependency::for_host(
        host_version,
        DependencyRule {
            field: "requestBodyType".to_string(),
            values: vec!["select_fields".to_string()],
        },
    ));
    field
}

fn feed_condition_field() -> SettingsField {
    let mut field = SettingsField::new("feedCondition", "Webhook Condition", FieldType::FeedCondition);
    field.checkbox_label = Some("Enable Condition".to_string());
    field.instructions = Some("Execute Webhook if".to_string());
    field
}

/// One column of the feed list table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListColumn {
    pub key: &'static str,
    pub label: &'static str,
}

pub fn feed_list_columns() -> Vec<ListColumn> {
    vec![
        ListColumn {
            key: "feedName",
            label: "Name",
        },
        ListColumn {
            key: "requestURL",
            label: "Request URL",
        },
    ]
}
