//! Site configuration for the add-on.
//!
//! Loaded from TOML, then overridden by `WEBHOOKS_*` environment variables.
//! Endpoint URLs not set explicitly are derived from `site_url`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::settings::HostVersion;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Public site root, e.g. `https://example.com`.
    pub site_url: String,
    pub admin_ajax_url: Option<String>,
    pub rest_api_url: Option<String>,
    /// Base URL the add-on's static assets are served from.
    pub base_url: Option<String>,
    /// Host platform version, e.g. `2.5.1`.
    pub host_version: String,
    /// Initial TLS verification flag before filters run.
    pub ssl_verify: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_url: "http://localhost".to_string(),
            admin_ajax_url: None,
            rest_api_url: None,
            base_url: None,
            host_version: "2.5".to_string(),
            ssl_verify: true,
        }
    }
}

impl SiteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path`, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)?.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `WEBHOOKS_*` overrides read through `lookup`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("WEBHOOKS_SITE_URL") {
            self.site_url = value;
        }
        if let Some(value) = lookup("WEBHOOKS_ADMIN_AJAX_URL") {
            self.admin_ajax_url = Some(value);
        }
        if let Some(value) = lookup("WEBHOOKS_REST_API_URL") {
            self.rest_api_url = Some(value);
        }
        if let Some(value) = lookup("WEBHOOKS_BASE_URL") {
            self.base_url = Some(value);
        }
        if let Some(value) = lookup("WEBHOOKS_HOST_VERSION") {
            self.host_version = value;
        }
        if let Some(value) = lookup("WEBHOOKS_SSL_VERIFY") {
            self.ssl_verify = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "WEBHOOKS_SSL_VERIFY",
                        value,
                    })
                }
            };
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.host_version.parse::<HostVersion>()?;
        Ok(())
    }

    pub fn host_version(&self) -> HostVersion {
        self.host_version
            .parse()
            .unwrap_or(HostVersion::new(0, 0, 0))
    }

    fn site_root(&self) -> &str {
        self.site_url.trim_end_matches('/')
    }

    pub fn admin_ajax_url(&self) -> String {
        self.admin_ajax_url
            .clone()
            .unwrap_or_else(|| format!("{}/wp-admin/admin-ajax.php", self.site_root()))
    }

    pub fn rest_api_url(&self) -> String {
        self.rest_api_url
            .clone()
            .unwrap_or_else(|| format!("{}/wp-json/", self.site_root()))
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("{}/wp-content/plugins/gravityformswebhooks", self.site_root()))
    }
}
