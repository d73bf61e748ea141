//! Gateway configuration domain types and validation.
//!
//! [`GatewayConfig`] is built once at startup and shared read-only by every
//! request handler. Reading it from disk lives in [`crate::config_file`].

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default upstream API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Model used when a request does not name one.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Default bind host for the gateway (all interfaces).
pub const DEFAULT_GATEWAY_HOST: &str = "0.0.0.0";

/// Default bind port for the gateway.
pub const DEFAULT_GATEWAY_PORT: u16 = 8100;

/// Sampling parameters injected into requests that omit them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationDefaults {
    /// Injected only when greater than zero.
    pub max_tokens: i64,
    pub temperature: f64,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

/// Fully resolved gateway configuration.
///
/// Either every field comes from the configuration files (with per-key
/// defaults) or the whole value is [`GatewayConfig::default`], which is
/// disabled.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// Whether the gateway should start at all.
    pub enabled: bool,
    /// Upstream credential; empty means "use the caller's bearer token".
    pub api_key: String,
    /// Upstream API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Model filled into requests without a `model` field.
    pub default_model: String,
    /// Models advertised by `GET /v1/models`, in order.
    pub available_models: Vec<String>,
    pub host: String,
    pub port: u16,
    /// Message sent to each admin once the gateway has been enabled.
    pub command_tip: String,
    /// Outbound proxy for upstream calls.
    pub http_proxy: Option<String>,
    /// Per-call price for the host's credit system. Not used by forwarding.
    pub price: f64,
    /// Consumed by the host framework's access checks.
    pub admin_ignore: bool,
    /// Consumed by the host framework's access checks.
    pub whitelist_ignore: bool,
    pub defaults: GenerationDefaults,
    /// Upper bound on a single upstream call. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    /// Bot-wide admin identifiers that receive the startup tip.
    pub admins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            available_models: vec![DEFAULT_MODEL.to_string()],
            host: DEFAULT_GATEWAY_HOST.to_string(),
            port: DEFAULT_GATEWAY_PORT,
            command_tip: String::new(),
            http_proxy: None,
            price: 0.0,
            admin_ignore: true,
            whitelist_ignore: true,
            defaults: GenerationDefaults::default(),
            request_timeout: None,
            admins: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// `host:port` string suitable for binding a listener.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The configured upstream credential, if any.
    #[must_use]
    pub fn credential(&self) -> Option<&str> {
        Some(self.api_key.as_str()).filter(|key| !key.is_empty())
    }

    /// Full upstream URL for chat completions.
    #[must_use]
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Configuration loading or validation error.
///
/// Any of these leaves the gateway disabled; none of them stop the host.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to parse config file {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("Base URL cannot be empty")]
    EmptyBaseUrl,

    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Invalid HTTP proxy '{url}': {reason}")]
    InvalidProxy { url: String, reason: String },
}

/// Validate a resolved configuration.
///
/// A disabled configuration is always valid since nothing will be served.
pub fn validate_config(config: &GatewayConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    if config.base_url.trim().is_empty() {
        return Err(ConfigError::EmptyBaseUrl);
    }
    check_http_url(&config.base_url).map_err(|reason| ConfigError::InvalidBaseUrl {
        url: config.base_url.clone(),
        reason,
    })?;

    if let Some(proxy) = &config.http_proxy {
        let parsed = Url::parse(proxy).map_err(|e| ConfigError::InvalidProxy {
            url: proxy.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidProxy {
                url: proxy.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
    }

    Ok(())
}

fn check_http_url(raw: &str) -> Result<(), String> {
    let parsed = Url::parse(raw).map_err(|e| e.to_string())?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}
