//! Configuration file resolution.
//!
//! The gateway reads two independent TOML files:
//!
//! - the bot-wide file (`main_config.toml`), from which only the
//!   `[XYBot].admins` list is taken;
//! - the plugin-local file (`config.toml`), whose `[OpenAIAPI]` table holds
//!   every other setting.
//!
//! Missing tables and keys fall back to defaults. A file that cannot be read
//! or parsed is a [`ConfigError`]; [`resolve_config`] turns that into a
//! disabled configuration so the host keeps running.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tracing::{debug, error};

use crate::settings::{
    ConfigError, DEFAULT_BASE_URL, DEFAULT_GATEWAY_HOST, DEFAULT_GATEWAY_PORT, DEFAULT_MODEL,
    GatewayConfig, GenerationDefaults, validate_config,
};

/// Locations of the two configuration files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSources {
    /// Bot-wide configuration (admin list).
    pub main_config: PathBuf,
    /// Plugin-local configuration (everything else).
    pub plugin_config: PathBuf,
}

impl Default for ConfigSources {
    fn default() -> Self {
        Self {
            main_config: PathBuf::from("main_config.toml"),
            plugin_config: PathBuf::from("config.toml"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct MainFile {
    #[serde(rename = "XYBot", default)]
    bot: BotSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BotSection {
    admins: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PluginFile {
    #[serde(rename = "OpenAIAPI", default)]
    plugin: PluginSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PluginSection {
    enable: bool,
    #[serde(rename = "api-key")]
    api_key: String,
    #[serde(rename = "base-url")]
    base_url: String,
    #[serde(rename = "default-model")]
    default_model: String,
    #[serde(rename = "available-models")]
    available_models: Vec<String>,
    port: u16,
    host: String,
    #[serde(rename = "command-tip")]
    command_tip: String,
    #[serde(rename = "http-proxy")]
    http_proxy: String,
    price: f64,
    admin_ignore: bool,
    whitelist_ignore: bool,
    #[serde(deserialize_with = "token_count")]
    max_tokens: i64,
    temperature: f64,
    top_p: f64,
    frequency_penalty: f64,
    presence_penalty: f64,
    /// Seconds; zero disables the timeout.
    #[serde(rename = "request-timeout")]
    request_timeout: u64,
}

impl Default for PluginSection {
    fn default() -> Self {
        let defaults = GenerationDefaults::default();
        Self {
            enable: false,
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            available_models: vec![DEFAULT_MODEL.to_string()],
            port: DEFAULT_GATEWAY_PORT,
            host: DEFAULT_GATEWAY_HOST.to_string(),
            command_tip: String::new(),
            http_proxy: String::new(),
            price: 0.0,
            admin_ignore: true,
            whitelist_ignore: true,
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
            top_p: defaults.top_p,
            frequency_penalty: defaults.frequency_penalty,
            presence_penalty: defaults.presence_penalty,
            request_timeout: 0,
        }
    }
}

impl PluginSection {
    fn into_config(self, admins: Vec<String>) -> GatewayConfig {
        GatewayConfig {
            enabled: self.enable,
            api_key: self.api_key,
            base_url: self.base_url,
            default_model: self.default_model,
            available_models: self.available_models,
            host: self.host,
            port: self.port,
            command_tip: self.command_tip,
            http_proxy: Some(self.http_proxy).filter(|p| !p.trim().is_empty()),
            price: self.price,
            admin_ignore: self.admin_ignore,
            whitelist_ignore: self.whitelist_ignore,
            defaults: GenerationDefaults {
                max_tokens: self.max_tokens,
                temperature: self.temperature,
                top_p: self.top_p,
                frequency_penalty: self.frequency_penalty,
                presence_penalty: self.presence_penalty,
            },
            request_timeout: (self.request_timeout > 0)
                .then(|| Duration::from_secs(self.request_timeout)),
            admins,
        }
    }
}

/// TOML numbers for `max_tokens` may be written as floats; the fraction is
/// dropped.
#[allow(clippy::cast_possible_truncation)]
fn token_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Int(i64),
        Float(f64),
    }

    Ok(match Number::deserialize(deserializer)? {
        Number::Int(n) => n,
        Number::Float(f) => f.trunc() as i64,
    })
}

fn parse_toml<T: for<'de> Deserialize<'de>>(contents: &str, origin: &str) -> Result<T, ConfigError> {
    toml::from_str(contents).map_err(|e| ConfigError::Parse {
        path: origin.to_string(),
        reason: e.to_string(),
    })
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn build_config(
    main_toml: &str,
    main_origin: &str,
    plugin_toml: &str,
    plugin_origin: &str,
) -> Result<GatewayConfig, ConfigError> {
    let main: MainFile = parse_toml(main_toml, main_origin)?;
    let plugin: PluginFile = parse_toml(plugin_toml, plugin_origin)?;

    let config = plugin.plugin.into_config(main.bot.admins);
    validate_config(&config)?;
    Ok(config)
}

/// Build a configuration from the contents of both files.
pub fn parse_config(main_toml: &str, plugin_toml: &str) -> Result<GatewayConfig, ConfigError> {
    build_config(main_toml, "main config", plugin_toml, "plugin config")
}

/// Read and parse both configuration files.
pub fn load_config(sources: &ConfigSources) -> Result<GatewayConfig, ConfigError> {
    let main_contents = read_file(&sources.main_config)?;
    let plugin_contents = read_file(&sources.plugin_config)?;

    let config = build_config(
        &main_contents,
        &sources.main_config.display().to_string(),
        &plugin_contents,
        &sources.plugin_config.display().to_string(),
    )?;

    debug!(
        enabled = config.enabled,
        base_url = %config.base_url,
        models = config.available_models.len(),
        admins = config.admins.len(),
        "Loaded gateway configuration"
    );
    Ok(config)
}

/// Load the configuration, falling back to a disabled default on any error.
pub fn resolve_config(sources: &ConfigSources) -> GatewayConfig {
    match load_config(sources) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load gateway configuration, gateway disabled: {e}");
            GatewayConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const FULL_PLUGIN: &str = r#"
[OpenAIAPI]
enable = true
api-key = "sk-configured"
base-url = "https://llm.example.com/v1"
default-model = "gpt-4"
available-models = ["gpt-4", "gpt-4o-mini"]
port = 9100
host = "127.0.0.1"
command-tip = "gateway is up"
http-proxy = "http://127.0.0.1:7890"
price = 2
admin_ignore = false
whitelist_ignore = false
max_tokens = 2000
temperature = 1
top_p = 0.9
frequency_penalty = 0.5
presence_penalty = 0.25
request-timeout = 30
"#;

    const MAIN: &str = r#"
[XYBot]
admins = ["admin-1", "admin-2"]
"#;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(MAIN, FULL_PLUGIN).unwrap();

        assert!(config.enabled);
        assert_eq!(config.credential(), Some("sk-configured"));
        assert_eq!(config.base_url, "https://llm.example.com/v1");
        assert_eq!(config.default_model, "gpt-4");
        assert_eq!(config.available_models, vec!["gpt-4", "gpt-4o-mini"]);
        assert_eq!(config.bind_address(), "127.0.0.1:9100");
        assert_eq!(config.command_tip, "gateway is up");
        assert_eq!(config.http_proxy.as_deref(), Some("http://127.0.0.1:7890"));
        assert!(!config.admin_ignore);
        assert!(!config.whitelist_ignore);
        assert_eq!(config.defaults.max_tokens, 2000);
        assert!((config.defaults.temperature - 1.0).abs() < f64::EPSILON);
        assert!((config.defaults.top_p - 0.9).abs() < f64::EPSILON);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.admins, vec!["admin-1", "admin-2"]);
    }

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let config = parse_config("", "[OpenAIAPI]\nenable = true\n").unwrap();

        let expected = GatewayConfig {
            enabled: true,
            ..GatewayConfig::default()
        };
        assert_eq!(config, expected);
    }

    #[test]
    fn test_missing_tables_yield_disabled_defaults() {
        let config = parse_config("[Other]\nkey = 1\n", "").unwrap();
        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn test_blank_proxy_means_direct() {
        let config = parse_config("", "[OpenAIAPI]\nhttp-proxy = \"  \"\n").unwrap();
        assert!(config.http_proxy.is_none());
    }

    #[test]
    fn test_float_max_tokens_is_truncated() {
        let config = parse_config("", "[OpenAIAPI]\nenable = true\nmax_tokens = 2000.7\n").unwrap();
        assert!(config.enabled);
        assert_eq!(config.defaults.max_tokens, 2000);
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let dir = tempdir().unwrap();
        let sources = ConfigSources {
            main_config: dir.path().join("main_config.toml"),
            plugin_config: dir.path().join("config.toml"),
        };
        fs::write(&sources.main_config, MAIN).unwrap();
        fs::write(&sources.plugin_config, "[OpenAIAPI]\nport = \"x\"\n").unwrap();

        match load_config(&sources) {
            Err(ConfigError::Parse { path, .. }) => assert!(path.ends_with("config.toml")),
            other => panic!("Expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = parse_config("", "[OpenAIAPI]\nport = \"not a number\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempdir().unwrap();
        let sources = ConfigSources {
            main_config: dir.path().join("main_config.toml"),
            plugin_config: dir.path().join("config.toml"),
        };
        fs::write(&sources.main_config, MAIN).unwrap();
        fs::write(&sources.plugin_config, FULL_PLUGIN).unwrap();

        let config = load_config(&sources).unwrap();
        assert!(config.enabled);
        assert_eq!(config.admins.len(), 2);
    }

    #[test]
    fn test_resolve_missing_file_disables_gateway() {
        let dir = tempdir().unwrap();
        let sources = ConfigSources {
            main_config: dir.path().join("missing_main.toml"),
            plugin_config: dir.path().join("config.toml"),
        };
        fs::write(&sources.plugin_config, FULL_PLUGIN).unwrap();

        assert!(matches!(
            load_config(&sources),
            Err(ConfigError::Read { .. })
        ));
        assert_eq!(resolve_config(&sources), GatewayConfig::default());
    }

    #[test]
    fn test_resolve_invalid_toml_disables_gateway() {
        let dir = tempdir().unwrap();
        let sources = ConfigSources {
            main_config: dir.path().join("main_config.toml"),
            plugin_config: dir.path().join("config.toml"),
        };
        fs::write(&sources.main_config, MAIN).unwrap();
        fs::write(&sources.plugin_config, "[OpenAIAPI\nenable = true").unwrap();

        let config = resolve_config(&sources);
        assert!(!config.enabled);
        assert!(config.admins.is_empty());
    }
}
