//! Core configuration types and port definitions for oaibridge.
//!
//! This crate holds the immutable [`GatewayConfig`], the resolver that builds
//! it from the host's TOML files, and the ports the gateway expects its host
//! to provide. It has no HTTP server or client dependencies.
#![deny(unused_crate_dependencies)]

pub mod config_file;
pub mod ports;
pub mod settings;

pub use config_file::{ConfigSources, load_config, parse_config, resolve_config};
pub use ports::{AdminNotifier, NotifyError};
pub use settings::{
    ConfigError, DEFAULT_BASE_URL, DEFAULT_GATEWAY_HOST, DEFAULT_GATEWAY_PORT, DEFAULT_MODEL,
    GatewayConfig, GenerationDefaults, validate_config,
};
