//! Host plugin integration.
//!
//! [`BridgePlugin`] is what the host bot framework holds on to. The host
//! calls [`BridgePlugin::on_enable`] and [`BridgePlugin::on_disable`]; the
//! plugin starts or stops the gateway and sends the startup tip to admins.

use std::net::SocketAddr;
use std::sync::Arc;

use oaibridge_core::{AdminNotifier, ConfigSources, GatewayConfig, resolve_config};
use oaibridge_proxy::GATEWAY_VERSION;
use tracing::{debug, error, info, warn};

use crate::supervisor::{GatewayStatus, GatewaySupervisor, SupervisorError};

/// Static description of the plugin, reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginMetadata {
    pub description: &'static str,
    pub author: &'static str,
    pub version: &'static str,
    /// Marks the plugin as an AI platform for the host's plugin registry.
    pub is_ai_platform: bool,
}

pub const PLUGIN_METADATA: PluginMetadata = PluginMetadata {
    description: "OpenAI API compatible gateway",
    author: "oaibridge contributors",
    version: GATEWAY_VERSION,
    is_ai_platform: true,
};

/// What happened during [`BridgePlugin::on_enable`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnableReport {
    /// Address the gateway is listening on, if it started.
    pub bound_address: Option<SocketAddr>,
    /// Admins that received the startup tip.
    pub notified: Vec<String>,
    /// Admins the tip could not be delivered to.
    pub failed: Vec<String>,
}

/// The gateway as a host plugin.
pub struct BridgePlugin {
    config: Arc<GatewayConfig>,
    supervisor: GatewaySupervisor,
}

impl BridgePlugin {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config: Arc::new(config),
            supervisor: GatewaySupervisor::new(),
        }
    }

    /// Build the plugin from the host's configuration files.
    ///
    /// A configuration that cannot be loaded leaves the plugin disabled.
    pub fn from_sources(sources: &ConfigSources) -> Self {
        let config = resolve_config(sources);
        if config.enabled {
            info!(
                models = ?config.available_models,
                "Gateway plugin initialized"
            );
        }
        Self::new(config)
    }

    pub const fn metadata(&self) -> &'static PluginMetadata {
        &PLUGIN_METADATA
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub async fn status(&self) -> GatewayStatus {
        self.supervisor.status().await
    }

    /// Start the gateway and notify admins.
    ///
    /// Does nothing when the gateway is disabled. Admin notification runs
    /// whether or not the server started, and a failure for one admin does
    /// not affect the others.
    pub async fn on_enable(&self, notifier: Option<&dyn AdminNotifier>) -> EnableReport {
        if !self.config.enabled {
            warn!("Gateway plugin is disabled, not starting the API server");
            return EnableReport::default();
        }

        let bound_address = match self.supervisor.start(Arc::clone(&self.config)).await {
            Ok(addr) => {
                info!(
                    "Gateway server started, listening on {}:{} ({addr})",
                    self.config.host, self.config.port
                );
                Some(addr)
            }
            Err(e) => {
                error!("Failed to start gateway server: {e}");
                None
            }
        };

        let (notified, failed) = match notifier {
            Some(notifier) if !self.config.command_tip.is_empty() => {
                notify_admins(notifier, &self.config.admins, &self.config.command_tip).await
            }
            _ => (Vec::new(), Vec::new()),
        };

        EnableReport {
            bound_address,
            notified,
            failed,
        }
    }

    /// Stop the gateway. Safe to call when it was never started.
    pub async fn on_disable(&self) {
        match self.supervisor.stop().await {
            Ok(()) => info!("Gateway server shut down"),
            Err(SupervisorError::NotRunning) => debug!("Gateway server was not running"),
            Err(e) => warn!("Gateway server did not shut down cleanly: {e}"),
        }
    }
}

/// Send `tip` to every admin, returning (delivered, failed) admin ids.
async fn notify_admins(
    notifier: &dyn AdminNotifier,
    admins: &[String],
    tip: &str,
) -> (Vec<String>, Vec<String>) {
    let mut notified = Vec::new();
    let mut failed = Vec::new();

    for admin in admins {
        match notifier.send_text(admin, tip).await {
            Ok(()) => notified.push(admin.clone()),
            Err(e) => {
                error!("Failed to send startup tip to admin {admin}: {e}");
                failed.push(admin.clone());
            }
        }
    }

    (notified, failed)
}
