//! Gateway lifecycle for oaibridge.
//!
//! - **GatewaySupervisor**: owns the server thread, provides start/stop/status
//! - **BridgePlugin**: enable/disable hooks called by the host bot framework

pub mod plugin;
pub mod supervisor;

pub use plugin::{BridgePlugin, EnableReport, PLUGIN_METADATA, PluginMetadata};
pub use supervisor::{GatewayStatus, GatewaySupervisor, SupervisorError};
