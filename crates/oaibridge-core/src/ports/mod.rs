//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the gateway expects from its host. They
//! contain no implementation details.

pub mod admin_notifier;

pub use admin_notifier::{AdminNotifier, NotifyError};
