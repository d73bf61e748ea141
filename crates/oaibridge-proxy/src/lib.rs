//! OpenAI-compatible forwarding gateway.
//!
//! Serves `/v1/models`, `/v1/chat/completions`, `/` and `/docs`, forwarding
//! chat completions to the configured upstream provider.
#![deny(unsafe_code)]

pub mod error;
pub mod forward;
pub mod models;
pub mod server;

pub use error::ForwardError;
pub use server::{GATEWAY_VERSION, build_client, create_router, serve};
