//! Axum HTTP server for the OpenAI-compatible gateway.
//!
//! This module provides the `serve()` function that runs the gateway
//! using a pre-bound TcpListener (from the supervisor).

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use oaibridge_core::GatewayConfig;
use reqwest::{Client, Proxy};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::forward::forward_chat_completion;
use crate::models::{DocsInfo, ModelsResponse, ServiceInfo};

/// Version reported by `GET /`.
pub const GATEWAY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared application state for the gateway.
#[derive(Clone)]
struct AppState {
    /// HTTP client for forwarding requests upstream.
    client: Client,
    /// Read-only configuration shared by every handler.
    config: Arc<GatewayConfig>,
}

/// Build the upstream HTTP client from the configured proxy and timeout.
///
/// Without a configured proxy the client connects directly; proxy
/// environment variables are ignored.
pub fn build_client(config: &GatewayConfig) -> anyhow::Result<Client> {
    let mut builder = Client::builder();

    if let Some(proxy_url) = &config.http_proxy {
        let proxy = Proxy::all(proxy_url)
            .with_context(|| format!("Invalid HTTP proxy '{proxy_url}'"))?;
        builder = builder.proxy(proxy);
        debug!(proxy = %proxy_url, "Routing upstream calls through proxy");
    } else {
        builder = builder.no_proxy();
    }

    if let Some(timeout) = config.request_timeout {
        builder = builder.timeout(timeout);
    }

    Ok(builder.build()?)
}

/// Build the gateway router with all routes and layers applied.
///
/// Request bodies are not size-limited; chat payloads with inline images
/// are forwarded as-is.
pub fn create_router(config: Arc<GatewayConfig>) -> anyhow::Result<Router> {
    let client = build_client(&config)?;
    let state = AppState { client, config };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(Router::new()
        .route("/", get(service_info))
        .route("/docs", get(docs))
        .route("/v1/models", get(list_models))
        .route("/v1/chat/completions", post(chat_completions))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Start the gateway with a pre-bound listener.
///
/// Runs until the cancellation token is triggered. In-flight requests are
/// allowed to finish.
pub async fn serve(
    listener: TcpListener,
    config: Arc<GatewayConfig>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!("Gateway server starting on {addr}");

    let app = create_router(config)?;

    info!("Gateway listening on {addr}");
    info!("Point OpenAI clients at: http://{addr}/v1");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    info!("Gateway server shut down");
    Ok(())
}

/// Static service description.
async fn service_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(ServiceInfo {
        message: "OpenAI API compatible service is running".to_string(),
        version: GATEWAY_VERSION.to_string(),
        models: state.config.available_models.clone(),
        documentation: "/docs".to_string(),
    })
}

async fn docs() -> impl IntoResponse {
    Json(DocsInfo::default())
}

/// List the configured models in OpenAI format.
async fn list_models(State(state): State<AppState>) -> impl IntoResponse {
    debug!("GET /v1/models");

    let created = chrono::Utc::now().timestamp();
    Json(ModelsResponse::from_ids(
        &state.config.available_models,
        created,
    ))
}

/// Forward a chat completion upstream.
async fn chat_completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    debug!("POST /v1/chat/completions");

    forward_chat_completion(&state.client, &state.config, &headers, body).await
}
