//! Chat completion forwarding to the upstream provider.
//!
//! The inbound body is handled as an untyped, order-preserving JSON map.
//! Only the generation parameters the gateway has defaults for are touched,
//! and only when the caller left them out.

use axum::{
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use oaibridge_core::{GatewayConfig, GenerationDefaults};
use reqwest::Client;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::error::ForwardError;

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the caller's bearer token from the `Authorization` header.
///
/// A value without the `Bearer ` prefix is taken as the token itself.
/// Surrounding whitespace is trimmed, and a blank token counts as absent.
pub fn caller_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX).unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}

/// Pick the token sent upstream: the configured credential always wins.
pub fn resolve_bearer<'a>(configured: Option<&'a str>, caller: Option<&'a str>) -> Option<&'a str> {
    configured.or(caller)
}

/// Parse the inbound body into a JSON object.
pub fn parse_body(body: &[u8]) -> Result<Map<String, Value>, ForwardError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ForwardError::InvalidBody(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ForwardError::BodyNotObject),
    }
}

/// Fill generation parameters the caller omitted.
///
/// Fields already present, including explicit `null`s, are left alone.
pub fn apply_defaults(
    body: &mut Map<String, Value>,
    default_model: &str,
    defaults: &GenerationDefaults,
) {
    if !body.contains_key("model") {
        body.insert("model".to_string(), json!(default_model));
    }
    if !body.contains_key("max_tokens") && defaults.max_tokens > 0 {
        body.insert("max_tokens".to_string(), json!(defaults.max_tokens));
    }

    let sampling = [
        ("temperature", defaults.temperature),
        ("top_p", defaults.top_p),
        ("frequency_penalty", defaults.frequency_penalty),
        ("presence_penalty", defaults.presence_penalty),
    ];
    for (field, value) in sampling {
        if !body.contains_key(field) {
            body.insert(field.to_string(), json!(value));
        }
    }
}

/// Forward a chat completion request and relay the upstream reply.
///
/// Never fails: any error is turned into the fixed 500 envelope.
pub async fn forward_chat_completion(
    client: &Client,
    config: &GatewayConfig,
    headers: &HeaderMap,
    body: Bytes,
) -> Response {
    match relay(client, config, headers, &body).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn relay(
    client: &Client,
    config: &GatewayConfig,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, ForwardError> {
    let mut payload = parse_body(body)?;

    let bearer = resolve_bearer(config.credential(), caller_token(headers));
    apply_defaults(&mut payload, &config.default_model, &config.defaults);

    let upstream_url = config.chat_completions_url();
    let model = payload
        .get("model")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();
    info!(
        model,
        authorized = bearer.is_some(),
        "Forwarding chat completion"
    );
    debug!(upstream = %upstream_url, "Routing to upstream provider");

    let mut request = client
        .post(&upstream_url)
        .header(header::CONTENT_TYPE, "application/json")
        .json(&payload);
    if let Some(token) = bearer {
        request = request.header(header::AUTHORIZATION, format!("{BEARER_PREFIX}{token}"));
    }

    let response = request.send().await?;
    let status = response.status();
    let raw = response.bytes().await?;

    let reply: Value = serde_json::from_slice(&raw)
        .map_err(|e| ForwardError::InvalidUpstreamBody(e.to_string()))?;
    let reply_bytes =
        serde_json::to_vec(&reply).map_err(|e| ForwardError::InvalidUpstreamBody(e.to_string()))?;

    debug!(status = %status, bytes = reply_bytes.len(), "Relaying upstream response");

    Ok((
        StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
        [(header::CONTENT_TYPE, "application/json")],
        reply_bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_caller_token_strips_bearer_prefix() {
        let headers = headers_with_auth("Bearer sk-test");
        assert_eq!(caller_token(&headers), Some("sk-test"));
    }

    #[test]
    fn test_caller_token_without_prefix() {
        let headers = headers_with_auth("sk-raw");
        assert_eq!(caller_token(&headers), Some("sk-raw"));
    }

    #[test]
    fn test_caller_token_absent_or_empty() {
        assert_eq!(caller_token(&HeaderMap::new()), None);
        assert_eq!(caller_token(&headers_with_auth("Bearer ")), None);
    }

    #[test]
    fn test_caller_token_trims_whitespace() {
        let headers = headers_with_auth("Bearer  sk-padded");
        assert_eq!(caller_token(&headers), Some("sk-padded"));
    }

    #[test]
    fn test_configured_credential_wins() {
        assert_eq!(
            resolve_bearer(Some("sk-configured"), Some("sk-caller")),
            Some("sk-configured")
        );
        assert_eq!(resolve_bearer(None, Some("sk-caller")), Some("sk-caller"));
        assert_eq!(resolve_bearer(None, None), None);
    }

    #[test]
    fn test_parse_body_rejects_non_objects() {
        assert!(matches!(
            parse_body(b"{not json"),
            Err(ForwardError::InvalidBody(_))
        ));
        assert!(matches!(
            parse_body(b"[1, 2, 3]"),
            Err(ForwardError::BodyNotObject)
        ));
        assert!(parse_body(br#"{"messages": []}"#).is_ok());
    }

    #[test]
    fn test_apply_defaults_fills_missing_fields() {
        let mut body = parse_body(br#"{"messages": [{"role": "user", "content": "hi"}]}"#).unwrap();
        apply_defaults(&mut body, "gpt-4", &GenerationDefaults::default());

        assert_eq!(body["model"], json!("gpt-4"));
        assert_eq!(body["max_tokens"], json!(4096));
        assert_eq!(body["temperature"], json!(0.7));
        assert_eq!(body["top_p"], json!(1.0));
        assert_eq!(body["frequency_penalty"], json!(0.0));
        assert_eq!(body["presence_penalty"], json!(0.0));
        assert_eq!(body["messages"][0]["content"], json!("hi"));
    }

    #[test]
    fn test_apply_defaults_keeps_caller_values() {
        let mut body = parse_body(
            br#"{"model": "gpt-3.5-turbo", "temperature": 0.1, "max_tokens": 12, "top_p": null}"#,
        )
        .unwrap();
        apply_defaults(&mut body, "gpt-4", &GenerationDefaults::default());

        assert_eq!(body["model"], json!("gpt-3.5-turbo"));
        assert_eq!(body["temperature"], json!(0.1));
        assert_eq!(body["max_tokens"], json!(12));
        assert_eq!(body["top_p"], Value::Null);
    }

    #[test]
    fn test_apply_defaults_skips_non_positive_max_tokens() {
        let defaults = GenerationDefaults {
            max_tokens: 0,
            ..GenerationDefaults::default()
        };
        let mut body = Map::new();
        apply_defaults(&mut body, "gpt-4", &defaults);

        assert!(!body.contains_key("max_tokens"));
        assert!(body.contains_key("temperature"));
    }

    #[test]
    fn test_apply_defaults_preserves_key_order() {
        let mut body = parse_body(br#"{"stream": false, "messages": [], "user": "u-1"}"#).unwrap();
        apply_defaults(&mut body, "gpt-4", &GenerationDefaults::default());

        let keys: Vec<&str> = body.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "stream",
                "messages",
                "user",
                "model",
                "max_tokens",
                "temperature",
                "top_p",
                "frequency_penalty",
                "presence_penalty"
            ]
        );
    }
}
