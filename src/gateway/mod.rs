//! HTTP surface of the relay.
//!
//! Serves the Instagram webhook (subscription handshake and signed event
//! intake), the Discord interactions endpoint used for replies, and a health
//! check. Intake decodes events and hands them to the [`CoalescingEngine`] one
//! at a time; nothing else in the HTTP layer touches relay state.
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, error, info, warn};

use crate::channels::base::UserDirectory;
use crate::channels::discord::DiscordChannel;
use crate::channels::discord::interactions::{Interaction, handle_interaction, verify_signature};
use crate::channels::instagram::InstagramClient;
use crate::channels::instagram::payload::WebhookPayload;
use crate::coalesce::{CoalescingEngine, TokioScheduler};
use crate::config::Config;
use crate::utils::http::{default_http_client, media_http_client};

type HmacSha256 = Hmac<Sha256>;

pub const HEALTH_PATH: &str = "/api/health";
pub const INTERACTIONS_PATH: &str = "/discord/interactions";

/// Max webhook payload size: 1 MB.
const WEBHOOK_MAX_BODY: usize = 1_048_576;

const HUB_SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
const ED25519_SIGNATURE_HEADER: &str = "X-Signature-Ed25519";
const ED25519_TIMESTAMP_HEADER: &str = "X-Signature-Timestamp";

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct GatewayState {
    engine: CoalescingEngine,
    instagram: Arc<InstagramClient>,
    verify_token: Arc<str>,
    app_secret: Arc<str>,
    public_key: Arc<str>,
    skip_signature_verification: bool,
}

impl GatewayState {
    pub fn new(engine: CoalescingEngine, instagram: Arc<InstagramClient>, config: &Config) -> Self {
        Self {
            engine,
            instagram,
            verify_token: config.instagram.verify_token.as_str().into(),
            app_secret: config.instagram.app_secret.as_str().into(),
            public_key: config.discord.public_key.as_str().into(),
            skip_signature_verification: config.discord.skip_signature_verification,
        }
    }
}

/// Build the router. `webhook_path` serves both the handshake (GET) and
/// event intake (POST).
pub fn build_router(state: GatewayState, webhook_path: &str) -> Router {
    Router::new()
        .route(webhook_path, get(verify_handler).post(intake_handler))
        .route(HEALTH_PATH, get(health_handler))
        .route(INTERACTIONS_PATH, post(interactions_handler))
        .layer(DefaultBodyLimit::max(WEBHOOK_MAX_BODY))
        .with_state(state)
}

/// Validate HMAC-SHA256 signature against a payload.
pub fn validate_webhook_signature(secret: &str, signature: &str, body: &[u8]) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let expected = hex::encode(mac.finalize().into_bytes());

    // Meta sends "sha256=<hex>"; bare hex is accepted too
    let sig = signature.strip_prefix("sha256=").unwrap_or(signature);
    expected.as_bytes().ct_eq(sig.as_bytes()).into()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// GET {webhook}: Meta subscription handshake.
async fn verify_handler(
    State(state): State<GatewayState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let token = params
        .get("hub.verify_token")
        .map(String::as_str)
        .unwrap_or_default();
    let matches: bool = token.as_bytes().ct_eq(state.verify_token.as_bytes()).into();
    if state.verify_token.is_empty() || !matches {
        warn!("webhook verification failed");
        return (StatusCode::FORBIDDEN, "Verification failed").into_response();
    }
    info!("webhook subscription verified");
    params
        .get("hub.challenge")
        .cloned()
        .unwrap_or_default()
        .into_response()
}

/// POST {webhook}: Instagram messaging events.
async fn intake_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !state.app_secret.is_empty() {
        let signature = header_str(&headers, HUB_SIGNATURE_HEADER);
        if signature.is_empty() {
            warn!("webhook: missing signature header");
            return StatusCode::FORBIDDEN.into_response();
        }
        if !validate_webhook_signature(&state.app_secret, signature, &body) {
            warn!("webhook: invalid signature");
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    let events = match WebhookPayload::parse(&body).and_then(|p| p.events()) {
        Ok(events) => events,
        Err(e) if e.is_discardable() => {
            debug!("webhook: discarding payload: {}", e);
            return Json(json!({ "status": "ignored" })).into_response();
        }
        Err(e) => {
            error!("webhook: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    debug!("webhook: {} event(s), payload_len={}", events.len(), body.len());
    let mut outcomes = Vec::with_capacity(events.len());
    for event in events {
        outcomes.push(state.engine.handle_inbound_event(event).await);
    }
    Json(json!({ "status": "ok", "outcomes": outcomes })).into_response()
}

/// GET /api/health: health check endpoint.
async fn health_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "pending": state.engine.pending(),
    }))
}

/// POST /discord/interactions: context command and modal submissions.
async fn interactions_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !state.skip_signature_verification {
        let signature = header_str(&headers, ED25519_SIGNATURE_HEADER);
        let timestamp = header_str(&headers, ED25519_TIMESTAMP_HEADER);
        if !verify_signature(&state.public_key, signature, timestamp, &body) {
            warn!("interactions: invalid request signature");
            return (StatusCode::UNAUTHORIZED, "invalid request signature").into_response();
        }
    }

    let interaction: Interaction = match serde_json::from_slice(&body) {
        Ok(i) => i,
        Err(e) => {
            debug!("interactions: undecodable body: {}", e);
            return (StatusCode::BAD_REQUEST, "invalid interaction").into_response();
        }
    };
    Json(handle_interaction(&interaction, &state.instagram).await).into_response()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Wire the clients and engine from `config` and serve until Ctrl-C.
/// Media still pending at shutdown is sent without a caption.
pub async fn start(config: &Config) -> Result<()> {
    let api_client = default_http_client();
    let instagram = Arc::new(InstagramClient::new(&config.instagram, api_client.clone()));
    let discord = Arc::new(DiscordChannel::new(
        &config.discord,
        &config.relay,
        api_client,
        media_http_client(),
    )?);
    let directory: Arc<dyn UserDirectory> = instagram.clone();

    let engine = CoalescingEngine::new(
        directory,
        discord,
        Arc::new(TokioScheduler),
        config.instagram.bot_user_id.as_str(),
    )
    .with_window(config.relay.coalesce_window())
    .with_routes(config.discord.user_ids.clone());

    let state = GatewayState::new(engine.clone(), instagram, config);
    let app = build_router(state, &config.gateway.webhook_path);

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(
        "relay listening on {} (webhook {}, window {:?})",
        addr,
        config.gateway.webhook_path,
        config.relay.coalesce_window()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    engine.flush_pending().await;
    Ok(())
}
