//! Webhook receiver handler.
//!
//! Verifies the `X-Telegram-Bot-Api-Secret-Token` header against the
//! configured secret, decodes the update envelope, then acknowledges
//! immediately and processes the update in a spawned task -- the platform
//! retries undelivered updates, so the acknowledgment must not wait on
//! generation or sends.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use uuid::Uuid;

use relayguard_infra::telegram::types::Update;

use crate::http::error::AppError;
use crate::state::ServeState;

/// POST /webhook - Receive one Telegram update.
pub async fn receive_update(
    State(state): State<ServeState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let provided = headers
        .get("x-telegram-bot-api-secret-token")
        .and_then(|value| value.to_str().ok());

    if !secret_ok(state.webhook_secret.as_deref(), provided) {
        tracing::warn!("webhook rejected: bad secret token");
        return Err(AppError::Unauthorized("invalid secret token".to_string()));
    }

    let update: Update = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("malformed update: {e}")))?;

    let request_id = Uuid::now_v7();
    tracing::debug!(
        request_id = %request_id,
        update_id = update.update_id,
        "webhook update accepted"
    );

    let dispatcher = state.dispatcher.clone();
    tokio::spawn(async move {
        dispatcher.handle_update(update).await;
    });

    Ok(Json(serde_json::json!({ "ok": true })))
}

/// Header check: a configured secret must match exactly; with no secret
/// configured, every request passes.
fn secret_ok(expected: Option<&str>, provided: Option<&str>) -> bool {
    match expected {
        Some(expected) => provided == Some(expected),
        None => true,
    }
}
