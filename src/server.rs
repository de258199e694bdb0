use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{info, warn};

use crate::bot::update::WebhookUpdate;
use crate::bot::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/webhook", get(webhook_probe).post(webhook))
        .route("/set-webhook", get(set_webhook))
        .route("/delete-webhook", get(delete_webhook))
        .with_state(state)
}

async fn liveness() -> &'static str {
    "up"
}

async fn webhook_probe() -> &'static str {
    "ok"
}

/// The webhook always acknowledges with "ok": a non-2xx answer would make
/// the gateway re-deliver the update forever. Internal failures become chat
/// messages inside the router, never HTTP errors.
async fn webhook(
    State(state): State<Arc<AppState>>,
    body: Result<Json<WebhookUpdate>, JsonRejection>,
) -> &'static str {
    let update = match body {
        Ok(Json(update)) => update,
        Err(rejection) => {
            warn!("undecodable webhook body: {rejection}");
            return "ok";
        }
    };

    let update_id = update.update_id;
    match update.into_inbound() {
        Some(inbound) => state.router.handle(inbound).await,
        None => info!(update_id, "webhook update without a message, acknowledged"),
    }

    "ok"
}

#[derive(Debug, Deserialize)]
struct AdminQuery {
    secret: Option<String>,
}

fn authorized(state: &AppState, query: &AdminQuery) -> bool {
    query.secret.as_deref() == Some(state.config.webhook_secret.as_str())
}

async fn set_webhook(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminQuery>,
) -> (StatusCode, String) {
    if !authorized(&state, &query) {
        return (StatusCode::FORBIDDEN, "forbidden".to_string());
    }

    let base = state.config.public_url.trim_end_matches('/');
    if base.is_empty() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "PUBLIC_URL is not configured".to_string(),
        );
    }

    let url = format!("{base}/webhook");
    match state.gateway.register_webhook(&url).await {
        Ok(()) => {
            info!("webhook registered at {url}");
            (StatusCode::OK, format!("webhook set to {url}"))
        }
        Err(err) => {
            warn!("setWebhook failed: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "setWebhook failed".to_string(),
            )
        }
    }
}

async fn delete_webhook(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminQuery>,
) -> (StatusCode, String) {
    if !authorized(&state, &query) {
        return (StatusCode::FORBIDDEN, "forbidden".to_string());
    }

    match state.gateway.unregister_webhook().await {
        Ok(()) => {
            info!("webhook deregistered");
            (StatusCode::OK, "webhook deleted".to_string())
        }
        Err(err) => {
            warn!("deleteWebhook failed: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "deleteWebhook failed".to_string(),
            )
        }
    }
}
