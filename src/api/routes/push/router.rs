//! Router for the push API

use std::sync::{Arc, RwLock};

use axum::{Json, Router, extract::State};
use serde_json::Value;

use super::public;
use crate::api::state::AppState;
use crate::notify::{
    Dispatcher, PushNotificationPayload, SqliteSubscriptionStore, SubscriptionStore, broadcast,
    notify_user,
};

type SharedState = Arc<RwLock<AppState>>;

fn store_and_dispatcher(state: &SharedState) -> (SqliteSubscriptionStore, Arc<Dispatcher>) {
    let state = state.read().unwrap();
    (
        SqliteSubscriptionStore::new(state.db.clone()),
        Arc::clone(&state.dispatcher),
    )
}

/// The public key browsers need for `pushManager.subscribe`
async fn vapid_public_key(
    State(state): State<SharedState>,
) -> Json<public::VapidKeyResponse> {
    let key = {
        let state = state.read().unwrap();
        state.dispatcher.signer().public_key_base64url().to_string()
    };
    Json(public::VapidKeyResponse { key })
}

// Register a client for push notifications
async fn subscribe(
    State(state): State<SharedState>,
    Json(subscription): Json<public::PushSubscriptionRequest>,
) -> Result<Json<Value>, crate::api::public::ApiError> {
    let (store, _) = store_and_dispatcher(&state);
    store
        .upsert(
            subscription.user_id,
            subscription.endpoint,
            subscription.keys.p256dh,
            subscription.keys.auth,
        )
        .await?;

    Ok(Json(serde_json::json!({"success": true})))
}

// Remove a client registration, e.g. when the user turns
// notifications off in settings
async fn unsubscribe(
    State(state): State<SharedState>,
    Json(request): Json<public::UnsubscribeRequest>,
) -> Result<Json<Value>, crate::api::public::ApiError> {
    let (store, _) = store_and_dispatcher(&state);
    store.delete(&[request.endpoint]).await?;

    Ok(Json(serde_json::json!({"success": true})))
}

/// Send one notification to every device a user has registered.
/// Per-endpoint failures are informational and reported in the
/// counts; only an unreachable store fails the request.
async fn notify(
    State(state): State<SharedState>,
    Json(request): Json<public::NotificationRequest>,
) -> Result<Json<public::DeliveryResponse>, crate::api::public::ApiError> {
    let (store, dispatcher) = store_and_dispatcher(&state);

    let payload = PushNotificationPayload::new(
        &request.title,
        &request.message,
        request.url.as_deref(),
        None,
        request.notification_id.as_deref(),
    );
    let report = notify_user(&store, &dispatcher, &request.user_id, &payload).await?;

    Ok(Json(public::DeliveryResponse {
        sent: report.sent,
        failed: report.failed,
    }))
}

/// Send an announcement to every subscription in the store and report
/// how many dead endpoints were cleaned up along the way
async fn broadcast_notification(
    State(state): State<SharedState>,
    Json(request): Json<public::BroadcastRequest>,
) -> Result<Json<public::BroadcastResponse>, crate::api::public::ApiError> {
    let (store, dispatcher) = store_and_dispatcher(&state);

    let payload = PushNotificationPayload::new(
        &request.title,
        &request.message,
        request.url.as_deref(),
        None,
        Some("app_update"),
    );
    let report = broadcast(&store, &dispatcher, &payload).await?;

    Ok(Json(public::BroadcastResponse {
        sent: report.sent,
        failed: report.failed,
        cleaned: report.pruned_endpoints.len(),
    }))
}

/// Create the push router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/key", axum::routing::get(vapid_public_key))
        .route("/subscribe", axum::routing::post(subscribe))
        .route("/unsubscribe", axum::routing::post(unsubscribe))
        .route("/notify", axum::routing::post(notify))
        .route("/broadcast", axum::routing::post(broadcast_notification))
}
