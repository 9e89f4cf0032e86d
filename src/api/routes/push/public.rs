//! Public types for the push API

use serde::{Deserialize, Serialize};

/// The `keys` object of a browser `PushSubscription.toJSON()`.
#[derive(Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

#[derive(Deserialize)]
pub struct PushSubscriptionRequest {
    pub user_id: String,
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

#[derive(Deserialize)]
pub struct UnsubscribeRequest {
    pub endpoint: String,
}

#[derive(Deserialize)]
pub struct NotificationRequest {
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub url: Option<String>,
    /// Correlates with a stored notification row so the service
    /// worker can collapse repeats.
    pub notification_id: Option<String>,
}

#[derive(Deserialize)]
pub struct BroadcastRequest {
    pub title: String,
    pub message: String,
    pub url: Option<String>,
}

#[derive(Serialize)]
pub struct DeliveryResponse {
    pub sent: usize,
    pub failed: usize,
}

#[derive(Serialize)]
pub struct BroadcastResponse {
    pub sent: usize,
    pub failed: usize,
    /// Dead endpoints handed to the prune batch.
    pub cleaned: usize,
}

#[derive(Serialize)]
pub struct VapidKeyResponse {
    /// Base64url `applicationServerKey` browsers pass to
    /// `pushManager.subscribe`.
    pub key: String,
}
