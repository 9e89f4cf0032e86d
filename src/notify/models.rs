use serde::{Deserialize, Serialize};

/// A browser's registration with a push service. One user can have
/// many rows, one per device or browser profile.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PushSubscription {
    pub id: String,
    pub user_id: String,
    /// Absolute URL identifying both the push service and the
    /// specific client registration. Unique per registration.
    pub endpoint: String,
    /// Browser's P-256 ECDH public key (base64url). Stored so payload
    /// encryption can be added without a schema change.
    pub p256dh: String,
    /// Shared auth secret (base64url).
    pub auth: String,
}

/// App-specific data forwarded to the notification click handler in
/// service-worker.js. Anything the worker needs at click time goes
/// in here.
#[derive(Serialize, Clone)]
struct PushNotificationData {
    // Deep link opened when the notification is clicked
    url: String,
}

#[derive(Serialize, Clone)]
pub struct PushNotificationAction {
    action: String,
    title: String,
    icon: String,
}

/// The JSON body posted to the push service and rendered by the
/// service worker.
#[derive(Serialize, Clone)]
pub struct PushNotificationPayload {
    pub title: String,
    pub body: String,
    pub actions: Vec<PushNotificationAction>,
    // Notifications sharing a tag collapse into one until the user
    // interacts with it. Used to correlate with a stored notification
    // row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    data: PushNotificationData,
}

impl PushNotificationPayload {
    pub fn new(
        title: &str,
        body: &str,
        url: Option<&str>,
        actions: Option<Vec<PushNotificationAction>>,
        tag: Option<&str>,
    ) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            actions: actions.unwrap_or_default(),
            tag: tag.map(|s| s.to_string()),
            data: PushNotificationData {
                url: url.map(|u| u.to_string()).unwrap_or("/".to_string()),
            },
        }
    }
}
