use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub db_path: String,
    /// Base64url uncompressed P-256 public key, shared with browsers
    /// as the `applicationServerKey`.
    pub vapid_public_key: String,
    /// Base64url raw 32-byte P-256 private key scalar.
    pub vapid_private_key: String,
    /// Operator contact for the VAPID `sub` claim, e.g.
    /// `mailto:support@example.com`.
    pub vapid_contact: String,
    /// Per-request timeout for outbound push service calls.
    pub push_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let storage_path = env::var("FITPUSH_STORAGE_PATH").unwrap_or("./".to_string());
        let db_path = format!("{}/fitpush.db", storage_path);
        let vapid_public_key = env::var("FITPUSH_VAPID_PUBLIC_KEY")
            .expect("Missing env var FITPUSH_VAPID_PUBLIC_KEY");
        let vapid_private_key = env::var("FITPUSH_VAPID_PRIVATE_KEY")
            .expect("Missing env var FITPUSH_VAPID_PRIVATE_KEY");
        let vapid_contact = env::var("FITPUSH_VAPID_CONTACT")
            .unwrap_or_else(|_| "mailto:support@fitpush.app".to_string());
        let push_timeout_secs = env::var("FITPUSH_PUSH_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        Self {
            db_path,
            vapid_public_key,
            vapid_private_key,
            vapid_contact,
            push_timeout_secs,
        }
    }
}
