//! Test utilities for integration tests
use std::env;
use std::fs;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};

use axum::{Router, body::Body};

use fitpush::api::AppState;
use fitpush::api::app;
use fitpush::core::AppConfig;
use fitpush::core::db::async_db;
use fitpush::core::db::initialize_db;
use fitpush::notify::{Dispatcher, VapidKeys, VapidSigner};

/// Creates a test application router backed by a temporary database
/// and a freshly generated VAPID keypair.
pub async fn test_app() -> Router {
    // Create a unique directory for the test with a randomly
    // generated name using a timestamp to avoid collisions and
    // vulnerabilities
    let temp_dir = env::temp_dir();
    let ts = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_nanos()
        .to_string();
    let dir = temp_dir.join(ts);
    fs::create_dir_all(&dir).expect("Failed to create base directory");

    let db_path = dir.join("fitpush.db");
    let db_path_str = db_path.to_str().unwrap();

    let db = async_db(db_path_str)
        .await
        .expect("Failed to connect to async db");
    db.call(|conn| {
        initialize_db(conn).expect("Failed to migrate db");
        Ok(())
    })
    .await
    .unwrap();

    let keys = VapidKeys::generate();
    let app_config = AppConfig {
        db_path: db_path_str.to_string(),
        vapid_public_key: keys.public_key_base64url().to_string(),
        vapid_private_key: keys.private_key_base64url().to_string(),
        vapid_contact: String::from("mailto:ops@example.com"),
        push_timeout_secs: 5,
    };

    let signer = VapidSigner::new(
        &app_config.vapid_public_key,
        &app_config.vapid_private_key,
        &app_config.vapid_contact,
    )
    .expect("Failed to build VAPID signer");
    let dispatcher = Dispatcher::new(signer, Duration::from_secs(5))
        .expect("Failed to build push dispatcher");

    let app_state = AppState::new(db, app_config, Arc::new(dispatcher));
    app(Arc::new(RwLock::new(app_state)))
}

/// Collect a response body into a string for assertions.
pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read response body");
    String::from_utf8(bytes.to_vec()).expect("Response body is not utf-8")
}
