use std::time::Duration;

use anyhow::Result;

use crate::core::AppConfig;
use crate::core::db::async_db;
use crate::notify::{
    Dispatcher, PushNotificationPayload, SqliteSubscriptionStore, VapidSigner, broadcast,
    notify_user,
};

/// One-off send for operators: deliver a notification to one user or
/// to everyone, printing the aggregate counts.
pub async fn run(
    user_id: Option<String>,
    to_everyone: bool,
    title: String,
    message: String,
    url: Option<String>,
) -> Result<()> {
    let config = AppConfig::default();
    let db = async_db(&config.db_path).await?;
    let store = SqliteSubscriptionStore::new(db);

    let signer = VapidSigner::new(
        &config.vapid_public_key,
        &config.vapid_private_key,
        &config.vapid_contact,
    )?;
    let dispatcher = Dispatcher::new(signer, Duration::from_secs(config.push_timeout_secs))?;

    let payload = PushNotificationPayload::new(&title, &message, url.as_deref(), None, None);

    let report = if to_everyone {
        broadcast(&store, &dispatcher, &payload).await?
    } else if let Some(user_id) = user_id {
        notify_user(&store, &dispatcher, &user_id, &payload).await?
    } else {
        anyhow::bail!("Pass --user-id <id> or --broadcast");
    };

    println!(
        "Sent {} notification(s), {} failed, cleaned {} dead endpoint(s)",
        report.sent,
        report.failed,
        report.pruned_endpoints.len()
    );

    Ok(())
}
