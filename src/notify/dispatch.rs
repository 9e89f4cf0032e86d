//! Delivery of one notification to a set of push subscriptions.
//!
//! Each endpoint is signed and sent independently; one endpoint's
//! outcome never affects another's. Endpoints the push service
//! reports as gone (404/410) are pruned from the store after the
//! batch. There is no retry inside a delivery call: transient
//! failures wait for the next triggering event.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::models::{PushNotificationPayload, PushSubscription};
use super::store::SubscriptionStore;
use super::vapid::VapidSigner;

/// Aggregate outcome of one delivery pass.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
    /// Endpoints the push service will never accept again.
    pub pruned_endpoints: Vec<String>,
}

enum SendOutcome {
    Delivered,
    Gone(String),
    Failed,
}

/// Sends signed push messages. Holds the pooled HTTP client and the
/// VAPID signer; cheap to share behind an `Arc`.
pub struct Dispatcher {
    client: reqwest::Client,
    signer: Arc<VapidSigner>,
}

impl Dispatcher {
    /// A bounded per-request timeout is required so a slow push
    /// service cannot stall delivery to other endpoints.
    pub fn new(signer: VapidSigner, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build push service HTTP client")?;
        Ok(Self {
            client,
            signer: Arc::new(signer),
        })
    }

    pub fn signer(&self) -> &VapidSigner {
        &self.signer
    }

    /// Deliver `payload` to every target, fanning out one task per
    /// subscription. Never errors for individual endpoints; only a
    /// payload that cannot be serialized fails the whole call.
    pub async fn deliver(
        &self,
        targets: Vec<PushSubscription>,
        payload: &PushNotificationPayload,
    ) -> Result<DeliveryReport> {
        let mut report = DeliveryReport::default();
        if targets.is_empty() {
            return Ok(report);
        }

        let body = serde_json::to_string(payload).context("Failed to serialize push payload")?;

        let mut tasks = JoinSet::new();
        for subscription in targets {
            let client = self.client.clone();
            let signer = Arc::clone(&self.signer);
            let body = body.clone();
            tasks.spawn(async move { send_one(&client, &signer, &subscription, body).await });
        }

        while let Some(outcome) = tasks.join_next().await {
            match outcome {
                Ok(SendOutcome::Delivered) => report.sent += 1,
                Ok(SendOutcome::Gone(endpoint)) => {
                    report.failed += 1;
                    report.pruned_endpoints.push(endpoint);
                }
                Ok(SendOutcome::Failed) => report.failed += 1,
                Err(err) => {
                    warn!("Push delivery task panicked: {}", err);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

/// Sign and send to a single endpoint, classifying the response.
async fn send_one(
    client: &reqwest::Client,
    signer: &VapidSigner,
    subscription: &PushSubscription,
    body: String,
) -> SendOutcome {
    let headers = match signer.sign_for(&subscription.endpoint) {
        Ok(headers) => headers,
        Err(err) => {
            warn!(
                "Failed to sign for endpoint {}: {}",
                subscription.endpoint, err
            );
            return SendOutcome::Failed;
        }
    };

    let response = client
        .post(&subscription.endpoint)
        .header("Authorization", headers.authorization)
        .header("TTL", headers.ttl)
        .header("Content-Type", headers.content_type)
        .body(body)
        .send()
        .await;

    match response {
        Ok(resp) => match resp.status() {
            StatusCode::OK | StatusCode::CREATED => SendOutcome::Delivered,
            // The registration no longer exists; retrying is useless
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                debug!(
                    "Subscription gone ({}): {}",
                    resp.status(),
                    subscription.endpoint
                );
                SendOutcome::Gone(subscription.endpoint.clone())
            }
            status => {
                warn!(
                    "Push service returned {} for {}",
                    status, subscription.endpoint
                );
                SendOutcome::Failed
            }
        },
        Err(err) => {
            warn!(
                "Push request to {} failed: {}",
                subscription.endpoint, err
            );
            SendOutcome::Failed
        }
    }
}

/// Deliver one notification to all of a user's devices, then prune
/// whatever came back gone. Fails only if the store cannot list the
/// user's subscriptions.
pub async fn notify_user(
    store: &dyn SubscriptionStore,
    dispatcher: &Dispatcher,
    user_id: &str,
    payload: &PushNotificationPayload,
) -> Result<DeliveryReport> {
    let targets = store.list(user_id).await?;
    deliver_and_prune(store, dispatcher, targets, payload).await
}

/// Deliver one notification to every subscription in the store, e.g.
/// for app update announcements.
pub async fn broadcast(
    store: &dyn SubscriptionStore,
    dispatcher: &Dispatcher,
    payload: &PushNotificationPayload,
) -> Result<DeliveryReport> {
    let targets = store.list_all().await?;
    deliver_and_prune(store, dispatcher, targets, payload).await
}

async fn deliver_and_prune(
    store: &dyn SubscriptionStore,
    dispatcher: &Dispatcher,
    targets: Vec<PushSubscription>,
    payload: &PushNotificationPayload,
) -> Result<DeliveryReport> {
    let report = dispatcher.deliver(targets, payload).await?;

    // Best effort: a failed prune must not fail the delivery response
    if !report.pruned_endpoints.is_empty() {
        if let Err(err) = store.delete(&report.pruned_endpoints).await {
            warn!(
                "Failed to prune {} dead endpoints: {}",
                report.pruned_endpoints.len(),
                err
            );
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::initialize_db;
    use crate::notify::store::{PruneFailingStore, SqliteSubscriptionStore, UnreachableStore};
    use crate::notify::vapid::VapidKeys;

    fn test_dispatcher() -> Dispatcher {
        let keys = VapidKeys::generate();
        let signer = VapidSigner::new(
            keys.public_key_base64url(),
            keys.private_key_base64url(),
            "mailto:ops@example.com",
        )
        .unwrap();
        Dispatcher::new(signer, Duration::from_secs(5)).unwrap()
    }

    async fn test_store() -> SqliteSubscriptionStore {
        let db = tokio_rusqlite::Connection::open_in_memory()
            .await
            .expect("in-memory db");
        db.call(|conn| {
            initialize_db(conn).expect("initialize db");
            Ok(())
        })
        .await
        .unwrap();
        SqliteSubscriptionStore::new(db)
    }

    async fn subscribe(store: &SqliteSubscriptionStore, user_id: &str, endpoint: &str) {
        store
            .upsert(
                user_id.to_string(),
                endpoint.to_string(),
                "test-p256dh".to_string(),
                "test-auth".to_string(),
            )
            .await
            .unwrap();
    }

    fn payload() -> PushNotificationPayload {
        PushNotificationPayload::new(
            "Workout reminder",
            "Leg day starts in 30 minutes",
            Some("/workouts/today"),
            None,
            None,
        )
    }

    #[tokio::test]
    async fn it_counts_mixed_outcomes_and_prunes_only_gone_endpoints() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let _ok = server
            .mock("POST", "/push/ok")
            .match_header(
                "Authorization",
                mockito::Matcher::Regex("^vapid t=[A-Za-z0-9_.-]+, k=[A-Za-z0-9_-]+$".into()),
            )
            .match_header("TTL", "86400")
            .with_status(200)
            .create_async()
            .await;
        let _gone = server
            .mock("POST", "/push/gone")
            .with_status(410)
            .create_async()
            .await;
        let _flaky = server
            .mock("POST", "/push/flaky")
            .with_status(500)
            .create_async()
            .await;

        let store = test_store().await;
        subscribe(&store, "user-1", &format!("{url}/push/ok")).await;
        subscribe(&store, "user-1", &format!("{url}/push/gone")).await;
        subscribe(&store, "user-1", &format!("{url}/push/flaky")).await;

        let dispatcher = test_dispatcher();
        let report = notify_user(&store, &dispatcher, "user-1", &payload())
            .await
            .unwrap();

        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(report.pruned_endpoints, vec![format!("{url}/push/gone")]);

        // The 410 endpoint is removed; the 500 endpoint survives for
        // the next attempt
        let remaining = store.list("user-1").await.unwrap();
        let mut endpoints: Vec<String> =
            remaining.into_iter().map(|s| s.endpoint).collect();
        endpoints.sort();
        assert_eq!(
            endpoints,
            vec![format!("{url}/push/flaky"), format!("{url}/push/ok")]
        );
    }

    #[tokio::test]
    async fn it_treats_created_as_sent() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();
        let _created = server
            .mock("POST", "/push/created")
            .with_status(201)
            .create_async()
            .await;

        let store = test_store().await;
        subscribe(&store, "user-1", &format!("{url}/push/created")).await;

        let report = notify_user(&store, &test_dispatcher(), "user-1", &payload())
            .await
            .unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 0);
        assert!(report.pruned_endpoints.is_empty());
    }

    #[tokio::test]
    async fn it_sends_nothing_for_a_user_with_no_subscriptions() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();
        let mock = server
            .mock("POST", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let store = test_store().await;
        // Another user's subscription must not be targeted
        subscribe(&store, "user-2", &format!("{url}/push/other")).await;

        let report = notify_user(&store, &test_dispatcher(), "user-1", &payload())
            .await
            .unwrap();

        assert_eq!(report.sent, 0);
        assert_eq!(report.failed, 0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn it_fails_the_whole_call_when_the_store_is_unreachable() {
        let result =
            notify_user(&UnreachableStore, &test_dispatcher(), "user-1", &payload()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn it_broadcasts_to_every_user() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();
        let _ok = server
            .mock("POST", mockito::Matcher::Any)
            .with_status(200)
            .create_async()
            .await;

        let store = test_store().await;
        subscribe(&store, "user-1", &format!("{url}/push/a")).await;
        subscribe(&store, "user-2", &format!("{url}/push/b")).await;

        let report = broadcast(&store, &test_dispatcher(), &payload())
            .await
            .unwrap();
        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn it_returns_the_report_even_when_pruning_fails() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();
        let _gone = server
            .mock("POST", "/push/gone")
            .with_status(410)
            .create_async()
            .await;

        let store = PruneFailingStore(test_store().await);
        subscribe(&store.0, "user-1", &format!("{url}/push/gone")).await;

        // The delete error is logged, not surfaced: the caller still
        // gets the full report including the endpoint marked for
        // pruning
        let report = notify_user(&store, &test_dispatcher(), "user-1", &payload())
            .await
            .unwrap();
        assert_eq!(report.sent, 0);
        assert_eq!(report.failed, 1);
        assert_eq!(report.pruned_endpoints, vec![format!("{url}/push/gone")]);

        // The row survives since the prune never went through
        assert_eq!(store.0.list("user-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn it_deletes_endpoints_idempotently() {
        let store = test_store().await;
        subscribe(&store, "user-1", "https://push.example.com/reg/1").await;

        let endpoints = vec!["https://push.example.com/reg/1".to_string()];
        store.delete(&endpoints).await.unwrap();
        // Deleting again must not surface an error
        store.delete(&endpoints).await.unwrap();

        assert!(store.list("user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn it_counts_unreachable_push_services_as_failed() {
        // Nothing listens on this port; the send errors at the
        // network layer and must be classified, not propagated
        let store = test_store().await;
        subscribe(&store, "user-1", "http://127.0.0.1:9/push/unreachable").await;

        let report = notify_user(&store, &test_dispatcher(), "user-1", &payload())
            .await
            .unwrap();
        assert_eq!(report.sent, 0);
        assert_eq!(report.failed, 1);
        assert!(report.pruned_endpoints.is_empty());
    }
}
