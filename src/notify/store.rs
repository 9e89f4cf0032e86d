//! Durable store of push subscriptions keyed by user.
//!
//! The delivery path only ever reads and deletes; registration writes
//! come in through the API. The trait is the seam the dispatcher
//! consumes so tests can substitute a failing or in-memory store.

use anyhow::Result;
use async_trait::async_trait;
use tokio_rusqlite::Connection;
use uuid::Uuid;

use super::models::PushSubscription;

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// All subscriptions registered to one user (one per device).
    async fn list(&self, user_id: &str) -> Result<Vec<PushSubscription>>;

    /// Every subscription in the store, for broadcast sends.
    async fn list_all(&self) -> Result<Vec<PushSubscription>>;

    /// Remove subscriptions by endpoint. Idempotent: endpoints that
    /// are already gone are skipped silently.
    async fn delete(&self, endpoints: &[String]) -> Result<()>;
}

pub struct SqliteSubscriptionStore {
    db: Connection,
}

impl SqliteSubscriptionStore {
    pub fn new(db: Connection) -> Self {
        Self { db }
    }

    /// Register or refresh a subscription. Keyed by endpoint: a
    /// browser re-registering the same endpoint under a new user
    /// replaces the old row rather than duplicating it.
    pub async fn upsert(
        &self,
        user_id: String,
        endpoint: String,
        p256dh: String,
        auth: String,
    ) -> Result<()> {
        let id = Uuid::new_v4().to_string();
        self.db
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    INSERT INTO push_subscription (id, user_id, endpoint, p256dh, auth)
                    VALUES (?, ?, ?, ?, ?)
                    ON CONFLICT(endpoint) DO UPDATE SET
                        user_id = excluded.user_id,
                        p256dh = excluded.p256dh,
                        auth = excluded.auth
                    "#,
                )?;
                stmt.execute(tokio_rusqlite::params![id, user_id, endpoint, p256dh, auth])?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for SqliteSubscriptionStore {
    async fn list(&self, user_id: &str) -> Result<Vec<PushSubscription>> {
        let user_id = user_id.to_string();
        let subscriptions = self
            .db
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, endpoint, p256dh, auth
                     FROM push_subscription WHERE user_id = ?",
                )?;
                let rows = stmt
                    .query_map([user_id], row_to_subscription)?
                    .filter_map(Result::ok)
                    .collect::<Vec<PushSubscription>>();
                Ok(rows)
            })
            .await?;
        Ok(subscriptions)
    }

    async fn list_all(&self) -> Result<Vec<PushSubscription>> {
        let subscriptions = self
            .db
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, endpoint, p256dh, auth FROM push_subscription",
                )?;
                let rows = stmt
                    .query_map([], row_to_subscription)?
                    .filter_map(Result::ok)
                    .collect::<Vec<PushSubscription>>();
                Ok(rows)
            })
            .await?;
        Ok(subscriptions)
    }

    async fn delete(&self, endpoints: &[String]) -> Result<()> {
        if endpoints.is_empty() {
            return Ok(());
        }
        let endpoints = endpoints.to_vec();
        self.db
            .call(move |conn| {
                let placeholders = vec!["?"; endpoints.len()].join(", ");
                let mut stmt = conn.prepare(&format!(
                    "DELETE FROM push_subscription WHERE endpoint IN ({placeholders})"
                ))?;
                stmt.execute(rusqlite::params_from_iter(endpoints.iter()))?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

fn row_to_subscription(row: &rusqlite::Row<'_>) -> rusqlite::Result<PushSubscription> {
    Ok(PushSubscription {
        id: row.get(0)?,
        user_id: row.get(1)?,
        endpoint: row.get(2)?,
        p256dh: row.get(3)?,
        auth: row.get(4)?,
    })
}

/// A store whose reads work but whose deletes error, for exercising
/// the best-effort prune path in tests.
#[cfg(test)]
pub struct PruneFailingStore(pub SqliteSubscriptionStore);

#[cfg(test)]
#[async_trait]
impl SubscriptionStore for PruneFailingStore {
    async fn list(&self, user_id: &str) -> Result<Vec<PushSubscription>> {
        self.0.list(user_id).await
    }

    async fn list_all(&self) -> Result<Vec<PushSubscription>> {
        self.0.list_all().await
    }

    async fn delete(&self, _endpoints: &[String]) -> Result<()> {
        Err(anyhow::anyhow!("delete failed"))
    }
}

/// A store that always errors, for exercising the hard-failure path
/// in tests.
#[cfg(test)]
pub struct UnreachableStore;

#[cfg(test)]
#[async_trait]
impl SubscriptionStore for UnreachableStore {
    async fn list(&self, _user_id: &str) -> Result<Vec<PushSubscription>> {
        Err(anyhow::anyhow!("subscription store is unreachable"))
    }

    async fn list_all(&self) -> Result<Vec<PushSubscription>> {
        Err(anyhow::anyhow!("subscription store is unreachable"))
    }

    async fn delete(&self, _endpoints: &[String]) -> Result<()> {
        Err(anyhow::anyhow!("subscription store is unreachable"))
    }
}
