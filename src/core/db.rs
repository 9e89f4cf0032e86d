use anyhow::Result;
use tokio_rusqlite::Connection;

/// Open the async sqlite connection shared across the app.
pub async fn async_db(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path).await?;
    Ok(conn)
}

/// Create the schema for a fresh database.
pub fn initialize_db(conn: &rusqlite::Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS push_subscription (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            endpoint TEXT NOT NULL UNIQUE,
            p256dh TEXT NOT NULL,
            auth TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS push_subscription_user_id
            ON push_subscription(user_id);
        "#,
    )?;
    Ok(())
}

/// Bring an existing database up to the current schema. All schema
/// statements are idempotent so this is safe to run repeatedly.
pub fn migrate_db(conn: &rusqlite::Connection) -> Result<()> {
    initialize_db(conn)
}
