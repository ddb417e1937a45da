//! Channel and subscription persistence.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::DeliveryChannel;
use crate::Result;

/// Repository for delivery channels and newsletter subscriptions.
#[derive(Clone)]
pub struct ChannelRepository {
    pool: SqlitePool,
}

impl ChannelRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS delivery_channel (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                external_id TEXT NOT NULL,
                endpoint TEXT NOT NULL,
                tenant_label TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS subscription (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                newsletter_id INTEGER NOT NULL,
                UNIQUE(user_id, newsletter_id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_subscription_newsletter
            ON subscription(newsletter_id)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Register a delivery channel for a user.
    ///
    /// Returns the new channel id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn add_channel(
        &self,
        user_id: i64,
        external_id: &str,
        endpoint: &str,
        tenant_label: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            r"
            INSERT INTO delivery_channel (user_id, external_id, endpoint, tenant_label)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(user_id)
        .bind(external_id)
        .bind(endpoint)
        .bind(tenant_label)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Subscribe a user to a newsletter. Re-subscribing is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn subscribe(&self, user_id: i64, newsletter_id: i64) -> Result<()> {
        sqlx::query(
            r"
            INSERT OR IGNORE INTO subscription (user_id, newsletter_id)
            VALUES (?, ?)
            ",
        )
        .bind(user_id)
        .bind(newsletter_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Every channel belonging to a subscriber of this newsletter, in
    /// listing (registration) order.
    ///
    /// Duplicate external ids are returned as-is; fan-out applies the
    /// first-wins deduplication.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn channels_for_newsletter(&self, newsletter_id: i64) -> Result<Vec<DeliveryChannel>> {
        let rows = sqlx::query(
            r"
            SELECT c.id, c.user_id, c.external_id, c.endpoint, c.tenant_label
            FROM delivery_channel c
            JOIN subscription s ON s.user_id = c.user_id
            WHERE s.newsletter_id = ?
            ORDER BY c.id
            ",
        )
        .bind(newsletter_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_channel).collect())
    }
}

/// Convert a database row to a `DeliveryChannel`.
fn row_to_channel(row: &sqlx::sqlite::SqliteRow) -> DeliveryChannel {
    DeliveryChannel {
        id: Some(row.get("id")),
        user_id: row.get("user_id"),
        external_id: row.get("external_id"),
        endpoint: row.get("endpoint"),
        tenant_label: row.get("tenant_label"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channels_for_newsletter() {
        let repo = ChannelRepository::in_memory().await.unwrap();

        repo.add_channel(1, "C1", "https://hooks.example/1", "acme")
            .await
            .unwrap();
        repo.add_channel(2, "C2", "https://hooks.example/2", "globex")
            .await
            .unwrap();
        repo.subscribe(1, 7).await.unwrap();
        repo.subscribe(2, 8).await.unwrap();

        let channels = repo.channels_for_newsletter(7).await.unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].external_id, "C1");
    }

    #[tokio::test]
    async fn test_listing_order_and_duplicates_kept() {
        let repo = ChannelRepository::in_memory().await.unwrap();

        // Two users, same physical destination, both subscribed.
        repo.add_channel(1, "C-shared", "https://hooks.example/a", "acme")
            .await
            .unwrap();
        repo.add_channel(2, "C-shared", "https://hooks.example/b", "acme")
            .await
            .unwrap();
        repo.subscribe(1, 7).await.unwrap();
        repo.subscribe(2, 7).await.unwrap();

        let channels = repo.channels_for_newsletter(7).await.unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].endpoint, "https://hooks.example/a");
        assert_eq!(channels[1].endpoint, "https://hooks.example/b");
    }

    #[tokio::test]
    async fn test_resubscribe_is_noop() {
        let repo = ChannelRepository::in_memory().await.unwrap();
        repo.add_channel(1, "C1", "https://hooks.example/1", "acme")
            .await
            .unwrap();
        repo.subscribe(1, 7).await.unwrap();
        repo.subscribe(1, 7).await.unwrap();

        let channels = repo.channels_for_newsletter(7).await.unwrap();
        assert_eq!(channels.len(), 1);
    }
}
