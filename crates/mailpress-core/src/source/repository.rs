//! Source registry persistence.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::{NewsletterSource, OperatingStatus, SourceLanguage};
use crate::{Error, Result};

/// Repository for registered newsletter sources and their known
/// sending addresses.
#[derive(Clone)]
pub struct SourceRepository {
    pool: SqlitePool,
}

impl SourceRepository {
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
            CREATE TABLE IF NOT EXISTS newsletter_source (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                language TEXT NOT NULL DEFAULT 'ko',
                operating_status INTEGER NOT NULL DEFAULT 1,
                last_received_at TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS source_email_address (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_id INTEGER NOT NULL REFERENCES newsletter_source(id),
                email_address TEXT NOT NULL,
                UNIQUE(source_id, email_address)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_source_email_address
            ON source_email_address(email_address)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Register a source with its known sending addresses.
    ///
    /// Returns the new source id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn register(
        &self,
        name: &str,
        language: SourceLanguage,
        addresses: &[String],
    ) -> Result<i64> {
        let result = sqlx::query(
            r"
            INSERT INTO newsletter_source (name, language, operating_status)
            VALUES (?, ?, 1)
            ",
        )
        .bind(name)
        .bind(language.as_str())
        .execute(&self.pool)
        .await?;

        let source_id = result.last_insert_rowid();
        for address in addresses {
            self.add_address(source_id, address).await?;
        }

        Ok(source_id)
    }

    /// Attach another known sending address to an existing source.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn add_address(&self, source_id: i64, address: &str) -> Result<()> {
        sqlx::query(
            r"
            INSERT OR IGNORE INTO source_email_address (source_id, email_address)
            VALUES (?, ?)
            ",
        )
        .bind(source_id)
        .bind(address)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load the full source snapshot used by resolution.
    ///
    /// Sources come back in registration order with their known
    /// addresses attached; resolution strategies iterate in this
    /// order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_sources(&self) -> Result<Vec<NewsletterSource>> {
        let rows = sqlx::query(
            r"
            SELECT id, name, language, operating_status, last_received_at
            FROM newsletter_source
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut sources = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut source = row_to_source(row);
            source.email_addresses = self.addresses_of(source.id).await?;
            sources.push(source);
        }

        Ok(sources)
    }

    /// Load a single source by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceNotFound`] if no such source exists, or
    /// a database error if the query fails.
    pub async fn load_by_id(&self, id: i64) -> Result<NewsletterSource> {
        let row = sqlx::query(
            r"
            SELECT id, name, language, operating_status, last_received_at
            FROM newsletter_source
            WHERE id = ?
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::SourceNotFound(id))?;

        let mut source = row_to_source(&row);
        source.email_addresses = self.addresses_of(id).await?;
        Ok(source)
    }

    /// Record that an issue from this source just arrived.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn touch_last_received(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r"
            UPDATE newsletter_source
            SET last_received_at = ?
            WHERE id = ?
            ",
        )
        .bind(at.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn addresses_of(&self, source_id: i64) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r"
            SELECT email_address
            FROM source_email_address
            WHERE source_id = ?
            ORDER BY id
            ",
        )
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get("email_address")).collect())
    }
}

/// Convert a database row to a `NewsletterSource` (addresses loaded
/// separately).
fn row_to_source(row: &sqlx::sqlite::SqliteRow) -> NewsletterSource {
    let last_received_at: Option<String> = row.get("last_received_at");
    NewsletterSource {
        id: row.get("id"),
        name: row.get("name"),
        language: SourceLanguage::parse(row.get("language")),
        email_addresses: Vec::new(),
        operating_status: OperatingStatus::from_flag(row.get("operating_status")),
        last_received_at: last_received_at
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
    }
}
