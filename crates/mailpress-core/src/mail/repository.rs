//! Mail record persistence.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::{MailRecord, Summary};
use crate::{Error, Result};

/// Repository for persisted mail records.
///
/// The unique index on `content_key` is what enforces at-most-once
/// persistence; the pipeline carries no locking of its own.
#[derive(Clone)]
pub struct MailRepository {
    pool: SqlitePool,
}

impl MailRepository {
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
            CREATE TABLE IF NOT EXISTS mail_record (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content_key TEXT NOT NULL UNIQUE,
                subject TEXT,
                summary TEXT NOT NULL,
                translated_body TEXT,
                newsletter_id INTEGER NOT NULL,
                received_at TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_mail_record_newsletter
            ON mail_record(newsletter_id, received_at DESC)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a fully formed record.
    ///
    /// Returns the new record id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateRecord`] when a record with the same
    /// content key already exists (the benign re-ingest case), or a
    /// database error for anything else.
    pub async fn insert(&self, record: &MailRecord) -> Result<i64> {
        let summary_json = serde_json::to_string(&record.summary)?;

        let result = sqlx::query(
            r"
            INSERT INTO mail_record
                (content_key, subject, summary, translated_body, newsletter_id, received_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&record.content_key)
        .bind(&record.subject)
        .bind(summary_json)
        .bind(&record.translated_body)
        .bind(record.newsletter_id)
        .bind(record.received_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.last_insert_rowid()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(Error::DuplicateRecord(record.content_key.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a record by its content key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or a stored field
    /// (summary JSON, timestamp) is corrupt.
    pub async fn find_by_content_key(&self, content_key: &str) -> Result<Option<MailRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, content_key, subject, summary, translated_body,
                   newsletter_id, received_at
            FROM mail_record
            WHERE content_key = ?
            ",
        )
        .bind(content_key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_record(&r)).transpose()
    }

    /// Replace only the summary of an existing record.
    ///
    /// This is the re-summarize operation; nothing else on the record
    /// is ever updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn update_summary(&self, id: i64, summary: &Summary) -> Result<()> {
        let summary_json = serde_json::to_string(summary)?;

        sqlx::query(
            r"
            UPDATE mail_record
            SET summary = ?
            WHERE id = ?
            ",
        )
        .bind(summary_json)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recently received records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or a stored field
    /// is corrupt.
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<MailRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, content_key, subject, summary, translated_body,
                   newsletter_id, received_at
            FROM mail_record
            ORDER BY received_at DESC
            LIMIT ?
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }
}

/// Convert a database row to a `MailRecord`.
fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<MailRecord> {
    let summary_json: String = row.get("summary");
    let received_at: String = row.get("received_at");

    Ok(MailRecord {
        id: Some(row.get("id")),
        content_key: row.get("content_key"),
        subject: row.get("subject"),
        summary: serde_json::from_str(&summary_json)?,
        translated_body: row.get("translated_body"),
        newsletter_id: row.get("newsletter_id"),
        received_at: DateTime::parse_from_rfc3339(&received_at)?.with_timezone(&Utc),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn record(content_key: &str) -> MailRecord {
        let mut entries = IndexMap::new();
        entries.insert("첫 소식".to_string(), "첫 번째 기사 요약입니다.".to_string());
        entries.insert("둘째 소식".to_string(), "두 번째 기사 요약입니다.".to_string());

        MailRecord {
            id: None,
            content_key: content_key.to_string(),
            subject: Some("This week".to_string()),
            summary: Summary::new(entries),
            translated_body: None,
            newsletter_id: 1,
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_roundtrip() {
        let repo = MailRepository::in_memory().await.unwrap();
        let original = record("inbox/msg-1");

        let id = repo.insert(&original).await.unwrap();
        let found = repo
            .find_by_content_key("inbox/msg-1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.id, Some(id));
        assert_eq!(found.subject.as_deref(), Some("This week"));
        assert_eq!(found.newsletter_id, 1);

        // Summary ordering is significant and must survive storage.
        let keys: Vec<_> = found.summary.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["첫 소식", "둘째 소식"]);
        assert_eq!(found.summary, original.summary);
    }

    #[tokio::test]
    async fn test_duplicate_content_key_rejected() {
        let repo = MailRepository::in_memory().await.unwrap();
        repo.insert(&record("inbox/dup")).await.unwrap();

        let err = repo.insert(&record("inbox/dup")).await.unwrap_err();
        assert!(err.is_duplicate());
    }

    #[tokio::test]
    async fn test_update_summary_only() {
        let repo = MailRepository::in_memory().await.unwrap();
        let id = repo.insert(&record("inbox/msg-2")).await.unwrap();

        repo.update_summary(id, &Summary::sentinel()).await.unwrap();

        let found = repo
            .find_by_content_key("inbox/msg-2")
            .await
            .unwrap()
            .unwrap();
        assert!(found.summary.is_sentinel());
        assert_eq!(found.subject.as_deref(), Some("This week"));
    }

    #[tokio::test]
    async fn test_corrupt_timestamp_surfaces_error() {
        let repo = MailRepository::in_memory().await.unwrap();
        repo.insert(&record("inbox/bad-ts")).await.unwrap();

        sqlx::query("UPDATE mail_record SET received_at = 'not-a-timestamp'")
            .execute(&repo.pool)
            .await
            .unwrap();

        // Corrupt data must not be silently replaced on read.
        let err = repo.find_by_content_key("inbox/bad-ts").await.unwrap_err();
        assert!(matches!(err, Error::Timestamp(_)));
    }

    #[tokio::test]
    async fn test_find_missing_returns_none() {
        let repo = MailRepository::in_memory().await.unwrap();
        assert!(
            repo.find_by_content_key("inbox/nope")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_list_recent_newest_first() {
        let repo = MailRepository::in_memory().await.unwrap();

        let mut older = record("inbox/old");
        older.received_at = Utc::now() - chrono::Duration::hours(2);
        let newer = record("inbox/new");

        repo.insert(&older).await.unwrap();
        repo.insert(&newer).await.unwrap();

        let recent = repo.list_recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content_key, "inbox/new");
    }
}
