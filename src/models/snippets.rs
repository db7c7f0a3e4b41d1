use async_trait::async_trait;
use sqlx::SqlitePool;
use time::{Duration as TimeDuration, OffsetDateTime};

use super::{now_unix, ModelError, LATEST_SNIPPETS_LIMIT};

/// A stored piece of text, visible until `expires_at` (unix seconds, exclusive).
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Snippet {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: i64,
    pub expires_at: i64,
}

impl Snippet {
    pub fn is_visible_at(&self, now: i64) -> bool {
        self.expires_at > now
    }

    pub fn created(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp(self.created_at).ok()
    }

    pub fn expires(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp(self.expires_at).ok()
    }
}

/// Snippet persistence as seen by the handlers.
#[async_trait]
pub trait SnippetStore: Send + Sync {
    /// Persist a snippet that expires `expires_in_days` after now and return its id.
    async fn insert(
        &self,
        title: &str,
        content: &str,
        expires_in_days: i64,
    ) -> Result<i64, ModelError>;

    /// Fetch an unexpired snippet. Expired and absent snippets both yield `NotFound`.
    async fn get(&self, id: i64) -> Result<Snippet, ModelError>;

    /// The most recently created unexpired snippets, newest first.
    async fn latest(&self) -> Result<Vec<Snippet>, ModelError>;

    /// Delete snippets whose expiry is at or before `now`. Returns the number removed.
    async fn purge_expired(&self, now: i64) -> Result<u64, ModelError>;
}

/// Compute the `(created_at, expires_at)` pair for a snippet inserted now.
pub(crate) fn snippet_lifetime(expires_in_days: i64) -> (i64, i64) {
    let created = OffsetDateTime::now_utc();
    let expires = created
        .checked_add(TimeDuration::days(expires_in_days))
        .unwrap_or(created);
    (created.unix_timestamp(), expires.unix_timestamp())
}

pub struct SqliteSnippetStore {
    pool: SqlitePool,
}

impl SqliteSnippetStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnippetStore for SqliteSnippetStore {
    async fn insert(
        &self,
        title: &str,
        content: &str,
        expires_in_days: i64,
    ) -> Result<i64, ModelError> {
        let (created_at, expires_at) = snippet_lifetime(expires_in_days);

        let result = sqlx::query(
            r#"
            INSERT INTO snippets (title, content, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(created_at)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get(&self, id: i64) -> Result<Snippet, ModelError> {
        let record = sqlx::query_as::<_, Snippet>(
            r#"
            SELECT id, title, content, created_at, expires_at
            FROM snippets
            WHERE expires_at > ? AND id = ?
            "#,
        )
        .bind(now_unix())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        record.ok_or(ModelError::NotFound)
    }

    async fn latest(&self) -> Result<Vec<Snippet>, ModelError> {
        let rows = sqlx::query_as::<_, Snippet>(
            r#"
            SELECT id, title, content, created_at, expires_at
            FROM snippets
            WHERE expires_at > ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(now_unix())
        .bind(LATEST_SNIPPETS_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn purge_expired(&self, now: i64) -> Result<u64, ModelError> {
        let result = sqlx::query("DELETE FROM snippets WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;

    async fn insert_raw(pool: &SqlitePool, title: &str, created_at: i64, expires_at: i64) -> i64 {
        sqlx::query(
            "INSERT INTO snippets (title, content, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(title)
        .bind(format!("content of {title}"))
        .bind(created_at)
        .bind(expires_at)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    #[tokio::test]
    async fn insert_then_get() {
        let store = SqliteSnippetStore::new(test_pool().await);
        let id = store
            .insert("An old silent pond", "An old silent pond...", 7)
            .await
            .unwrap();

        let snippet = store.get(id).await.unwrap();
        assert_eq!(snippet.title, "An old silent pond");
        assert_eq!(snippet.content, "An old silent pond...");
        assert_eq!(snippet.expires_at - snippet.created_at, 7 * 24 * 60 * 60);
    }

    #[tokio::test]
    async fn missing_snippet_is_not_found() {
        let store = SqliteSnippetStore::new(test_pool().await);
        assert!(matches!(store.get(42).await, Err(ModelError::NotFound)));
    }

    #[tokio::test]
    async fn snippet_expiring_now_is_not_visible() {
        let pool = test_pool().await;
        let now = now_unix();
        let expired = insert_raw(&pool, "boundary", now - 10, now).await;
        let stale = insert_raw(&pool, "stale", now - 100, now - 50).await;
        let store = SqliteSnippetStore::new(pool);

        assert!(matches!(store.get(expired).await, Err(ModelError::NotFound)));
        assert!(matches!(store.get(stale).await, Err(ModelError::NotFound)));
    }

    #[tokio::test]
    async fn latest_orders_newest_first_and_caps_results() {
        let pool = test_pool().await;
        let now = now_unix();
        for offset in 0..12 {
            insert_raw(&pool, &format!("s{offset}"), now - 1000 + offset, now + 3600).await;
        }
        insert_raw(&pool, "expired", now, now - 1).await;
        let store = SqliteSnippetStore::new(pool);

        let latest = store.latest().await.unwrap();
        assert_eq!(latest.len(), LATEST_SNIPPETS_LIMIT as usize);
        assert_eq!(latest[0].title, "s11");
        assert_eq!(latest[9].title, "s2");
        assert!(latest.iter().all(|s| s.title != "expired"));
    }

    #[tokio::test]
    async fn latest_is_empty_without_snippets() {
        let store = SqliteSnippetStore::new(test_pool().await);
        assert!(store.latest().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn purge_removes_only_expired_rows() {
        let pool = test_pool().await;
        let now = now_unix();
        insert_raw(&pool, "old", now - 100, now - 1).await;
        let live = insert_raw(&pool, "live", now - 100, now + 100).await;
        let store = SqliteSnippetStore::new(pool);

        assert_eq!(store.purge_expired(now).await.unwrap(), 1);
        assert!(store.get(live).await.is_ok());
    }
}
