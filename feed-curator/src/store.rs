use crate::article::RawArticle;
use crate::post::{Post, PostRecord, PostStatus};
use crate::traits::{ArticleCache, CacheStats, PostStore};
use crate::types::{CuratorError, Domain, Result};
use crate::utils::text::extract_hashtags;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

/// SQLite-backed review queue and article cache
#[derive(Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database and ensures the schema exists.
    /// In-memory databases are held on a single connection so every query sees
    /// the same data.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let db = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self { db };
        store.setup_schema().await?;
        info!("Connected to {}", database_url);
        Ok(store)
    }

    async fn setup_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content TEXT NOT NULL,
                domain TEXT NOT NULL,
                hashtags TEXT NOT NULL,
                sources TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                generated_at TEXT NOT NULL,
                published_at TEXT
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS article_cache (
                url TEXT PRIMARY KEY,
                source_name TEXT NOT NULL,
                payload TEXT NOT NULL,
                cached_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_article_cache_expires ON article_cache (expires_at)")
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn list_by_status(&self, status: PostStatus) -> Result<Vec<PostRecord>> {
        let rows = sqlx::query("SELECT * FROM posts WHERE status = ? ORDER BY generated_at DESC, id DESC")
            .bind(status.as_str())
            .fetch_all(&self.db)
            .await?;
        rows.iter().map(post_from_row).collect()
    }

    /// Moves `id` from `from` to `to`, failing when the post is in any other state
    async fn transition(&self, id: i64, action: &'static str, from: &[PostStatus], to: PostStatus) -> Result<()> {
        let current = self.get_post(id).await?;
        if !from.contains(&current.status) {
            return Err(CuratorError::InvalidTransition {
                id,
                action,
                status: current.status.as_str(),
            });
        }

        let published_at = (to == PostStatus::Published).then(Utc::now);
        let result =
            sqlx::query("UPDATE posts SET status = ?, published_at = COALESCE(?, published_at) WHERE id = ? AND status = ?")
                .bind(to.as_str())
                .bind(published_at)
                .bind(id)
                .bind(current.status.as_str())
                .execute(&self.db)
                .await?;
        if result.rows_affected() == 0 {
            return Err(self.refused(id, action).await);
        }

        info!("Post {}: {} -> {}", id, current.status, to);
        Ok(())
    }

    /// Error for a write whose status guard matched no row, because another
    /// writer moved or removed the post after it was read
    async fn refused(&self, id: i64, action: &'static str) -> CuratorError {
        match self.get_post(id).await {
            Ok(current) => CuratorError::InvalidTransition {
                id,
                action,
                status: current.status.as_str(),
            },
            Err(e) => e,
        }
    }
}

fn post_from_row(row: &SqliteRow) -> Result<PostRecord> {
    let domain: String = row.try_get("domain")?;
    let status: String = row.try_get("status")?;
    let hashtags: String = row.try_get("hashtags")?;
    let sources: String = row.try_get("sources")?;

    Ok(PostRecord {
        id: row.try_get("id")?,
        content: row.try_get("content")?,
        domain: Domain::from_str(&domain)?,
        hashtags: serde_json::from_str(&hashtags)?,
        sources: serde_json::from_str(&sources)?,
        status: PostStatus::from_str(&status)?,
        generated_at: row.try_get::<DateTime<Utc>, _>("generated_at")?,
        published_at: row.try_get::<Option<DateTime<Utc>>, _>("published_at")?,
    })
}

#[async_trait]
impl PostStore for SqliteStore {
    async fn save_post(&self, post: &Post) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO posts (content, domain, hashtags, sources, status, generated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.content)
        .bind(post.domain.as_str())
        .bind(serde_json::to_string(&post.hashtags)?)
        .bind(serde_json::to_string(post.sources())?)
        .bind(PostStatus::Pending.as_str())
        .bind(post.generated_at)
        .execute(&self.db)
        .await?;

        let id = result.last_insert_rowid();
        info!("Saved {} post {} with {} sources", post.domain, id, post.sources().len());
        Ok(id)
    }

    async fn get_post(&self, id: i64) -> Result<PostRecord> {
        let row = sqlx::query("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => post_from_row(&row),
            None => Err(CuratorError::PostNotFound { id }),
        }
    }

    async fn list_pending(&self) -> Result<Vec<PostRecord>> {
        self.list_by_status(PostStatus::Pending).await
    }

    async fn list_approved(&self) -> Result<Vec<PostRecord>> {
        self.list_by_status(PostStatus::Approved).await
    }

    async fn approve(&self, id: i64) -> Result<()> {
        self.transition(id, "approve", &[PostStatus::Pending], PostStatus::Approved).await
    }

    async fn mark_published(&self, id: i64) -> Result<()> {
        self.transition(id, "publish", &[PostStatus::Approved], PostStatus::Published).await
    }

    async fn update_content(&self, id: i64, content: &str) -> Result<()> {
        let current = self.get_post(id).await?;
        if current.status == PostStatus::Published {
            return Err(CuratorError::InvalidTransition {
                id,
                action: "edit",
                status: current.status.as_str(),
            });
        }
        if content.trim().is_empty() {
            return Err(CuratorError::General("post content cannot be empty".to_string()));
        }

        let result = sqlx::query("UPDATE posts SET content = ?, hashtags = ? WHERE id = ? AND status != ?")
            .bind(content)
            .bind(serde_json::to_string(&extract_hashtags(content))?)
            .bind(id)
            .bind(PostStatus::Published.as_str())
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(self.refused(id, "edit").await);
        }

        debug!("Updated content of post {}", id);
        Ok(())
    }

    async fn delete_post(&self, id: i64) -> Result<()> {
        let current = self.get_post(id).await?;
        if current.status != PostStatus::Pending {
            return Err(CuratorError::InvalidTransition {
                id,
                action: "delete",
                status: current.status.as_str(),
            });
        }

        let result = sqlx::query("DELETE FROM posts WHERE id = ? AND status = ?")
            .bind(id)
            .bind(PostStatus::Pending.as_str())
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(self.refused(id, "delete").await);
        }
        info!("Deleted post {}", id);
        Ok(())
    }
}

#[async_trait]
impl ArticleCache for SqliteStore {
    async fn get_cached_articles(&self, source_filter: Option<&str>) -> Result<Vec<RawArticle>> {
        let now = Utc::now().timestamp();
        let rows = match source_filter {
            Some(filter) => {
                sqlx::query("SELECT payload FROM article_cache WHERE expires_at > ? AND source_name LIKE ? ORDER BY cached_at DESC, url")
                    .bind(now)
                    .bind(format!("%{}%", filter))
                    .fetch_all(&self.db)
                    .await?
            }
            None => {
                sqlx::query("SELECT payload FROM article_cache WHERE expires_at > ? ORDER BY cached_at DESC, url")
                    .bind(now)
                    .fetch_all(&self.db)
                    .await?
            }
        };

        let mut articles = Vec::with_capacity(rows.len());
        for row in rows {
            let payload: String = row.try_get("payload")?;
            articles.push(serde_json::from_str(&payload)?);
        }
        debug!("Cache returned {} articles", articles.len());
        Ok(articles)
    }

    async fn save_articles_to_cache(&self, articles: &[RawArticle], ttl_hours: i64) -> Result<usize> {
        if ttl_hours <= 0 {
            return Err(CuratorError::Config(format!("cache ttl must be positive, got {} hours", ttl_hours)));
        }

        let now = Utc::now();
        let expires_at = (now + Duration::hours(ttl_hours)).timestamp();
        let mut tx = self.db.begin().await?;

        for article in articles {
            sqlx::query(
                r#"
                INSERT INTO article_cache (url, source_name, payload, cached_at, expires_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(url) DO UPDATE SET
                    source_name = excluded.source_name,
                    payload = excluded.payload,
                    cached_at = excluded.cached_at,
                    expires_at = excluded.expires_at
                "#,
            )
            .bind(&article.url)
            .bind(&article.source.name)
            .bind(serde_json::to_string(article)?)
            .bind(now.timestamp())
            .bind(expires_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("Cached {} articles for {} hours", articles.len(), ttl_hours);
        Ok(articles.len())
    }

    async fn cache_stats(&self) -> Result<CacheStats> {
        let now = Utc::now().timestamp();

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM article_cache")
            .fetch_one(&self.db)
            .await?;
        let expired: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM article_cache WHERE expires_at <= ?")
            .bind(now)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query("SELECT source_name, COUNT(*) AS n FROM article_cache WHERE expires_at > ? GROUP BY source_name")
            .bind(now)
            .fetch_all(&self.db)
            .await?;
        let mut by_source = std::collections::BTreeMap::new();
        for row in rows {
            by_source.insert(row.try_get::<String, _>("source_name")?, row.try_get::<i64, _>("n")?);
        }

        Ok(CacheStats {
            total,
            expired,
            active: total - expired,
            by_source,
        })
    }

    async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM article_cache WHERE expires_at <= ?")
            .bind(Utc::now().timestamp())
            .execute(&self.db)
            .await?;

        let purged = result.rows_affected();
        info!("Purged {} expired cache entries", purged);
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::SourceProfile;

    async fn store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.unwrap()
    }

    async fn expire_all(store: &SqliteStore) {
        sqlx::query("UPDATE article_cache SET expires_at = ?")
            .bind(Utc::now().timestamp() - 1)
            .execute(&store.db)
            .await
            .unwrap();
    }

    fn article(url: &str, source: &str) -> RawArticle {
        RawArticle::new(url, format!("Title for {}", url), SourceProfile::new(source, 8.0)).with_summary("summary")
    }

    #[tokio::test]
    async fn test_cache_upsert_is_idempotent() {
        let store = store().await;
        let batch = vec![article("https://a.dev/1", "Rust Blog"), article("https://a.dev/2", "Go Blog")];
        store.save_articles_to_cache(&batch, 12).await.unwrap();
        store.save_articles_to_cache(&batch, 12).await.unwrap();

        let stats = store.cache_stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.by_source.get("Rust Blog"), Some(&1));

        let rust_only = store.get_cached_articles(Some("Rust")).await.unwrap();
        assert_eq!(rust_only.len(), 1);
        assert_eq!(rust_only[0], batch[0]);
    }

    #[tokio::test]
    async fn test_expired_entries_hidden_then_purged() {
        let store = store().await;
        store.save_articles_to_cache(&[article("https://a.dev/1", "Rust Blog")], 1).await.unwrap();
        expire_all(&store).await;

        assert!(store.get_cached_articles(None).await.unwrap().is_empty());
        assert_eq!(store.cache_stats().await.unwrap().expired, 1);
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.cache_stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_zero_ttl_rejected() {
        let store = store().await;
        let result = store.save_articles_to_cache(&[article("https://a.dev/1", "x")], 0).await;
        assert!(matches!(result, Err(CuratorError::Config(_))));
    }
}
