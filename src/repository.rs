use crate::cascade;
use crate::models::{
    CascadeReport, Comment, CreatePostRequest, Post, Topic, UpdatePostRequest, User, UserSnapshot,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;

/// StoreError
///
/// Storage-level failures. Handlers and middleware classify these into the HTTP
/// taxonomy; they are never rendered raw.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Repository Trait
///
/// The abstract contract for all persistence operations, so handlers, ownership
/// resolvers and tests never depend on a concrete backend.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across Axum's
/// task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    /// Fails with `Conflict` if the username is taken; the existing row is untouched.
    async fn create_user(&self, username: &str, password_hash: &str) -> StoreResult<UserSnapshot>;
    /// Idempotent admin bootstrap: an existing username is left as is.
    async fn ensure_admin(&self, username: &str, password_hash: &str) -> StoreResult<()>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn get_username(&self, id: i64) -> StoreResult<Option<String>>;

    // --- Posts ---
    async fn list_posts(&self, topic: Option<&str>) -> StoreResult<Vec<Post>>;
    async fn get_post(&self, id: i64) -> StoreResult<Option<Post>>;
    async fn create_post(&self, author: i64, req: &CreatePostRequest) -> StoreResult<Post>;
    async fn update_post(&self, id: i64, req: &UpdatePostRequest) -> StoreResult<Post>;
    /// Transactional: all comments of the post, then the post.
    async fn delete_post(&self, id: i64) -> StoreResult<CascadeReport>;
    /// Owning user id, read fresh on every call.
    async fn post_owner(&self, id: i64) -> StoreResult<i64>;

    // --- Comments ---
    async fn list_root_comments(&self, post_id: i64) -> StoreResult<Vec<Comment>>;
    async fn list_replies(&self, post_id: i64, comment_id: i64) -> StoreResult<Vec<Comment>>;
    async fn get_comment(&self, post_id: i64, comment_id: i64) -> StoreResult<Option<Comment>>;
    /// `parent_id`, when given, must name a comment on the same post.
    async fn create_comment(
        &self,
        post_id: i64,
        parent_id: Option<i64>,
        author: i64,
        content: &str,
    ) -> StoreResult<Comment>;
    async fn update_comment(&self, post_id: i64, comment_id: i64, content: &str)
    -> StoreResult<Comment>;
    /// Transactional: the comment and its entire subtree, or nothing.
    async fn delete_comment(&self, post_id: i64, comment_id: i64) -> StoreResult<CascadeReport>;
    /// Owning user id of a comment that belongs to `post_id`.
    async fn comment_owner(&self, post_id: i64, comment_id: i64) -> StoreResult<i64>;

    // --- Topics ---
    async fn list_topics(&self) -> StoreResult<Vec<Topic>>;
    async fn create_topic(&self, name: &str) -> StoreResult<Topic>;
    /// Transactional: tagged posts, their comments, then the topic row.
    async fn delete_topic(&self, name: &str) -> StoreResult<CascadeReport>;
}

/// RepositoryState
///
/// The concrete type used to share persistence access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Takes the write lock up front. A deferred `BEGIN` that reads first and writes
/// later cannot wait for a concurrent writer and fails with `SQLITE_BUSY`.
const WRITE_TRANSACTION: &str = "BEGIN IMMEDIATE";

const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.topic, p.content, p.user_id AS author,
           COALESCE(u.username, 'Unknown') AS username, p.created_at
    FROM posts p
    LEFT JOIN users u ON p.user_id = u.id
"#;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.post_id, c.parent_id, c.user_id AS author,
           COALESCE(u.username, 'Unknown') AS username, c.content, c.created_at
    FROM comments c
    LEFT JOIN users u ON c.user_id = u.id
"#;

/// Maps a unique-constraint violation to `Conflict`, anything else to `Database`.
fn conflict_or_database(err: sqlx::Error, message: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(message.to_string())
        }
        _ => StoreError::Database(err),
    }
}

/// SqliteRepository
///
/// The concrete implementation of the `Repository` trait, backed by SQLite.
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn create_user(&self, username: &str, password_hash: &str) -> StoreResult<UserSnapshot> {
        let result = sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                conflict_or_database(
                    e,
                    "This username is already taken. Please choose another one",
                )
            })?;

        Ok(UserSnapshot {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            is_admin: false,
        })
    }

    async fn ensure_admin(&self, username: &str, password_hash: &str) -> StoreResult<()> {
        sqlx::query("INSERT OR IGNORE INTO users (username, password_hash, isAdmin) VALUES (?, ?, 1)")
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, isAdmin FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn get_username(&self, id: i64) -> StoreResult<Option<String>> {
        Ok(sqlx::query_scalar("SELECT username FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    // --- POSTS ---

    /// Newest first, optionally restricted to one topic label.
    async fn list_posts(&self, topic: Option<&str>) -> StoreResult<Vec<Post>> {
        let posts = match topic {
            Some(topic) => {
                let sql = format!("{POST_SELECT} WHERE p.topic = ? ORDER BY p.created_at DESC, p.id DESC");
                sqlx::query_as::<_, Post>(&sql)
                    .bind(topic)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("{POST_SELECT} ORDER BY p.created_at DESC, p.id DESC");
                sqlx::query_as::<_, Post>(&sql).fetch_all(&self.pool).await?
            }
        };
        Ok(posts)
    }

    async fn get_post(&self, id: i64) -> StoreResult<Option<Post>> {
        let sql = format!("{POST_SELECT} WHERE p.id = ?");
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_post(&self, author: i64, req: &CreatePostRequest) -> StoreResult<Post> {
        let id = sqlx::query(
            "INSERT INTO posts (title, topic, content, user_id, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&req.title)
        .bind(&req.topic)
        .bind(&req.content)
        .bind(author)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.get_post(id).await?.ok_or(StoreError::NotFound("post"))
    }

    /// A missing or blank topic keeps the stored label.
    async fn update_post(&self, id: i64, req: &UpdatePostRequest) -> StoreResult<Post> {
        let topic = req.topic.as_deref().filter(|t| !t.trim().is_empty());
        let result = sqlx::query(
            "UPDATE posts SET title = ?, content = ?, topic = COALESCE(?, topic) WHERE id = ?",
        )
        .bind(&req.title)
        .bind(&req.content)
        .bind(topic)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("post"));
        }
        self.get_post(id).await?.ok_or(StoreError::NotFound("post"))
    }

    async fn delete_post(&self, id: i64) -> StoreResult<CascadeReport> {
        let mut tx = self.pool.begin_with(WRITE_TRANSACTION).await?;
        let report = cascade::delete_post_cascade(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(post_id = id, comments = report.comments, "post deleted");
        Ok(report)
    }

    async fn post_owner(&self, id: i64) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT user_id FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound("post"))
    }

    // --- COMMENTS ---

    async fn list_root_comments(&self, post_id: i64) -> StoreResult<Vec<Comment>> {
        let sql = format!(
            "{COMMENT_SELECT} WHERE c.post_id = ? AND c.parent_id IS NULL ORDER BY c.created_at DESC, c.id DESC"
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_replies(&self, post_id: i64, comment_id: i64) -> StoreResult<Vec<Comment>> {
        let sql = format!(
            "{COMMENT_SELECT} WHERE c.post_id = ? AND c.parent_id = ? ORDER BY c.created_at DESC, c.id DESC"
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .bind(comment_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_comment(&self, post_id: i64, comment_id: i64) -> StoreResult<Option<Comment>> {
        let sql = format!("{COMMENT_SELECT} WHERE c.id = ? AND c.post_id = ?");
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(comment_id)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Checks the post (and parent, for replies) and inserts in one transaction, so a
    /// concurrent delete cannot slip in between and leave an orphan.
    async fn create_comment(
        &self,
        post_id: i64,
        parent_id: Option<i64>,
        author: i64,
        content: &str,
    ) -> StoreResult<Comment> {
        let mut tx = self.pool.begin_with(WRITE_TRANSACTION).await?;

        let post: Option<i64> = sqlx::query_scalar("SELECT id FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await?;
        if post.is_none() {
            return Err(StoreError::NotFound("post"));
        }

        if let Some(parent_id) = parent_id {
            let parent: Option<i64> =
                sqlx::query_scalar("SELECT id FROM comments WHERE id = ? AND post_id = ?")
                    .bind(parent_id)
                    .bind(post_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if parent.is_none() {
                return Err(StoreError::NotFound("comment"));
            }
        }

        let id = sqlx::query(
            "INSERT INTO comments (post_id, parent_id, user_id, content, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(post_id)
        .bind(parent_id)
        .bind(author)
        .bind(content)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;

        self.get_comment(post_id, id)
            .await?
            .ok_or(StoreError::NotFound("comment"))
    }

    async fn update_comment(
        &self,
        post_id: i64,
        comment_id: i64,
        content: &str,
    ) -> StoreResult<Comment> {
        let result = sqlx::query("UPDATE comments SET content = ? WHERE id = ? AND post_id = ?")
            .bind(content)
            .bind(comment_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("comment"));
        }
        self.get_comment(post_id, comment_id)
            .await?
            .ok_or(StoreError::NotFound("comment"))
    }

    async fn delete_comment(&self, post_id: i64, comment_id: i64) -> StoreResult<CascadeReport> {
        let mut tx = self.pool.begin_with(WRITE_TRANSACTION).await?;
        let report = cascade::delete_comment_tree(&mut tx, post_id, comment_id).await?;
        tx.commit().await?;

        tracing::info!(post_id, comment_id, comments = report.comments, "comment subtree deleted");
        Ok(report)
    }

    async fn comment_owner(&self, post_id: i64, comment_id: i64) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT user_id FROM comments WHERE id = ? AND post_id = ?")
            .bind(comment_id)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound("comment"))
    }

    // --- TOPICS ---

    async fn list_topics(&self) -> StoreResult<Vec<Topic>> {
        Ok(sqlx::query_as::<_, Topic>("SELECT topic FROM topics ORDER BY id")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_topic(&self, name: &str) -> StoreResult<Topic> {
        sqlx::query("INSERT INTO topics (topic) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_or_database(e, "This topic already exists"))?;

        Ok(Topic {
            topic_name: name.to_string(),
        })
    }

    async fn delete_topic(&self, name: &str) -> StoreResult<CascadeReport> {
        let mut tx = self.pool.begin_with(WRITE_TRANSACTION).await?;
        let report = cascade::delete_topic_cascade(&mut tx, name).await?;
        tx.commit().await?;

        tracing::info!(
            topic = %name,
            posts = report.posts,
            comments = report.comments,
            "topic deleted"
        );
        Ok(report)
    }
}
