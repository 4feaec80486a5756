use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Core Schemas (Mapped to Database) ---

/// User
///
/// Canonical account row from the `users` table. Internal only: it is never serialized,
/// so the password hash cannot leak through a response or a credential. Outward-facing
/// code works with [`UserSnapshot`] instead.
#[derive(Clone, FromRow)]
pub struct User {
    pub id: i64,
    // Unique, case-sensitive.
    pub username: String,
    // Argon2 PHC string.
    pub password_hash: String,
    #[sqlx(rename = "isAdmin")]
    pub is_admin: bool,
}

impl User {
    /// Strips the password material, keeping only what may travel in claims.
    pub fn snapshot(&self) -> UserSnapshot {
        UserSnapshot {
            id: self.id,
            username: self.username.clone(),
            is_admin: self.is_admin,
        }
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("is_admin", &self.is_admin)
            .finish()
    }
}

/// UserSnapshot
///
/// The sanitized user embedded in the credential under `userData` and returned by
/// `GET /api/protected`. `isAdmin` travels as the integer 0 or 1; any other value fails
/// to decode, so a malformed snapshot can never be mistaken for a valid one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserSnapshot {
    #[ts(type = "number")]
    pub id: i64,
    pub username: String,
    #[serde(rename = "isAdmin", with = "admin_flag")]
    #[ts(type = "number")]
    #[schema(value_type = i32)]
    pub is_admin: bool,
}

/// Strict 0/1 integer encoding for the admin flag.
mod admin_flag {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(de::Error::custom(format!(
                "isAdmin must be 0 or 1, got {other}"
            ))),
        }
    }
}

/// Post
///
/// A forum post, joined with its author's username. `author` is the owning user id,
/// the value the post ownership resolver reads.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Post {
    #[ts(type = "number")]
    pub id: i64,
    pub title: String,
    pub topic: String,
    pub content: String,
    #[ts(type = "number")]
    pub author: i64,
    pub username: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Comment
///
/// A node in a post's comment forest. `parent_id` is `None` for top-level comments;
/// otherwise it names an existing comment on the same post.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Comment {
    #[ts(type = "number")]
    pub id: i64,
    #[ts(type = "number")]
    pub post_id: i64,
    #[ts(type = "number | null")]
    pub parent_id: Option<i64>,
    #[ts(type = "number")]
    pub author: i64,
    pub username: String,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Topic
///
/// A unique label posts are tagged with. Stored in the `topics.topic` column.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq, Eq)]
#[ts(export)]
pub struct Topic {
    #[sqlx(rename = "topic")]
    pub topic_name: String,
}

// --- Request Payloads (Input Schemas) ---
//
// Fields default to empty so that a missing field reaches validation and yields a 400,
// rather than being rejected by the JSON extractor with a different status.

/// Credentials
///
/// Input for both `POST /api/create_account` and `POST /api/login`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// CreatePostRequest
///
/// The author is never taken from the body; it is always the authenticated caller.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(default)]
pub struct CreatePostRequest {
    pub title: String,
    pub topic: String,
    pub content: String,
}

/// UpdatePostRequest
///
/// Title and content are required. An absent topic keeps the stored one.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(default)]
pub struct UpdatePostRequest {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

/// CommentRequest
///
/// Input for creating a top-level comment, a reply, or editing a comment.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(default)]
pub struct CommentRequest {
    pub content: String,
}

/// TopicRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(default)]
pub struct TopicRequest {
    pub topic_name: String,
}

// --- Response Schemas (Output) ---

/// MessageResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// UsernameResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsernameResponse {
    pub username: String,
}

/// CascadeReport
///
/// Row counts removed by a cascading delete, all within one transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CascadeReport {
    #[ts(type = "number")]
    pub comments: u64,
    #[ts(type = "number")]
    pub posts: u64,
}

/// DeleteResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
    pub removed: CascadeReport,
}

impl From<CascadeReport> for DeleteResponse {
    fn from(removed: CascadeReport) -> Self {
        Self {
            success: true,
            removed,
        }
    }
}
