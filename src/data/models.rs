//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for surrogate IDs and chrono for timestamps.
//!
//! Comment and help-message rows are append-only: created once, read many
//! times, never mutated or deleted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Current time truncated to microsecond precision.
///
/// Comment and message timestamps are stored at microsecond precision so
/// the float cursor derived from them round-trips exactly; sub-microsecond
/// digits would make a row's timestamp compare unequal to its own cursor.
pub fn now_micros() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now)
}

// =============================================================================
// User
// =============================================================================

/// A registered viewer
///
/// `is_superuser` marks staff: cross-conversation visibility in the help
/// chat and access to the suggestion inbox.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Profile icon URL, empty in API payloads when unset
    pub icon: Option<String>,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A catalog category
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// An anime title
///
/// The title doubles as the natural key and the URL path segment.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Anime {
    pub title: String,
    pub description: String,
    /// Detail page image URL
    pub image_detail: Option<String>,
    /// Card/thumbnail image URL
    pub image_card: Option<String>,
    pub release_date: NaiveDate,
    pub total_episodes: i64,
    pub like_count: i64,
}

/// An episode of an anime
///
/// Unique per `(anime_title, episode_number)`. Immutable for polling
/// purposes.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Episode {
    pub id: String,
    pub anime_title: String,
    pub episode_number: i64,
    pub title: String,
    pub release_date: NaiveDate,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
}

// =============================================================================
// Comments
// =============================================================================

/// A comment on an episode
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: String,
    pub episode_id: String,
    pub anime_title: String,
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A comment row joined with its author, as consumed by the comment feed
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentFeedRow {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub username: String,
}

// =============================================================================
// Help chat
// =============================================================================

/// A help-desk conversation
///
/// At most one exists per non-staff owner; creation is get-or-create.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// A message inside a conversation
///
/// `recipient_id` is the conversation owner when the sender is staff, and
/// none otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HelpMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub recipient_id: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// A message row joined with its sender, as consumed by the chat feed
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageFeedRow {
    pub id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub sender_id: String,
    pub sender_username: String,
    pub sender_icon: Option<String>,
}

// =============================================================================
// Suggestions
// =============================================================================

/// A suggestion-box entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Suggestion {
    pub id: String,
    pub user_id: Option<String>,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
