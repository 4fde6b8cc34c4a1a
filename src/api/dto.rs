//! API response DTOs
//!
//! Data Transfer Objects for the JSON surface consumed by the page layer
//! and the asynchronous feed scripts.

use serde::{Deserialize, Serialize};

use crate::data::{Anime, Episode, User};

/// One comment-feed element
///
/// `timestamp` is the raw epoch value; the client stores the maximum of a
/// response and replays it as the next request's `after` cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentEvent {
    pub user: String,
    pub comment: String,
    /// Localized date string, e.g. "7 de marzo de 2024 a las 14:05"
    pub created_at: String,
    pub timestamp: f64,
}

/// One chat-feed element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageEvent {
    pub sender: String,
    /// Sender icon URL, empty string when unset
    pub icon: String,
    pub message: String,
    pub created_at: String,
    pub timestamp: f64,
    /// Whether the requesting viewer sent this message (bubble alignment)
    pub is_user: bool,
}

/// Card shown on the index carousel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimeCard {
    pub title: String,
    pub image: String,
    pub url: String,
}

/// One index group: a category with its animes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub name: String,
    pub animes: Vec<AnimeCard>,
}

/// Asynchronous search result row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub total_episodes: i64,
    pub image: String,
    pub description: String,
    pub url: String,
}

/// Anime page payload
#[derive(Debug, Clone, Serialize)]
pub struct AnimeDetailResponse {
    pub anime: Anime,
    pub episodes: Vec<Episode>,
}

/// Episode page payload (the non-XHR shape of the comment-feed route)
#[derive(Debug, Clone, Serialize)]
pub struct EpisodePageResponse {
    pub anime: Anime,
    pub episode: Episode,
    pub comments: Vec<CommentEvent>,
}

/// One row of the staff conversation overview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    /// Conversation owner's username
    pub username: String,
}

/// Conversation page payload (the non-XHR shape of the chat-feed route)
#[derive(Debug, Clone, Serialize)]
pub struct ConversationPageResponse {
    pub id: String,
    pub messages: Vec<ChatMessageEvent>,
}

/// Public view of a user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    /// Icon URL, empty string when unset
    pub icon: String,
    pub is_superuser: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            icon: user.icon.clone().unwrap_or_default(),
            is_superuser: user.is_superuser,
        }
    }
}

/// Signup/login payload: the session token plus the account it belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserResponse,
}

/// One row of the staff suggestion inbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionResponse {
    pub id: String,
    /// Author's username; absent when the account is gone
    pub user: Option<String>,
    pub subject: String,
    pub message: String,
    pub created_at: String,
}
