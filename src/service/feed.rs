//! Feed row projection
//!
//! Turns raw feed rows into the client-facing records: a localized Spanish
//! date string, the raw float timestamp the client replays as its next
//! cursor, and the per-feed fields.

use chrono::{DateTime, Datelike, Timelike, Utc};

use super::poll::{Timestamped, epoch_seconds};
use crate::api::dto::{ChatMessageEvent, CommentEvent};
use crate::data::{CommentFeedRow, MessageFeedRow};

/// Spanish month names, indexed by `month0`.
///
/// A fixed table keeps rendering deterministic regardless of the server's
/// locale configuration.
const MONTHS_ES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Render a timestamp as `"{day} de {month} de {year} a las {HH:MM}"`.
pub fn format_date_es(ts: DateTime<Utc>) -> String {
    format!(
        "{} de {} de {} a las {:02}:{:02}",
        ts.day(),
        MONTHS_ES[ts.month0() as usize],
        ts.year(),
        ts.hour(),
        ts.minute()
    )
}

impl Timestamped for CommentFeedRow {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Timestamped for MessageFeedRow {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Project a comment row into its feed event.
pub fn comment_event(row: &CommentFeedRow) -> CommentEvent {
    CommentEvent {
        user: row.username.clone(),
        comment: row.content.clone(),
        created_at: format_date_es(row.created_at),
        timestamp: epoch_seconds(row.created_at),
    }
}

/// Project a message row into its feed event, relative to the viewer.
///
/// `is_user` lets the client align the viewer's own bubbles; the icon URL
/// collapses to an empty string when the sender never set one.
pub fn message_event(row: &MessageFeedRow, viewer_id: &str) -> ChatMessageEvent {
    ChatMessageEvent {
        sender: row.sender_username.clone(),
        icon: row.sender_icon.clone().unwrap_or_default(),
        message: row.message.clone(),
        created_at: format_date_es(row.created_at),
        timestamp: epoch_seconds(row.created_at),
        is_user: row.sender_id == viewer_id,
    }
}
