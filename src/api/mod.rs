//! API layer
//!
//! HTTP handlers for:
//! - Catalog (index, search, anime/episode pages + comment feed)
//! - Help chat (conversations + chat feed)
//! - Accounts and suggestions
//! - Metrics (Prometheus)

mod accounts;
mod catalog;
mod chat;
pub mod dto;
pub mod metrics;
mod suggestions;

pub use dto::*;

pub use accounts::accounts_router;
pub use catalog::catalog_router;
pub use chat::chat_router;
pub use metrics::metrics_router;
pub use suggestions::suggestions_router;

use axum::http::HeaderMap;

/// Whether a request comes from the page's embedded feed script.
///
/// Both long-poll feeds are reached through the same route as their page;
/// the `X-Requested-With: XMLHttpRequest` header (plus a per-feed query
/// flag) selects the feed shape.
pub(crate) fn is_xhr(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("XMLHttpRequest"))
}

/// Parse an `episode-{n}` path segment.
pub(crate) fn parse_episode_segment(segment: &str) -> Option<i64> {
    segment.strip_prefix("episode-")?.parse().ok()
}
