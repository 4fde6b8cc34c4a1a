//! Cursor poll loop
//!
//! Both feeds (episode comments and help chat) share this engine: given a
//! client-supplied timestamp cursor, repeatedly query the persistence layer
//! until rows newer than the cursor exist or the timeout elapses, then
//! return them ascending by creation time.
//!
//! Waiting is a non-blocking `tokio::time::sleep`, so thousands of held-open
//! requests cost idle tasks rather than threads. The sleep is also the
//! cancellation point: when a client disconnects, the handler future is
//! dropped at the next await and polling stops.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::config::PollingConfig;
use crate::error::Result;
use crate::metrics::{ACTIVE_LONG_POLLS, LONG_POLL_WAIT_SECONDS};

/// Timing parameters for one feed
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Feed label for metrics and tracing
    pub feed: &'static str,
    /// Hard per-request timeout
    pub timeout: Duration,
    /// Delay between persistence queries
    pub interval: Duration,
}

impl PollSettings {
    /// Comment feed timings (default 200 ms interval, 25 s timeout)
    pub fn comments(config: &PollingConfig) -> Self {
        Self {
            feed: "comments",
            timeout: Duration::from_millis(config.timeout_ms),
            interval: Duration::from_millis(config.comment_interval_ms),
        }
    }

    /// Chat feed timings (default 500 ms interval, 25 s timeout)
    pub fn chat(config: &PollingConfig) -> Self {
        Self {
            feed: "chat",
            timeout: Duration::from_millis(config.timeout_ms),
            interval: Duration::from_millis(config.chat_interval_ms),
        }
    }
}

/// Rows that carry a server-assigned creation timestamp
pub trait Timestamped {
    fn created_at(&self) -> DateTime<Utc>;
}

/// Creation time as float seconds since the Unix epoch, at microsecond
/// precision. This is the representation clients hold as their cursor.
pub fn epoch_seconds(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_micros() as f64 / 1_000_000.0
}

/// Parse a client-supplied `after` value.
///
/// Malformed input degrades to "no cursor" (full-scope query), it does not
/// fail the request.
pub fn parse_cursor(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Convert a cursor to the query's `created_at` lower bound.
///
/// A cursor outside the representable range falls back to an unbounded
/// query; the strict post-filter in [`poll_new`] still applies.
pub fn cursor_lower_bound(cursor: Option<f64>) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros((cursor? * 1_000_000.0) as i64)
}

/// Block until rows newer than `since` exist or the timeout elapses.
///
/// `fetch` is the persistence query, already bounded by `created_at >
/// since` where the cursor was usable. The strict float comparison
/// re-applied here keeps a row whose timestamp equals the cursor from being
/// redelivered forever when the two representations disagree at the
/// precision boundary.
///
/// An exhausted timeout returns an empty list; the client is expected to
/// immediately re-poll. Persistence failures propagate, they must never be
/// mistaken for "no new data".
pub async fn poll_new<T, F, Fut>(
    settings: &PollSettings,
    since: Option<f64>,
    mut fetch: F,
) -> Result<Vec<T>>
where
    T: Timestamped,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let started = Instant::now();
    let _guard = ActivePollGuard::new(settings.feed);

    while started.elapsed() < settings.timeout {
        let rows = fetch().await?;

        if !rows.is_empty() {
            let fresh: Vec<T> = match since {
                Some(cursor) => rows
                    .into_iter()
                    .filter(|row| epoch_seconds(row.created_at()) > cursor)
                    .collect(),
                None => rows,
            };

            if !fresh.is_empty() {
                LONG_POLL_WAIT_SECONDS
                    .with_label_values(&[settings.feed, "delivered"])
                    .observe(started.elapsed().as_secs_f64());
                tracing::debug!(
                    feed = settings.feed,
                    rows = fresh.len(),
                    waited_ms = started.elapsed().as_millis() as u64,
                    "long-poll satisfied"
                );
                return Ok(fresh);
            }
        }

        tokio::time::sleep(settings.interval).await;
    }

    LONG_POLL_WAIT_SECONDS
        .with_label_values(&[settings.feed, "timeout"])
        .observe(started.elapsed().as_secs_f64());
    tracing::debug!(feed = settings.feed, "long-poll timed out with no new rows");

    Ok(Vec::new())
}

/// Keeps the active-poller gauge accurate even when the request future is
/// dropped mid-poll on client disconnect.
struct ActivePollGuard {
    feed: &'static str,
}

impl ActivePollGuard {
    fn new(feed: &'static str) -> Self {
        ACTIVE_LONG_POLLS.with_label_values(&[feed]).inc();
        Self { feed }
    }
}

impl Drop for ActivePollGuard {
    fn drop(&mut self) {
        ACTIVE_LONG_POLLS.with_label_values(&[self.feed]).dec();
    }
}
