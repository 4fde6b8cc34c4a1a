//! Service layer
//!
//! The long-poll engine shared by both feeds and the projection of feed
//! rows into client-facing records.

pub mod feed;
pub mod poll;

pub use poll::{PollSettings, Timestamped, epoch_seconds, parse_cursor, poll_new};
