//! Tagged text messages exchanged by the producer, consumer and dashboard.
//!
//! A message starts with its tag at position zero, followed by content:
//!
//! ```text
//! :PRODUCER:61234
//! ```
//!
//! `:SHUTDOWN:` carries no content.

use std::fmt::Display;

pub const SHUTDOWN: &str = ":SHUTDOWN:";
pub const CONSUMER: &str = ":CONSUMER:";
pub const PRODUCER: &str = ":PRODUCER:";
pub const CONTROL: &str = ":CONTROL:";
pub const CONSUMER_PROCESS_RESULTS: &str = ":CONSUMER_PROCESS_RESULTS:";

/// True when `message` starts with `tag`.
pub fn is_message_type(message: &str, tag: &str) -> bool {
    message.starts_with(tag)
}

/// Content following `tag`.
///
/// `None` when the tag does not match, when the tag is [`SHUTDOWN`], or
/// when nothing follows the tag.
pub fn message_content<'a>(message: &'a str, tag: &str) -> Option<&'a str> {
    if tag == SHUTDOWN || is_message_type(message, SHUTDOWN) {
        return None;
    }
    message
        .strip_prefix(tag)
        .filter(|content| !content.is_empty())
}

/// Build a tagged message.
pub fn compose(tag: &str, content: impl Display) -> String {
    format!("{tag}{content}")
}
