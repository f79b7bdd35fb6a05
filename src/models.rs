//! Core data models for the extraction pipeline.
//!
//! These are the resolved, caller-owned types an extraction pass produces.
//! Raw records ([`crate::source::RawRecord`]) live only inside a pass; the
//! types here are what `extract` hands back.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// A normalized instant, or the explicit admission that none could be
/// parsed.
///
/// The engine never substitutes the current time for an unparseable
/// timestamp: two runs over the same snapshot must produce identical
/// output. `Unknown` orders before every known instant, so unknown messages
/// sort first and unknown conversations sort last in the newest-first
/// listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Timestamp {
    Unknown,
    Known(DateTime<Utc>),
}

impl Timestamp {
    pub fn is_known(&self) -> bool {
        matches!(self, Timestamp::Known(_))
    }

    pub fn as_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Known(dt) => Some(*dt),
            Timestamp::Unknown => None,
        }
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Timestamp::Known(dt) => {
                write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Timestamp::Unknown => write!(f, "unknown time"),
        }
    }
}

/// The kind of conversation thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ThreadType {
    Chat,
    Topic,
    Meeting,
    System,
    Unknown,
}

impl std::fmt::Display for ThreadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ThreadType::Chat => "Chat",
            ThreadType::Topic => "Topic",
            ThreadType::Meeting => "Meeting",
            ThreadType::System => "System",
            ThreadType::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

/// Message body encoding as stored by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContentType {
    Text,
    Html,
}

/// A single resolved message.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    /// Stable sender identifier (e.g. `8:orgid:...`).
    pub sender_id: String,
    /// Resolved display name; falls back to the raw sender id.
    pub sender_name: String,
    pub content: String,
    pub content_type: ContentType,
    pub timestamp: Timestamp,
    /// Derived by the unread classifier, not stored authoritatively.
    pub is_unread: bool,
}

/// A resolved conversation with its locally-cached messages.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub thread_type: ThreadType,
    pub last_message_time: Timestamp,
    /// Read flag from thread metadata; `None` when the store had no signal.
    pub is_read_flag: Option<bool>,
    pub hidden: bool,
    /// Raw consumption-horizon strings gathered for this conversation, in
    /// source priority order (read markers, reply chains, own properties).
    pub horizons: Vec<String>,
    /// Ordered by timestamp ascending, ties by message id.
    pub messages: Vec<Message>,
    pub unread_count: usize,
}

impl Conversation {
    pub fn has_unread(&self) -> bool {
        self.unread_count > 0
    }
}

/// A user profile record keyed by its stable identifier.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub mri: String,
    pub display_name: String,
    pub mail: Option<String>,
}

/// Per-pass diagnostic counters.
///
/// Per-record problems are never fatal; they land here so callers can judge
/// snapshot quality. One malformed record must not abort the rest.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ExtractStats {
    pub conversation_records: usize,
    pub reply_chain_records: usize,
    pub read_marker_records: usize,
    pub profile_records: usize,
    pub malformed_records: usize,
    pub unclassified_records: usize,
    pub conversations_resolved: usize,
    pub conversations_filtered: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_unknown_orders_before_known() {
        let known = Timestamp::Known(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        assert!(Timestamp::Unknown < known);
    }

    #[test]
    fn test_timestamp_display() {
        let known = Timestamp::Known(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        assert_eq!(known.to_string(), "2023-11-14T22:13:20.000Z");
        assert_eq!(Timestamp::Unknown.to_string(), "unknown time");
    }
}
