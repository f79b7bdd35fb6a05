//! Field normalization over resolved raw records.
//!
//! The store's schema drifts between client versions, so every typed field
//! comes out of an ordered fallback chain instead of a single lookup. The
//! chains here cover titles (per thread type), timestamps (epoch millis,
//! epoch seconds, RFC 3339 strings, numeric strings), and message content.
//!
//! Timestamps that fail every parse normalize to [`Timestamp::Unknown`],
//! never to the current time, which would break run-to-run determinism.

use chrono::{DateTime, Utc};

use crate::models::{ContentType, ThreadType, Timestamp};
use crate::source::RawRecord;
use crate::value::Value;

/// Millisecond/second boundary: epoch values above this are milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e12;

/// Determine the thread type from the record, falling back to id patterns.
pub fn thread_type(record: &RawRecord, id: &str, system_markers: &[String]) -> ThreadType {
    if let Some(raw) = record.field("threadType").as_str() {
        match raw.to_ascii_lowercase().as_str() {
            "chat" | "groupchat" | "sfbinteropchat" => return ThreadType::Chat,
            "topic" | "space" => return ThreadType::Topic,
            "meeting" => return ThreadType::Meeting,
            _ => {}
        }
    }

    // Meeting ids also carry the thread suffix, so the meeting check must
    // come before the topic one.
    let lower = id.to_ascii_lowercase();
    if system_markers.iter().any(|m| id.contains(m.as_str())) {
        ThreadType::System
    } else if lower.contains("meeting_") {
        ThreadType::Meeting
    } else if id.contains("@thread.tacv2") || id.contains("@thread.v2") {
        ThreadType::Topic
    } else {
        ThreadType::Chat
    }
}

/// Whether a chat record describes a group chat rather than a 1:1 chat.
/// Decides which chat-title field takes priority.
pub fn is_group_chat(record: &RawRecord) -> bool {
    matches!(
        record
            .field("threadType")
            .as_str()
            .map(str::to_ascii_lowercase)
            .as_deref(),
        Some("groupchat") | Some("space")
    )
}

/// Build the display title through the fallback chain for the thread type.
pub fn title(record: &RawRecord, thread_type: ThreadType, id: &str) -> String {
    let chat_title = record.field("chatTitle");
    let short = chat_title.str_field("shortTitle");
    let long = chat_title.str_field("longTitle");
    let display_name = record.str_field("displayName");
    let topic = record.str_field("topic");
    let props = record.field("threadProperties");

    let picked = match thread_type {
        ThreadType::Chat => {
            // shortTitle is the counterpart's name in 1:1 chats; longTitle
            // lists all participants in group chats.
            if is_group_chat(record) {
                long.or(short).or(display_name)
            } else {
                short.or(long).or(display_name)
            }
        }
        ThreadType::Topic => match (display_name, topic) {
            (Some(team), Some(channel)) if team != channel => {
                return format!("{} > {}", team, channel);
            }
            (team, channel) => channel
                .or(team)
                .or_else(|| props.str_field("spaceThreadTopic"))
                .or_else(|| props.str_field("description")),
        },
        ThreadType::Meeting | ThreadType::System | ThreadType::Unknown => {
            display_name.or(topic).or(short).or(long)
        }
    };

    picked.unwrap_or(id).to_string()
}

/// Normalize a raw field value into a [`Timestamp`].
///
/// Numeric values above 1e12 are epoch milliseconds, positive values at or
/// below it epoch seconds (fractions kept to millisecond precision).
/// Strings try RFC 3339 first, then the numeric rule. Everything else is
/// `Unknown`.
pub fn timestamp(value: &Value) -> Timestamp {
    match value {
        Value::Num(n) => timestamp_from_number(*n),
        Value::Str(s) => {
            let trimmed = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
                return Timestamp::Known(dt.with_timezone(&Utc));
            }
            match trimmed.parse::<f64>() {
                Ok(n) => timestamp_from_number(n),
                Err(_) => Timestamp::Unknown,
            }
        }
        _ => Timestamp::Unknown,
    }
}

fn timestamp_from_number(n: f64) -> Timestamp {
    if !n.is_finite() || n <= 0.0 {
        return Timestamp::Unknown;
    }
    let millis = if n > EPOCH_MILLIS_THRESHOLD {
        n.round()
    } else {
        (n * 1000.0).round()
    };
    if millis > i64::MAX as f64 {
        return Timestamp::Unknown;
    }
    match DateTime::from_timestamp_millis(millis as i64) {
        Some(dt) => Timestamp::Known(dt),
        None => Timestamp::Unknown,
    }
}

/// Extract message content and its encoding.
///
/// Content lives either directly on the message or nested under
/// `messageBody`; byte payloads decode as UTF-8 with replacement characters.
pub fn content(message: &Value) -> (String, ContentType) {
    let text = message
        .text_field("content")
        .or_else(|| message.get("messageBody").text_field("content"))
        .unwrap_or_default();

    let content_type = match message.str_field("messagetype") {
        Some(mt) if mt.to_ascii_lowercase().starts_with("richtext/html") => ContentType::Html,
        _ => ContentType::Text,
    };

    (text, content_type)
}
