//! Layered unread detection.
//!
//! Three independent signal layers, combined by priority: a later layer
//! applies only when every earlier one had no signal at all.
//!
//! 1. consumption horizon: the maximum valid instant across all gathered
//!    read markers; messages strictly after it are unread;
//! 2. metadata read flag: an explicit `isRead == false` forces at least one
//!    unread item;
//! 3. recency correlation: a known last-message time with no locally cached
//!    messages is surfaced as one conservative unread item.
//!
//! No recency window is applied anywhere: an unread conversation from last
//! year is still unread. Suppressing old items contradicts the origin
//! application's own behavior.

use crate::models::{Message, Timestamp};
use crate::normalize;
use crate::value::Value;

/// Parse one consumption-horizon string.
///
/// Horizons are semicolon-separated numeric segments; each parses
/// independently as a timestamp, invalid segments are discarded, and the
/// read-up-to instant is the maximum that survives.
pub fn parse_horizon(raw: &str) -> Timestamp {
    raw.split(';')
        .map(|segment| normalize::timestamp(&Value::Str(segment.trim().to_string())))
        .max()
        .unwrap_or(Timestamp::Unknown)
}

/// The effective read-up-to instant over every gathered horizon candidate.
pub fn effective_horizon(horizons: &[String]) -> Timestamp {
    horizons
        .iter()
        .map(|h| parse_horizon(h))
        .max()
        .unwrap_or(Timestamp::Unknown)
}

/// Classify unread state for one conversation.
///
/// Marks `is_unread` on the affected messages (which must already be in
/// ascending timestamp order) and returns the unread count.
pub fn classify(
    horizons: &[String],
    is_read_flag: Option<bool>,
    last_message_time: Timestamp,
    messages: &mut [Message],
) -> usize {
    let horizon = effective_horizon(horizons);

    if let Timestamp::Known(read_up_to) = horizon {
        let mut count = 0;
        for message in messages.iter_mut() {
            let unread = match message.timestamp {
                Timestamp::Known(ts) => ts > read_up_to,
                Timestamp::Unknown => false,
            };
            message.is_unread = unread;
            if unread {
                count += 1;
            }
        }
        // The local cache may hold none of the new messages. A last-message
        // time past the horizon still means unread content exists.
        if count == 0 && last_message_time > horizon {
            count = 1;
        }
        return count;
    }

    match is_read_flag {
        Some(false) => {
            // Represent the unread state with the most recent cached
            // message, even though no horizon can place it.
            if let Some(last) = messages.last_mut() {
                last.is_unread = true;
            }
            1
        }
        Some(true) => 0,
        None => {
            if last_message_time.is_known() && messages.is_empty() {
                1
            } else {
                0
            }
        }
    }
}
