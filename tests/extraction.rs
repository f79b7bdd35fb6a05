//! End-to-end extraction tests over in-memory and JSONL snapshots.

use chatsift::config::Config;
use chatsift::models::{ThreadType, Timestamp};
use chatsift::source::{record_from_json, MemorySource, RawRecord, RecordSource};
use chatsift::{extract, unread_only};

fn conversation(id: &str, json: serde_json::Value) -> RawRecord {
    record_from_json("Client:conversation-manager-en-US", id, "fixture", &json).unwrap()
}

fn reply_chain(key: &str, json: serde_json::Value) -> RawRecord {
    record_from_json("Client:replychain-manager-en-US", key, "fixture", &json).unwrap()
}

fn read_marker(key: &str, json: serde_json::Value) -> RawRecord {
    record_from_json(
        "Client:replychain-metadata-manager-en-US",
        key,
        "fixture",
        &json,
    )
    .unwrap()
}

fn profile(key: &str, json: serde_json::Value) -> RawRecord {
    record_from_json("Client:profiles-en-US", key, "fixture", &json).unwrap()
}

/// A snapshot with redundant copies, drifted fields, and all four domains.
fn rich_source() -> MemorySource {
    MemorySource::new(vec![
        // Two copies of the same chat; version 7 wins.
        conversation(
            "19:alpha",
            serde_json::json!({
                "id": "19:alpha",
                "threadType": "chat",
                "version": 3,
                "chatTitle": { "shortTitle": "Old Jane" },
                "lastMessageTimeUtc": 1_769_563_200_000u64
            }),
        ),
        conversation(
            "19:alpha",
            serde_json::json!({
                "id": "19:alpha",
                "threadType": "chat",
                "version": 7,
                "chatTitle": { "shortTitle": "Jane Doe" },
                "lastMessageTimeUtc": 1_769_563_301_037u64,
                "threadProperties": { "isRead": false }
            }),
        ),
        // A channel with team/topic naming.
        conversation(
            "19:beta@thread.tacv2",
            serde_json::json!({
                "id": "19:beta@thread.tacv2",
                "displayName": "Platform",
                "topic": "deploys",
                "version": 1,
                "lastMessageTimeUtc": 1_769_000_000_000u64
            }),
        ),
        // A meeting sub-thread that must be filtered out.
        conversation(
            "19:meeting_xyz@thread.v2",
            serde_json::json!({ "id": "19:meeting_xyz@thread.v2", "version": 1 }),
        ),
        reply_chain(
            "chain-1",
            serde_json::json!({
                "id": "chain-1",
                "conversationId": "19:alpha",
                "consumptionHorizon": "1769563300000;0;0",
                "messageMap": {
                    "1769563301037": {
                        "from": "8:orgid:jane",
                        "content": "see you tomorrow",
                        "originalArrivalTimestamp": 1_769_563_301_037u64
                    },
                    "1769563200000": {
                        "from": "8:orgid:me",
                        "content": "heading out",
                        "originalArrivalTimestamp": 1_769_563_200_000u64
                    }
                }
            }),
        ),
        read_marker(
            "19:alpha",
            serde_json::json!({
                "conversationId": "19:alpha",
                "consumptionHorizon": "1769563250000;0"
            }),
        ),
        profile(
            "8:orgid:jane",
            serde_json::json!({
                "mri": "8:orgid:jane",
                "displayName": "Jane Doe",
                "mail": "jane@example.com"
            }),
        ),
    ])
}

#[tokio::test]
async fn test_extract_is_idempotent() {
    let source = rich_source();
    let cfg = Config::default();

    let first = extract(&source, &cfg).await.unwrap();
    let second = extract(&source, &cfg).await.unwrap();

    let a = serde_json::to_string(&first.conversations).unwrap();
    let b = serde_json::to_string(&second.conversations).unwrap();
    assert_eq!(a, b, "re-running over the same snapshot must be byte-identical");
}

#[tokio::test]
async fn test_jsonl_round_trip_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let dump = tmp.path().join("snapshot.jsonl");
    let mut lines = String::new();
    lines.push_str(
        r#"{"store":"Client:conversation-manager-en-US","key":"19:alpha","value":{"id":"19:alpha","version":2,"lastMessageTimeUtc":1769563301037}}"#,
    );
    lines.push('\n');
    lines.push_str("this line is not json\n");
    lines.push_str(
        r#"{"store":"Client:profiles-en-US","key":"8:u","value":{"mri":"8:u","displayName":"User"}}"#,
    );
    lines.push('\n');
    std::fs::write(&dump, lines).unwrap();

    let source = chatsift::source::JsonlSource::new(&dump);
    let cfg = Config::default();

    let first = extract(&source, &cfg).await.unwrap();
    let second = extract(&source, &cfg).await.unwrap();

    assert_eq!(first.conversations.len(), 1);
    assert!(first.stats.malformed_records >= 1, "bad dump line is counted");
    assert_eq!(
        serde_json::to_string(&first.conversations).unwrap(),
        serde_json::to_string(&second.conversations).unwrap()
    );
}

#[tokio::test]
async fn test_version_tie_resolves_to_unread() {
    let source = MemorySource::new(vec![
        conversation(
            "19:tied",
            serde_json::json!({
                "id": "19:tied", "version": 5,
                "threadProperties": { "isRead": true }
            }),
        ),
        conversation(
            "19:tied",
            serde_json::json!({
                "id": "19:tied", "version": 5,
                "threadProperties": { "isRead": false }
            }),
        ),
    ]);

    let extraction = extract(&source, &Config::default()).await.unwrap();
    assert_eq!(extraction.conversations.len(), 1);
    assert_eq!(extraction.conversations[0].is_read_flag, Some(false));
}

#[tokio::test]
async fn test_resolution_and_enrichment() {
    let source = rich_source();
    let extraction = extract(&source, &Config::default()).await.unwrap();

    // The meeting thread is filtered; alpha and the channel remain, alpha
    // first (newer activity).
    assert_eq!(extraction.conversations.len(), 2);
    let alpha = &extraction.conversations[0];
    assert_eq!(alpha.id, "19:alpha");
    assert_eq!(alpha.title, "Jane Doe", "version 7 copy is authoritative");
    assert_eq!(alpha.thread_type, ThreadType::Chat);

    // Messages sorted ascending, sender names enriched from profiles.
    assert_eq!(alpha.messages.len(), 2);
    assert_eq!(alpha.messages[0].content, "heading out");
    assert_eq!(alpha.messages[1].sender_name, "Jane Doe");
    assert_eq!(alpha.messages[0].sender_name, "8:orgid:me");

    // Horizon 1769563300000 (chain) beats the read-marker one; only the
    // last message is past it.
    assert_eq!(alpha.unread_count, 1);
    assert!(alpha.messages[1].is_unread);
    assert!(!alpha.messages[0].is_unread);

    let channel = &extraction.conversations[1];
    assert_eq!(channel.title, "Platform > deploys");
    assert_eq!(channel.thread_type, ThreadType::Topic);
}

#[tokio::test]
async fn test_numeric_timestamp_matches_iso_instant() {
    let source = rich_source();
    let extraction = extract(&source, &Config::default()).await.unwrap();
    let alpha = &extraction.conversations[0];

    let expected = chrono::DateTime::parse_from_rfc3339("2026-01-28T01:21:41.037Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    assert_eq!(alpha.last_message_time, Timestamp::Known(expected));
}

#[tokio::test]
async fn test_valid_numeric_timestamp_never_unknown() {
    // Round-trip property: a record with a valid numeric timestamp field
    // must not come out as "unknown time".
    let source = rich_source();
    let extraction = extract(&source, &Config::default()).await.unwrap();
    for conv in &extraction.conversations {
        assert!(conv.last_message_time.is_known(), "{} lost its timestamp", conv.id);
        for msg in &conv.messages {
            assert!(msg.timestamp.is_known());
        }
    }
}

#[tokio::test]
async fn test_unread_flag_fallback_with_no_messages() {
    let source = MemorySource::new(vec![conversation(
        "19:flagged",
        serde_json::json!({
            "id": "19:flagged",
            "version": 1,
            "threadProperties": { "isRead": false }
        }),
    )]);

    let extraction = unread_only(&source, &Config::default()).await.unwrap();
    assert_eq!(extraction.conversations.len(), 1);
    assert_eq!(extraction.conversations[0].unread_count, 1);
    assert!(extraction.conversations[0].messages.is_empty());
}

#[tokio::test]
async fn test_recency_fallback_without_any_signal() {
    let source = MemorySource::new(vec![conversation(
        "19:quiet",
        serde_json::json!({
            "id": "19:quiet",
            "version": 1,
            "lastMessageTimeUtc": 1_700_000_000
        }),
    )]);

    let extraction = extract(&source, &Config::default()).await.unwrap();
    assert_eq!(extraction.conversations[0].unread_count, 1);
}

#[tokio::test]
async fn test_hidden_exclusion_is_opt_in() {
    let hidden = conversation(
        "19:hidden",
        serde_json::json!({
            "id": "19:hidden",
            "version": 1,
            "threadProperties": { "hidden": true }
        }),
    );
    let source = MemorySource::new(vec![hidden.clone()]);

    let default_cfg = Config::default();
    let kept = extract(&source, &default_cfg).await.unwrap();
    assert_eq!(kept.conversations.len(), 1);
    assert!(kept.conversations[0].hidden);

    let mut excluding = Config::default();
    excluding.filters.exclude_hidden = true;
    let source = MemorySource::new(vec![hidden]);
    let dropped = extract(&source, &excluding).await.unwrap();
    assert!(dropped.conversations.is_empty());
}

#[tokio::test]
async fn test_source_reports_restartable_sequence() {
    let source = rich_source();
    let first = source.records("conversation-manager").await.unwrap();
    let second = source.records("conversation-manager").await.unwrap();
    let keys: Vec<_> = first.records.iter().map(|r| r.key.clone()).collect();
    let keys2: Vec<_> = second.records.iter().map(|r| r.key.clone()).collect();
    assert_eq!(keys, keys2);
}
