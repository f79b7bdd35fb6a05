//! Extraction pass orchestration.
//!
//! One pass turns a snapshot into the final conversation list:
//!
//! ```text
//! ┌────────────┐   ┌──────────┐   ┌─────────┐   ┌───────────┐
//! │ RecordSrc  │──▶│ Classify │──▶│ Resolve │──▶│ Normalize │
//! └────────────┘   └──────────┘   └─────────┘   └─────┬─────┘
//!   (4 domains scanned concurrently, joined here)     ▼
//!                                  ┌────────────────────────┐
//!                                  │ Enrich + Unread + Sort │
//!                                  └────────────────────────┘
//! ```
//!
//! The per-domain scans are independent read-only passes and run
//! concurrently; the aggregator waits on the join barrier because profile
//! enrichment and unread classification need every domain resolved. All
//! grouping state is owned by the pass; nothing is shared across passes and
//! nothing survives the pass, so extraction is a pure function of the
//! snapshot.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::classify::{Classifier, Domain};
use crate::config::Config;
use crate::error::ExtractError;
use crate::models::{Conversation, ExtractStats, Message};
use crate::normalize;
use crate::profile::ProfileDirectory;
use crate::resolve::{self, Candidate};
use crate::source::{RawRecord, RecordSource};
use crate::unread;
use crate::value::Value;

/// The output of one extraction pass, owned by the caller.
#[derive(Debug)]
pub struct Extraction {
    /// Conversations ordered by last activity, newest first.
    pub conversations: Vec<Conversation>,
    pub stats: ExtractStats,
}

/// Run a full extraction pass over one snapshot source.
pub async fn extract(source: &dyn RecordSource, config: &Config) -> Result<Extraction, ExtractError> {
    let classifier = Classifier::new(&config.markers);

    // Per-domain scans are embarrassingly parallel; the try_join is the
    // barrier the aggregator requires.
    let (conversations, reply_chains, read_markers, profiles) = tokio::try_join!(
        scan_domain(source, &classifier, Domain::Conversation),
        scan_domain(source, &classifier, Domain::ReplyChain),
        scan_domain(source, &classifier, Domain::ReadMarker),
        scan_domain(source, &classifier, Domain::Profile),
    )?;

    // The scans share one underlying snapshot: an entry unparseable in one
    // scan is unparseable in all of them, so the max is the real count.
    let source_malformed = [
        conversations.malformed,
        reply_chains.malformed,
        read_markers.malformed,
        profiles.malformed,
    ]
    .into_iter()
    .max()
    .unwrap_or(0);

    let mut stats = ExtractStats {
        conversation_records: conversations.records.len(),
        reply_chain_records: reply_chains.records.len(),
        read_marker_records: read_markers.records.len(),
        profile_records: profiles.records.len(),
        malformed_records: source_malformed,
        unclassified_records: conversations.unclassified
            + reply_chains.unclassified
            + read_markers.unclassified
            + profiles.unclassified,
        ..ExtractStats::default()
    };

    let resolved_conversations = resolve_by_id(conversations.records, "id", &mut stats)?;
    let resolved_chains = resolve_by_id(reply_chains.records, "id", &mut stats)?;
    let resolved_profiles = resolve_by_id(profiles.records, "mri", &mut stats)?;

    let directory = ProfileDirectory::from_records(resolved_profiles.values());
    let chains = collect_chains(&resolved_chains, &directory, &mut stats);
    let marker_horizons = collect_marker_horizons(&read_markers.records);

    let mut out = Vec::with_capacity(resolved_conversations.len());
    for (conv_id, record) in &resolved_conversations {
        let conversation = assemble(conv_id, record, &chains, &marker_horizons, config);
        out.push(conversation);
    }
    stats.conversations_resolved = out.len();

    // Data-driven exclusion of meeting sub-threads and system/internal
    // conversations, plus optionally hidden ones.
    let before = out.len();
    out.retain(|c| !is_filtered(c, config));
    stats.conversations_filtered = before - out.len();

    out.sort_by(|a, b| {
        b.last_message_time
            .cmp(&a.last_message_time)
            .then_with(|| a.id.cmp(&b.id))
    });

    info!(
        source = %source.describe(),
        conversations = out.len(),
        filtered = stats.conversations_filtered,
        malformed = stats.malformed_records,
        unclassified = stats.unclassified_records,
        "extraction pass complete"
    );

    Ok(Extraction {
        conversations: out,
        stats,
    })
}

/// Like [`extract`], filtered to conversations with unread content.
pub async fn unread_only(
    source: &dyn RecordSource,
    config: &Config,
) -> Result<Extraction, ExtractError> {
    let mut extraction = extract(source, config).await?;
    extraction.conversations.retain(Conversation::has_unread);
    Ok(extraction)
}

/// One domain's raw scan output.
struct DomainScan {
    records: Vec<RawRecord>,
    malformed: usize,
    unclassified: usize,
}

async fn scan_domain(
    source: &dyn RecordSource,
    classifier: &Classifier,
    domain: Domain,
) -> Result<DomainScan, ExtractError> {
    let mut records = Vec::new();
    let mut malformed = 0;
    let mut unclassified = 0;
    // Marker patterns may overlap; a record must enter the pass once.
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();

    for pattern in classifier.patterns(domain) {
        let scan = source.records(pattern).await?;
        malformed += scan.malformed;
        for record in scan.records {
            match classifier.classify(&record.store) {
                d if d == domain => {
                    if seen.insert((record.store.clone(), record.key.clone())) {
                        records.push(record);
                    }
                }
                Domain::Unclassified => {
                    debug!(store = %record.store, "dropping unclassified record");
                    unclassified += 1;
                }
                // Another domain's scan picks this record up under its own
                // markers.
                _ => {}
            }
        }
    }

    Ok(DomainScan {
        records,
        malformed,
        unclassified,
    })
}

/// Group records by a logical-id field (record key as fallback) and collapse
/// each group to its authoritative copy.
fn resolve_by_id(
    records: Vec<RawRecord>,
    id_field: &str,
    stats: &mut ExtractStats,
) -> Result<BTreeMap<String, RawRecord>, ExtractError> {
    let mut groups: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();
    for (arrival, record) in records.into_iter().enumerate() {
        let id = match record.str_field(id_field) {
            Some(id) => id.to_string(),
            None if !record.key.trim().is_empty() => record.key.clone(),
            None => {
                debug!(tag = %record.source_tag, "record without a logical id");
                stats.malformed_records += 1;
                continue;
            }
        };
        groups
            .entry(id)
            .or_default()
            .push(Candidate::new(record, arrival));
    }

    let mut resolved = BTreeMap::new();
    for (id, candidates) in groups {
        let record = resolve::resolve(&id, candidates)?;
        resolved.insert(id, record);
    }
    Ok(resolved)
}

/// Messages and horizon candidates contributed by reply chains, grouped by
/// conversation.
#[derive(Debug, Default)]
struct ChainData {
    /// Message id → message; the map deduplicates across chain copies.
    messages: BTreeMap<String, Message>,
    horizons: Vec<String>,
}

fn collect_chains(
    chains: &BTreeMap<String, RawRecord>,
    directory: &ProfileDirectory,
    stats: &mut ExtractStats,
) -> BTreeMap<String, ChainData> {
    let mut by_conversation: BTreeMap<String, ChainData> = BTreeMap::new();

    for record in chains.values() {
        let Some(conv_id) = record.str_field("conversationId") else {
            debug!(tag = %record.source_tag, "reply chain without conversationId");
            stats.malformed_records += 1;
            continue;
        };
        let data = by_conversation.entry(conv_id.to_string()).or_default();

        if let Some(horizon) = record.str_field("consumptionHorizon") {
            data.horizons.push(horizon.to_string());
        }

        let Some(message_map) = record.field("messageMap").as_map() else {
            continue;
        };
        for (message_id, raw_message) in message_map {
            if raw_message.as_map().is_none() {
                stats.malformed_records += 1;
                continue;
            }
            let message = parse_message(message_id, raw_message, conv_id, directory);
            // First resolved chain wins on duplicate message ids.
            data.messages.entry(message.id.clone()).or_insert(message);
        }
    }

    by_conversation
}

fn parse_message(
    message_id: &str,
    raw: &Value,
    conversation_id: &str,
    directory: &ProfileDirectory,
) -> Message {
    let sender_id = raw.str_field("from").unwrap_or("unknown").to_string();
    let sender_name = directory.display_name_for(&sender_id, raw);
    let (content, content_type) = normalize::content(raw);
    let timestamp = normalize::timestamp(raw.get("originalArrivalTimestamp"));

    Message {
        id: message_id.to_string(),
        conversation_id: conversation_id.to_string(),
        sender_id,
        sender_name,
        content,
        content_type,
        timestamp,
        is_unread: false,
    }
}

/// Horizon strings from the legacy read-marker stores, per conversation, in
/// snapshot order. The unread layer takes the maximum across candidates, so
/// no version resolution is needed here.
fn collect_marker_horizons(records: &[RawRecord]) -> BTreeMap<String, Vec<String>> {
    let mut horizons: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for record in records {
        let (Some(conv_id), Some(horizon)) = (
            record.str_field("conversationId"),
            record.str_field("consumptionHorizon"),
        ) else {
            continue;
        };
        horizons
            .entry(conv_id.to_string())
            .or_default()
            .push(horizon.to_string());
    }
    horizons
}

fn assemble(
    conv_id: &str,
    record: &RawRecord,
    chains: &BTreeMap<String, ChainData>,
    marker_horizons: &BTreeMap<String, Vec<String>>,
    config: &Config,
) -> Conversation {
    let thread_type = normalize::thread_type(record, conv_id, &config.filters.system_id_markers);
    let title = normalize::title(record, thread_type, conv_id);

    let props = record.field("threadProperties");
    let is_read_flag = props.bool_field("isRead");
    let hidden = props.bool_field("hidden").unwrap_or(false);
    let last_message_time = normalize::timestamp(record.field("lastMessageTimeUtc"));

    // Horizon candidates in source priority order: read markers, reply
    // chains, then the conversation's own properties.
    let mut horizons: Vec<String> = Vec::new();
    if let Some(marked) = marker_horizons.get(conv_id) {
        horizons.extend(marked.iter().cloned());
    }
    let mut messages: Vec<Message> = Vec::new();
    if let Some(chain) = chains.get(conv_id) {
        horizons.extend(chain.horizons.iter().cloned());
        messages.extend(chain.messages.values().cloned());
    }
    if let Some(own) = record.field("properties").str_field("consumptionhorizon") {
        horizons.push(own.to_string());
    }

    // Total message order: timestamp ascending, ties by id.
    messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

    let unread_count = unread::classify(&horizons, is_read_flag, last_message_time, &mut messages);

    Conversation {
        id: conv_id.to_string(),
        title,
        thread_type,
        last_message_time,
        is_read_flag,
        hidden,
        horizons,
        messages,
        unread_count,
    }
}

fn is_filtered(conversation: &Conversation, config: &Config) -> bool {
    let id_lower = conversation.id.to_ascii_lowercase();
    let matches = |markers: &[String]| {
        markers
            .iter()
            .any(|m| id_lower.contains(&m.to_ascii_lowercase()))
    };
    if matches(&config.filters.meeting_id_markers) || matches(&config.filters.system_id_markers) {
        return true;
    }
    config.filters.exclude_hidden && conversation.hidden
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Timestamp;
    use crate::source::{record_from_json, MemorySource};

    fn conversation_record(id: &str, json: serde_json::Value) -> RawRecord {
        record_from_json("Client:conversation-manager-en", id, "test", &json).unwrap()
    }

    fn chain_record(key: &str, json: serde_json::Value) -> RawRecord {
        record_from_json("Client:replychain-manager-en", key, "test", &json).unwrap()
    }

    fn source_with(records: Vec<RawRecord>) -> MemorySource {
        MemorySource::new(records)
    }

    #[tokio::test]
    async fn test_messages_attach_sorted_and_deduplicated() {
        let source = source_with(vec![
            conversation_record(
                "19:chat",
                serde_json::json!({ "id": "19:chat", "version": 1, "lastMessageTimeUtc": 200 }),
            ),
            chain_record(
                "chain-a",
                serde_json::json!({
                    "id": "chain-a",
                    "conversationId": "19:chat",
                    "messageMap": {
                        "m2": { "from": "8:u", "content": "later", "originalArrivalTimestamp": 200 },
                        "m1": { "from": "8:u", "content": "earlier", "originalArrivalTimestamp": 100 }
                    }
                }),
            ),
            chain_record(
                "chain-b",
                serde_json::json!({
                    "id": "chain-b",
                    "conversationId": "19:chat",
                    "messageMap": {
                        "m2": { "from": "8:u", "content": "duplicate copy", "originalArrivalTimestamp": 200 }
                    }
                }),
            ),
        ]);

        let extraction = extract(&source, &Config::default()).await.unwrap();
        assert_eq!(extraction.conversations.len(), 1);
        let conv = &extraction.conversations[0];
        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.messages[0].id, "m1");
        assert_eq!(conv.messages[1].id, "m2");
        assert_eq!(conv.messages[1].content, "later");
    }

    #[tokio::test]
    async fn test_meeting_marker_filtered_out() {
        let source = source_with(vec![
            conversation_record(
                "19:meeting_abc@thread.v2",
                serde_json::json!({ "id": "19:meeting_abc@thread.v2", "version": 1 }),
            ),
            conversation_record(
                "19:keep",
                serde_json::json!({ "id": "19:keep", "version": 1 }),
            ),
        ]);

        let extraction = extract(&source, &Config::default()).await.unwrap();
        assert_eq!(extraction.conversations.len(), 1);
        assert_eq!(extraction.conversations[0].id, "19:keep");
        assert_eq!(extraction.stats.conversations_filtered, 1);
    }

    #[tokio::test]
    async fn test_newest_first_with_unknown_last() {
        let source = source_with(vec![
            conversation_record(
                "19:old",
                serde_json::json!({ "id": "19:old", "version": 1, "lastMessageTimeUtc": 100 }),
            ),
            conversation_record(
                "19:new",
                serde_json::json!({ "id": "19:new", "version": 1, "lastMessageTimeUtc": 200 }),
            ),
            conversation_record(
                "19:timeless",
                serde_json::json!({ "id": "19:timeless", "version": 1 }),
            ),
        ]);

        let extraction = extract(&source, &Config::default()).await.unwrap();
        let ids: Vec<_> = extraction.conversations.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["19:new", "19:old", "19:timeless"]);
        assert_eq!(
            extraction.conversations[2].last_message_time,
            Timestamp::Unknown
        );
    }

    #[tokio::test]
    async fn test_unread_only_filters() {
        let source = source_with(vec![
            conversation_record(
                "19:read",
                serde_json::json!({
                    "id": "19:read", "version": 1,
                    "threadProperties": { "isRead": true }
                }),
            ),
            conversation_record(
                "19:unread",
                serde_json::json!({
                    "id": "19:unread", "version": 1,
                    "threadProperties": { "isRead": false }
                }),
            ),
        ]);

        let extraction = unread_only(&source, &Config::default()).await.unwrap();
        assert_eq!(extraction.conversations.len(), 1);
        assert_eq!(extraction.conversations[0].id, "19:unread");
        assert_eq!(extraction.conversations[0].unread_count, 1);
    }

    #[tokio::test]
    async fn test_unrelated_stores_counted_not_fatal() {
        let mut records = vec![conversation_record(
            "19:chat",
            serde_json::json!({ "id": "19:chat", "version": 1 }),
        )];
        // A store no marker matches: never scanned, never fatal.
        records.push(
            record_from_json(
                "Client:call-history",
                "x",
                "test",
                &serde_json::json!({ "anything": 1 }),
            )
            .unwrap(),
        );
        let source = source_with(records);

        let extraction = extract(&source, &Config::default()).await.unwrap();
        assert_eq!(extraction.conversations.len(), 1);
    }
}
