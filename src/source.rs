//! Raw record sources.
//!
//! A [`RecordSource`] yields the raw `(store, key, value)` triples of one
//! persistence-layer snapshot. Sources are finite and restartable: iterating
//! the same pattern twice over the same snapshot reproduces the same
//! sequence, which is what makes extraction idempotent and testable.
//!
//! Two implementations ship with the crate: [`MemorySource`] for tests and
//! embedders that already hold records, and [`JsonlSource`] for snapshot
//! dump files produced by an external store reader.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::ExtractError;
use crate::value::{self, Value};

/// One raw record from the persistence layer. Ephemeral: owned by a single
/// extraction pass and discarded at its end.
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// Full store name, volatile suffixes included.
    pub store: String,
    /// The record's own store key.
    pub key: String,
    /// Provenance label for diagnostics (dump name, line number, ...).
    pub source_tag: String,
    pub fields: BTreeMap<String, Value>,
}

impl RawRecord {
    /// Field lookup as a [`Value`] view over the whole record.
    pub fn field(&self, key: &str) -> &Value {
        self.fields.get(key).unwrap_or(&Value::Missing)
    }

    /// Non-empty string field, treating placeholders as missing.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key).as_str().filter(|s| !s.trim().is_empty())
    }

    pub fn as_value(&self) -> Value {
        Value::Map(self.fields.clone())
    }
}

/// The result of scanning one store-name pattern.
#[derive(Debug, Default)]
pub struct Scan {
    pub records: Vec<RawRecord>,
    /// Entries that could not be parsed into a record. Counted, not fatal.
    pub malformed: usize,
}

/// A snapshot-backed record source.
///
/// `records` must be restartable per call: the same pattern over the same
/// snapshot yields the same sequence in the same order.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Human-readable description for diagnostics.
    fn describe(&self) -> String;

    /// Return all records whose store name contains `pattern` (every record
    /// when the pattern is empty), in stable snapshot order.
    async fn records(&self, pattern: &str) -> Result<Scan, ExtractError>;
}

/// In-memory source over a fixed record list.
#[derive(Debug, Default)]
pub struct MemorySource {
    records: Vec<RawRecord>,
}

impl MemorySource {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: RawRecord) {
        self.records.push(record);
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    fn describe(&self) -> String {
        format!("memory ({} records)", self.records.len())
    }

    async fn records(&self, pattern: &str) -> Result<Scan, ExtractError> {
        let records = self
            .records
            .iter()
            .filter(|r| pattern.is_empty() || r.store.contains(pattern))
            .cloned()
            .collect();
        Ok(Scan {
            records,
            malformed: 0,
        })
    }
}

/// Source over a JSONL snapshot dump.
///
/// Each line is one JSON object: `{"store": "...", "key": ..., "value":
/// {...}}`. The file is re-read on every call, so the sequence is exactly as
/// stable as the file itself. Unparseable lines and lines whose value is not
/// an object are counted as malformed and skipped.
#[derive(Debug, Clone)]
pub struct JsonlSource {
    path: PathBuf,
}

impl JsonlSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSource for JsonlSource {
    fn describe(&self) -> String {
        format!("jsonl:{}", self.path.display())
    }

    async fn records(&self, pattern: &str) -> Result<Scan, ExtractError> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ExtractError::snapshot(&self.path, e))?;

        let mut scan = Scan::default();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line, &self.path, line_no) {
                Some(record) => {
                    if pattern.is_empty() || record.store.contains(pattern) {
                        scan.records.push(record);
                    }
                }
                None => {
                    debug!(line = line_no + 1, path = %self.path.display(), "skipping malformed dump line");
                    scan.malformed += 1;
                }
            }
        }
        Ok(scan)
    }
}

fn parse_line(line: &str, path: &Path, line_no: usize) -> Option<RawRecord> {
    let json: serde_json::Value = serde_json::from_str(line).ok()?;
    let store = json.get("store")?.as_str()?.to_string();
    let key = match json.get("key") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => return None,
    };
    let fields = value::fields_from_json(json.get("value")?)?;

    Some(RawRecord {
        store,
        key,
        source_tag: format!("{}:{}", path.display(), line_no + 1),
        fields,
    })
}

/// Build a record for tests and embedders from a JSON object literal.
pub fn record_from_json(
    store: &str,
    key: &str,
    source_tag: &str,
    json: &serde_json::Value,
) -> Option<RawRecord> {
    Some(RawRecord {
        store: store.to_string(),
        key: key.to_string(),
        source_tag: source_tag.to_string(),
        fields: value::fields_from_json(json)?,
    })
}
