//! Loosely-typed record values.
//!
//! The persistence layer this engine reads is schema-drifting: fields come
//! and go between client versions, change type, or hold placeholder values.
//! [`Value`] models that reality as a tagged union with a first-class
//! [`Value::Missing`] variant, so every lookup has a well-defined answer and
//! no accessor can panic. An explicit "undefined" marker in the source and a
//! plain absent key normalize to the same `Missing`.

use std::collections::BTreeMap;

use base64::Engine as _;

/// A single field value from a raw store record.
///
/// `Map` uses a `BTreeMap` so that iteration order, and therefore every
/// downstream tie-break that walks fields, is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Num(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    Map(BTreeMap<String, Value>),
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Look up a key in a map value. Non-map values and absent keys both
    /// answer with `Missing`.
    pub fn get(&self, key: &str) -> &Value {
        match self {
            Value::Map(map) => map.get(key).unwrap_or(&Value::Missing),
            _ => &Value::Missing,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view: numbers directly, numeric strings parsed.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            Value::Str(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Boolean view: booleans directly, `"true"`/`"false"` strings, and
    /// numbers as non-zero.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Str(s) => match s.to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            Value::Num(n) => Some(*n != 0.0),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Textual view: strings pass through, bytes decode as UTF-8 with
    /// replacement characters on invalid sequences.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s.clone()),
            Value::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            _ => None,
        }
    }

    /// Non-empty string field lookup. Empty and whitespace-only strings are
    /// treated as placeholders, i.e. missing.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).as_str().filter(|s| !s.trim().is_empty())
    }

    pub fn num_field(&self, key: &str) -> Option<f64> {
        self.get(key).as_num()
    }

    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.get(key).as_bool()
    }

    /// Text field lookup through [`Value::as_text`], filtering placeholders.
    pub fn text_field(&self, key: &str) -> Option<String> {
        self.get(key).as_text().filter(|s| !s.trim().is_empty())
    }
}

/// Marker key for byte payloads in JSONL snapshot dumps.
const BYTES_MARKER: &str = "$bytes";
/// Marker key for the store's explicit "undefined" value.
const UNDEFINED_MARKER: &str = "$undefined";

/// Convert a JSON value from a snapshot dump into a [`Value`].
///
/// `null` and the explicit undefined marker normalize to `Missing`. Byte
/// payloads arrive base64-encoded under the `$bytes` marker. Shapes the
/// union cannot represent (arrays, non-finite numbers) also normalize to
/// `Missing`; the fallback chains downstream treat them as absent fields.
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Missing,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() => Value::Num(f),
            _ => Value::Missing,
        },
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(_) => Value::Missing,
        serde_json::Value::Object(map) => {
            if map.contains_key(UNDEFINED_MARKER) {
                return Value::Missing;
            }
            if let Some(serde_json::Value::String(b64)) = map.get(BYTES_MARKER) {
                return match base64::engine::general_purpose::STANDARD.decode(b64) {
                    Ok(bytes) => Value::Bytes(bytes),
                    Err(_) => Value::Missing,
                };
            }
            let mut out = BTreeMap::new();
            for (k, v) in map {
                out.insert(k.clone(), from_json(v));
            }
            Value::Map(out)
        }
    }
}

/// Convert a JSON object into a record field map. Non-objects yield `None`.
pub fn fields_from_json(json: &serde_json::Value) -> Option<BTreeMap<String, Value>> {
    match from_json(json) {
        Value::Map(map) => Some(map),
        _ => None,
    }
}
