//! Sender profile enrichment.
//!
//! A read-only directory of resolved user profiles, built once per
//! extraction pass and passed by reference wherever sender names are
//! needed. Lookups never fail: a missing profile simply leaves the raw
//! sender identifier in place, since unsynced profile records are routine.

use std::collections::BTreeMap;

use crate::models::UserProfile;
use crate::source::RawRecord;
use crate::value::Value;

/// Immutable mri → profile map for one pass.
#[derive(Debug, Default)]
pub struct ProfileDirectory {
    profiles: BTreeMap<String, UserProfile>,
}

impl ProfileDirectory {
    /// Build the directory from resolved profile records.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a RawRecord>) -> Self {
        let mut profiles = BTreeMap::new();
        for record in records {
            let mri = record
                .str_field("mri")
                .unwrap_or(record.key.as_str())
                .to_string();
            if mri.is_empty() {
                continue;
            }
            let display_name = record
                .str_field("displayName")
                .unwrap_or("Unknown")
                .to_string();
            let mail = record.str_field("mail").map(str::to_string);
            profiles.insert(
                mri.clone(),
                UserProfile {
                    mri,
                    display_name,
                    mail,
                },
            );
        }
        Self { profiles }
    }

    pub fn get(&self, mri: &str) -> Option<&UserProfile> {
        self.profiles.get(mri)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Resolve a sender display name.
    ///
    /// Chain: directory hit → the message record's own `imDisplayName` →
    /// the raw sender id. Never empty, never an error.
    pub fn display_name_for(&self, sender_mri: &str, message: &Value) -> String {
        if let Some(profile) = self.profiles.get(sender_mri) {
            return profile.display_name.clone();
        }
        if let Some(inline) = message.str_field("imDisplayName") {
            return inline.to_string();
        }
        sender_mri.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::record_from_json;

    fn directory() -> ProfileDirectory {
        let record = record_from_json(
            "profiles",
            "8:orgid:jane",
            "test",
            &serde_json::json!({
                "mri": "8:orgid:jane",
                "displayName": "Jane Doe",
                "mail": "jane@example.com"
            }),
        )
        .unwrap();
        ProfileDirectory::from_records([&record])
    }

    #[test]
    fn test_lookup_hit() {
        let dir = directory();
        let name = dir.display_name_for("8:orgid:jane", &Value::Missing);
        assert_eq!(name, "Jane Doe");
        assert_eq!(dir.get("8:orgid:jane").unwrap().mail.as_deref(), Some("jane@example.com"));
    }

    #[test]
    fn test_miss_uses_inline_name_then_raw_id() {
        let dir = directory();
        let msg = record_from_json(
            "chains",
            "m",
            "test",
            &serde_json::json!({ "imDisplayName": "John Q" }),
        )
        .unwrap()
        .as_value();
        assert_eq!(dir.display_name_for("8:orgid:john", &msg), "John Q");
        assert_eq!(
            dir.display_name_for("8:orgid:john", &Value::Missing),
            "8:orgid:john"
        );
    }

    #[test]
    fn test_record_key_stands_in_for_missing_mri() {
        let record = record_from_json(
            "profiles",
            "8:orgid:keyed",
            "test",
            &serde_json::json!({ "displayName": "Keyed" }),
        )
        .unwrap();
        let dir = ProfileDirectory::from_records([&record]);
        assert_eq!(dir.get("8:orgid:keyed").unwrap().display_name, "Keyed");
    }
}
