use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Root configuration. Every section has working defaults, so the engine
/// runs without a config file at all.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub markers: MarkersConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

/// Store-name markers that route raw records to a logical domain.
///
/// Matching is substring-based: real store names embed volatile suffixes
/// (locale, user id, client build) that must be ignored. The read-marker set
/// is consulted before the reply-chain set, so keep the legacy-metadata
/// markers specific enough to not shadow reply chains.
#[derive(Debug, Deserialize, Clone)]
pub struct MarkersConfig {
    #[serde(default = "default_conversation_markers")]
    pub conversation: Vec<String>,
    #[serde(default = "default_reply_chain_markers")]
    pub reply_chain: Vec<String>,
    #[serde(default = "default_read_marker_markers")]
    pub read_marker: Vec<String>,
    #[serde(default = "default_profile_markers")]
    pub profile: Vec<String>,
}

impl Default for MarkersConfig {
    fn default() -> Self {
        Self {
            conversation: default_conversation_markers(),
            reply_chain: default_reply_chain_markers(),
            read_marker: default_read_marker_markers(),
            profile: default_profile_markers(),
        }
    }
}

fn default_conversation_markers() -> Vec<String> {
    vec!["conversation-manager".to_string()]
}

fn default_reply_chain_markers() -> Vec<String> {
    vec!["replychain-manager".to_string()]
}

fn default_read_marker_markers() -> Vec<String> {
    vec!["replychain-metadata".to_string()]
}

fn default_profile_markers() -> Vec<String> {
    vec!["profiles".to_string()]
}

/// Data-driven aggregator filters: conversations whose id matches any of
/// these substring predicates are dropped from the final listing.
#[derive(Debug, Deserialize, Clone)]
pub struct FiltersConfig {
    /// Meeting sub-thread id markers.
    #[serde(default = "default_meeting_markers")]
    pub meeting_id_markers: Vec<String>,
    /// System/internal conversation id markers (service notifications, bot
    /// plumbing).
    #[serde(default = "default_system_markers")]
    pub system_id_markers: Vec<String>,
    /// Drop conversations the client has hidden/archived.
    #[serde(default)]
    pub exclude_hidden: bool,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            meeting_id_markers: default_meeting_markers(),
            system_id_markers: default_system_markers(),
            exclude_hidden: false,
        }
    }
}

fn default_meeting_markers() -> Vec<String> {
    vec!["meeting_".to_string()]
}

fn default_system_markers() -> Vec<String> {
    vec!["48:".to_string(), "28:".to_string()]
}

/// Snapshot capture settings.
#[derive(Debug, Deserialize, Clone)]
pub struct SnapshotConfig {
    /// File names skipped when copying a live store. The lock file signals
    /// an active writer and must never travel with the copy.
    #[serde(default = "default_snapshot_skip")]
    pub skip_files: Vec<String>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            skip_files: default_snapshot_skip(),
        }
    }
}

fn default_snapshot_skip() -> Vec<String> {
    vec!["LOCK".to_string(), "*.lock".to_string()]
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate markers: an empty set would silently drop a whole domain.
    if config.markers.conversation.is_empty() {
        anyhow::bail!("markers.conversation must not be empty");
    }
    if config.markers.reply_chain.is_empty() {
        anyhow::bail!("markers.reply_chain must not be empty");
    }
    if config.markers.profile.is_empty() {
        anyhow::bail!("markers.profile must not be empty");
    }
    if config
        .markers
        .conversation
        .iter()
        .chain(&config.markers.reply_chain)
        .chain(&config.markers.read_marker)
        .chain(&config.markers.profile)
        .any(|m| m.trim().is_empty())
    {
        anyhow::bail!("store-name markers must not be blank");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_all_domains() {
        let cfg = Config::default();
        assert!(!cfg.markers.conversation.is_empty());
        assert!(!cfg.markers.reply_chain.is_empty());
        assert!(!cfg.markers.read_marker.is_empty());
        assert!(!cfg.markers.profile.is_empty());
        assert!(!cfg.filters.exclude_hidden);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [filters]
            exclude_hidden = true
            "#,
        )
        .unwrap();
        assert!(cfg.filters.exclude_hidden);
        assert_eq!(cfg.markers.profile, vec!["profiles".to_string()]);
        assert_eq!(
            cfg.snapshot.skip_files,
            vec!["LOCK".to_string(), "*.lock".to_string()]
        );
    }
}
