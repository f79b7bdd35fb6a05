//! Store-name record classification.
//!
//! The persistence layer holds dozens of stores, most of them unrelated to
//! conversations, and the interesting ones carry volatile suffixes (locale,
//! user id, client build). Routing is therefore substring matching against a
//! configured marker set per domain.

use crate::config::MarkersConfig;

/// Logical domain a raw record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Conversation,
    ReplyChain,
    ReadMarker,
    Profile,
    Unclassified,
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Domain::Conversation => "conversation",
            Domain::ReplyChain => "reply-chain",
            Domain::ReadMarker => "read-marker",
            Domain::Profile => "profile",
            Domain::Unclassified => "unclassified",
        };
        write!(f, "{}", s)
    }
}

/// Routes store names to domains.
#[derive(Debug, Clone)]
pub struct Classifier {
    conversation: Vec<String>,
    reply_chain: Vec<String>,
    read_marker: Vec<String>,
    profile: Vec<String>,
}

impl Classifier {
    pub fn new(markers: &MarkersConfig) -> Self {
        Self {
            conversation: markers.conversation.clone(),
            reply_chain: markers.reply_chain.clone(),
            read_marker: markers.read_marker.clone(),
            profile: markers.profile.clone(),
        }
    }

    /// Classify a store name.
    ///
    /// Read-marker markers are checked before reply-chain markers: the
    /// legacy metadata stores share a name stem with reply chains and must
    /// win on their more specific markers.
    pub fn classify(&self, store: &str) -> Domain {
        if matches(store, &self.read_marker) {
            Domain::ReadMarker
        } else if matches(store, &self.conversation) {
            Domain::Conversation
        } else if matches(store, &self.reply_chain) {
            Domain::ReplyChain
        } else if matches(store, &self.profile) {
            Domain::Profile
        } else {
            Domain::Unclassified
        }
    }

    /// The marker patterns that select records for `domain` at the source.
    pub fn patterns(&self, domain: Domain) -> &[String] {
        match domain {
            Domain::Conversation => &self.conversation,
            Domain::ReplyChain => &self.reply_chain,
            Domain::ReadMarker => &self.read_marker,
            Domain::Profile => &self.profile,
            Domain::Unclassified => &[],
        }
    }
}

fn matches(store: &str, markers: &[String]) -> bool {
    markers.iter().any(|m| store.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(&MarkersConfig::default())
    }

    #[test]
    fn test_volatile_suffixes_ignored() {
        let c = classifier();
        assert_eq!(
            c.classify("Client:conversation-manager-en-US-v2"),
            Domain::Conversation
        );
        assert_eq!(c.classify("Client:profiles_user_0042"), Domain::Profile);
    }

    #[test]
    fn test_metadata_beats_reply_chain() {
        let c = classifier();
        // The metadata store name also contains the reply-chain stem once
        // markers are loose; the priority order must still route it as a
        // read marker.
        assert_eq!(
            c.classify("Client:replychain-metadata-manager"),
            Domain::ReadMarker
        );
        assert_eq!(
            c.classify("Client:replychain-manager-0"),
            Domain::ReplyChain
        );
    }

    #[test]
    fn test_unrelated_store_unclassified() {
        let c = classifier();
        assert_eq!(c.classify("Client:call-history"), Domain::Unclassified);
    }
}
