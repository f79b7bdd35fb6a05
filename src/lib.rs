//! # chatsift
//!
//! A local-first conversation extraction and unread-detection engine for
//! desktop chat clients.
//!
//! chatsift reconstructs a consistent, deduplicated view (conversations,
//! messages, user profiles, unread state) from a snapshot of the
//! browser-style key-value store a desktop chat client keeps on disk. The
//! store's schema drifts between client versions, the same logical record is
//! stored redundantly, and timestamps arrive in several formats; the engine
//! resolves all of that deterministically and never mutates the source.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌────────────┐   ┌───────────┐   ┌────────────┐
//! │ RecordSource │──▶│ Classifier │──▶│ Resolver  │──▶│ Normalizer │
//! │ (snapshot)   │   │ by store   │   │ per id    │   │ fallbacks  │
//! └─────────────┘   └────────────┘   └───────────┘   └─────┬──────┘
//!                                                          ▼
//!                                      ┌──────────────────────────┐
//!                                      │ Unread + Enrich + Order  │
//!                                      └──────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```bash
//! sift discover                       # find store locations
//! sift snapshot <store-dir>           # capture a lock-free copy
//! sift list --snapshot dump.jsonl     # all conversations
//! sift unread --snapshot dump.jsonl   # unread only
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration (markers, filters, snapshot) |
//! | [`value`] | Loosely-typed record values with explicit missing state |
//! | [`source`] | Record sources: in-memory and JSONL snapshot dumps |
//! | [`classify`] | Store-name → domain routing |
//! | [`resolve`] | Multi-source version conflict resolution |
//! | [`normalize`] | Title/timestamp/content fallback chains |
//! | [`unread`] | Layered unread detection |
//! | [`profile`] | Sender profile enrichment |
//! | [`extract`] | The extraction pass and its entry points |
//! | [`discovery`] | Cross-platform store location discovery |
//! | [`snapshot`] | Lock-free snapshot capture |

pub mod classify;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod models;
pub mod normalize;
pub mod profile;
pub mod resolve;
pub mod snapshot;
pub mod source;
pub mod unread;
pub mod value;

pub use error::ExtractError;
pub use extract::{extract, unread_only, Extraction};
pub use models::{Conversation, ExtractStats, Message, Timestamp, UserProfile};
