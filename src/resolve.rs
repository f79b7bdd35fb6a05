//! Multi-source version conflict resolution.
//!
//! The origin application stores the same logical record redundantly, and
//! copies disagree. Collapsing them is an explicit, total ordering function
//! rather than inline comparisons, so the tie-break behavior is verifiable
//! on its own:
//!
//! 1. highest `max(version, detailsVersion, threadVersion)`; a missing key
//!    always loses to a present one;
//! 2. on a tie, an explicit `isRead == false` beats `true` or absent, since
//!    surfacing a stale "read" state is the worse failure mode;
//! 3. then the copy with more populated fields;
//! 4. then stable input order.
//!
//! Step 4 bottoms the chain out in a unique criterion, which is what makes
//! resolution idempotent. Two distinct candidates comparing equal would be
//! an internal defect and is surfaced as [`ExtractError::AmbiguousResolution`].

use std::cmp::Ordering;

use crate::error::ExtractError;
use crate::source::RawRecord;

/// A raw record tagged with its extracted ordering keys and arrival index.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub record: RawRecord,
    version: Option<f64>,
    details_version: Option<f64>,
    thread_version: Option<f64>,
    arrival: usize,
}

impl Candidate {
    pub fn new(record: RawRecord, arrival: usize) -> Self {
        let version = version_key(&record, "version");
        let details_version = version_key(&record, "detailsVersion");
        let thread_version = version_key(&record, "threadVersion");
        Self {
            record,
            version,
            details_version,
            thread_version,
            arrival,
        }
    }

    /// The candidate's ordering key: the largest present version field, or
    /// the minimum possible value when none is present.
    fn ordering_key(&self) -> f64 {
        [self.version, self.details_version, self.thread_version]
            .into_iter()
            .flatten()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Whether thread metadata explicitly flags the record unread.
    fn explicitly_unread(&self) -> bool {
        self.record
            .field("threadProperties")
            .bool_field("isRead")
            .map(|read| !read)
            .unwrap_or(false)
    }

    /// Count of populated (non-missing) top-level fields.
    fn populated(&self) -> usize {
        self.record
            .fields
            .values()
            .filter(|v| !v.is_missing())
            .count()
    }
}

fn version_key(record: &RawRecord, field: &str) -> Option<f64> {
    record.field(field).as_num().filter(|n| n.is_finite())
}

/// Strict total order over candidates of one logical id. `Greater` means
/// more authoritative.
pub fn precedence(a: &Candidate, b: &Candidate) -> Ordering {
    // NaN is filtered at key extraction, so partial_cmp cannot fail here.
    match a
        .ordering_key()
        .partial_cmp(&b.ordering_key())
        .unwrap_or(Ordering::Equal)
    {
        Ordering::Equal => {}
        other => return other,
    }
    match a.explicitly_unread().cmp(&b.explicitly_unread()) {
        Ordering::Equal => {}
        other => return other,
    }
    match a.populated().cmp(&b.populated()) {
        Ordering::Equal => {}
        other => return other,
    }
    // Earlier arrival wins, so later arrival orders lower.
    b.arrival.cmp(&a.arrival)
}

/// Collapse all candidates of one logical id into the authoritative record.
pub fn resolve(id: &str, candidates: Vec<Candidate>) -> Result<RawRecord, ExtractError> {
    let mut best: Option<Candidate> = None;
    for candidate in candidates {
        best = Some(match best.take() {
            None => candidate,
            Some(current) => match precedence(&candidate, &current) {
                Ordering::Greater => candidate,
                Ordering::Less => current,
                Ordering::Equal => {
                    return Err(ExtractError::AmbiguousResolution { id: id.to_string() })
                }
            },
        });
    }
    best.map(|c| c.record)
        .ok_or_else(|| ExtractError::AmbiguousResolution { id: id.to_string() })
}
