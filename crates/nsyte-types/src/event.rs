//! Signed event shapes — spec §3 and §4.F.
//!
//! These are the data-only descriptions of what must be built and signed;
//! `nsyte-relay` does the actual building (with `nostr::EventBuilder`) and
//! signing (through `nsyte-signer::Signer`). Keeping the shapes here, rather
//! than in `nsyte-relay`, lets `nsyte-diff` and `nsyte-core` reason about
//! "what a manifest event means" without depending on the relay/nostr stack.

use serde::{Deserialize, Serialize};

/// A publisher's replaceable file-manifest record (kind [`crate::NSITE_KIND`]).
///
/// Invariant: the newest event per `d` (path) IS the current site's entry
/// for that path; multiple events with the same `(author, d)` are resolved
/// by largest `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEventRecord {
    pub event_id: String,
    pub pubkey: String,
    pub created_at: i64,
    /// `d` tag: site path.
    pub path: String,
    /// `x` tag: lowercase hex SHA-256 digest of the blob at `path`.
    pub digest: String,
    /// Relays this event was observed on.
    pub found_on_relays: Vec<String>,
}

/// What a Delete event tombstones: the set of manifest event ids it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteEventRecord {
    pub event_id: String,
    pub tombstoned_event_ids: Vec<String>,
}

/// The publisher's chosen server set (kind [`crate::SERVER_LIST_KIND`]).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServerListRecord {
    pub servers: Vec<String>,
}

/// The publisher's preferred relays (kind [`crate::RELAY_LIST_KIND`]),
/// each tagged with read/write markers (NIP-65).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelayListRecord {
    pub relays: Vec<RelayListEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayListEntry {
    pub url: String,
    pub read: bool,
    pub write: bool,
}

/// Profile JSON payload (kind [`crate::PROFILE_KIND`]).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Raw JSON content string, as nsyte neither validates nor enriches it
    /// beyond what the caller supplied (spec 4.F: "Content: JSON profile
    /// object").
    pub content_json: String,
}

/// Outcome of dispatching one event to one relay (spec 4.F).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayAck {
    /// `ok=true` from the relay.
    Accepted,
    /// `ok=false`, with the relay-supplied reason.
    Rejected { reason: String },
    /// The relay could not be reached or the round trip errored out.
    ConnectionError { detail: String },
}

impl RelayAck {
    pub fn is_accepted(&self) -> bool {
        matches!(self, RelayAck::Accepted)
    }
}

/// Per-relay outcome map for one published event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicationReport {
    pub per_relay: std::collections::BTreeMap<String, RelayAck>,
}

impl PublicationReport {
    /// An event is "published" when at least one relay accepted it
    /// (spec 4.F).
    pub fn is_published(&self) -> bool {
        self.per_relay.values().any(RelayAck::is_accepted)
    }

    pub fn accepted_count(&self) -> usize {
        self.per_relay.values().filter(|a| a.is_accepted()).count()
    }

    pub fn rejected_count(&self) -> usize {
        self.per_relay
            .values()
            .filter(|a| matches!(a, RelayAck::Rejected { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn published_requires_at_least_one_accept() {
        let mut report = PublicationReport::default();
        report.per_relay.insert(
            "wss://r1".into(),
            RelayAck::Rejected { reason: "blocked".into() },
        );
        assert!(!report.is_published());

        report
            .per_relay
            .insert("wss://r2".into(), RelayAck::Accepted);
        assert!(report.is_published());
        assert_eq!(report.accepted_count(), 1);
        assert_eq!(report.rejected_count(), 1);
    }
}
