//! `UploadOutcome` — per-file transfer result, spec §3 and §8.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::RelayAck;

/// Outcome of uploading a blob to one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerUploadResult {
    /// The server already had the blob (HEAD hit) or accepted the PUT.
    Accepted,
    /// The server rejected the upload (auth failure, size limit, etc).
    Rejected { reason: String },
    /// The server could not be reached, or was skipped because its
    /// circuit breaker had tripped (spec 4.G).
    Unavailable { detail: String },
}

impl ServerUploadResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ServerUploadResult::Accepted)
    }
}

/// Per-file record of a transfer attempt: whether the blob landed on
/// enough servers, and whether the manifest event describing it was
/// published (spec §3/§8: "a file counts as fully synced iff it has
/// landed on at least one server AND its manifest event was accepted by
/// at least one relay").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub path: String,
    pub digest: String,
    pub per_server: BTreeMap<String, ServerUploadResult>,
    pub event_published: bool,
    pub per_relay: BTreeMap<String, RelayAck>,
}

impl UploadOutcome {
    pub fn new(path: impl Into<String>, digest: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            digest: digest.into(),
            per_server: BTreeMap::new(),
            event_published: false,
            per_relay: BTreeMap::new(),
        }
    }

    /// At least one server accepted the blob.
    pub fn has_blob_on_any_server(&self) -> bool {
        self.per_server.values().any(ServerUploadResult::is_accepted)
    }

    /// At least one relay accepted the manifest event.
    pub fn has_event_on_any_relay(&self) -> bool {
        self.per_relay.values().any(RelayAck::is_accepted)
    }

    /// Fully synced per spec §8: blob landed somewhere AND the manifest
    /// event was accepted somewhere.
    pub fn is_fully_synced(&self) -> bool {
        self.has_blob_on_any_server() && self.has_event_on_any_relay()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_synced_requires_both_blob_and_event() {
        let mut outcome = UploadOutcome::new("/a.txt", "deadbeef");
        assert!(!outcome.is_fully_synced());

        outcome
            .per_server
            .insert("https://s1".into(), ServerUploadResult::Accepted);
        assert!(!outcome.is_fully_synced());

        outcome
            .per_relay
            .insert("wss://r1".into(), RelayAck::Accepted);
        assert!(outcome.is_fully_synced());
    }

    #[test]
    fn rejected_servers_do_not_count_as_landed() {
        let mut outcome = UploadOutcome::new("/a.txt", "deadbeef");
        outcome.per_server.insert(
            "https://s1".into(),
            ServerUploadResult::Rejected { reason: "too large".into() },
        );
        assert!(!outcome.has_blob_on_any_server());
    }
}
