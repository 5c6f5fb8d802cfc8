//! `RunSummary` — aggregate counts for one pipeline run, spec §6/§8.

use serde::{Deserialize, Serialize};

use crate::outcome::UploadOutcome;

/// Aggregate result of one full pipeline run (spec §6: what the CLI
/// prints and what decides the process exit code).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub files_scanned: usize,
    pub files_unchanged: usize,
    pub files_transferred: usize,
    pub files_deleted: usize,
    pub files_failed: usize,
    pub servers_probed: usize,
    pub servers_unavailable: usize,
    pub relays_published: usize,
    pub relays_rejected: usize,
}

impl RunSummary {
    /// Fold one file's [`UploadOutcome`] into the running totals.
    pub fn record_outcome(&mut self, outcome: &UploadOutcome) {
        if outcome.is_fully_synced() {
            self.files_transferred += 1;
        } else {
            self.files_failed += 1;
        }
        self.relays_published += outcome.per_relay.values().filter(|a| a.is_accepted()).count();
        self.relays_rejected += outcome
            .per_relay
            .values()
            .filter(|a| matches!(a, crate::event::RelayAck::Rejected { .. }))
            .count();
    }

    /// Whether the run should be reported as a full success: everything
    /// scanned either transferred, was already unchanged, or was
    /// deleted — nothing failed (spec §7: partial success is reported,
    /// never silently dropped, which in practice means `files_failed`
    /// drives a non-zero exit code).
    pub fn is_complete_success(&self) -> bool {
        self.files_failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RelayAck;

    #[test]
    fn record_outcome_counts_fully_synced_as_transferred() {
        let mut summary = RunSummary::default();
        let mut outcome = UploadOutcome::new("/a.txt", "deadbeef");
        outcome
            .per_server
            .insert("https://s1".into(), crate::outcome::ServerUploadResult::Accepted);
        outcome.per_relay.insert("wss://r1".into(), RelayAck::Accepted);

        summary.record_outcome(&outcome);
        assert_eq!(summary.files_transferred, 1);
        assert_eq!(summary.files_failed, 0);
        assert!(summary.is_complete_success());
    }

    #[test]
    fn record_outcome_counts_incomplete_as_failed() {
        let mut summary = RunSummary::default();
        let outcome = UploadOutcome::new("/a.txt", "deadbeef");
        summary.record_outcome(&outcome);
        assert_eq!(summary.files_failed, 1);
        assert!(!summary.is_complete_success());
    }
}
