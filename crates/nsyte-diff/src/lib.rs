//! Diff Engine — spec 4.D.
//!
//! Pure and synchronous: no I/O, unit-testable without a runtime. There
//! is no close precedent for reconciling two pre-fetched sets this way,
//! since comparing local workspace versions to a registry is normally a
//! network round trip rather than a set comparison, so the algorithm is
//! built directly from spec 4.D; the module boundary itself — a
//! standalone, dependency-free crate the orchestrator calls into — keeps
//! this pure reconciliation logic separate from anything that talks to a
//! network, the same way a pure planning layer stays separate from
//! anything that talks to a registry.

use std::collections::BTreeMap;

use nsyte_types::{FileEntry, PathKey};

/// The three disjoint, exhaustive classification sets produced by
/// [`diff`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Local entries with no remote match, or a remote match with a
    /// different digest (an update).
    pub to_transfer: Vec<FileEntry>,
    /// Local entries whose remote match has the same digest (or either
    /// digest is missing).
    pub unchanged: Vec<FileEntry>,
    /// Remote entries with no matching local entry.
    pub to_delete: Vec<FileEntry>,
}

/// Compare a local file set to a remote manifest set by normalized path
/// and digest (spec 4.D).
///
/// Path comparison uses [`PathKey`]'s case-insensitive, slash-collapsed
/// normalization. For each local entry, at most one remote entry of the
/// same normalized path is consumed; the tie-break among several remote
/// entries sharing a normalized path is deterministic: the first one in
/// sorted-by-path order.
///
/// When `force` is set, every entry that would otherwise be `unchanged`
/// is moved into `to_transfer` instead (spec 4.D: "force mode").
pub fn diff(local: &[FileEntry], remote: &[FileEntry], force: bool) -> DiffResult {
    let mut remote_by_key: BTreeMap<String, Vec<FileEntry>> = BTreeMap::new();
    let mut remote_sorted: Vec<&FileEntry> = remote.iter().collect();
    remote_sorted.sort_by(|a, b| a.path.cmp(&b.path));
    for entry in remote_sorted {
        let key = PathKey::normalize(&entry.path).normalized;
        remote_by_key.entry(key).or_default().push(entry.clone());
    }

    let mut consumed: BTreeMap<String, usize> = BTreeMap::new();
    let mut result = DiffResult::default();

    let mut local_sorted: Vec<&FileEntry> = local.iter().collect();
    local_sorted.sort_by(|a, b| a.path.cmp(&b.path));

    for entry in local_sorted {
        let key = PathKey::normalize(&entry.path).normalized;
        let cursor = consumed.entry(key.clone()).or_insert(0);
        let candidates = remote_by_key.get(&key);
        let remote_match = candidates.and_then(|c| c.get(*cursor));

        match remote_match {
            None => {
                result.to_transfer.push(entry.clone());
            }
            Some(remote_entry) => {
                *cursor += 1;
                let same_digest = match (&entry.digest, &remote_entry.digest) {
                    (Some(local_digest), Some(remote_digest)) => local_digest == remote_digest,
                    // Either digest missing: spec 4.D treats this as
                    // unchanged (nothing to compare against).
                    _ => true,
                };

                if same_digest {
                    result.unchanged.push(entry.clone());
                } else {
                    result.to_transfer.push(entry.clone());
                }
            }
        }
    }

    for (key, candidates) in &remote_by_key {
        let used = consumed.get(key).copied().unwrap_or(0);
        result.to_delete.extend(candidates.iter().skip(used).cloned());
    }

    if force {
        result.to_transfer.append(&mut result.unchanged);
        result.to_transfer.sort_by(|a, b| a.path.cmp(&b.path));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_entry(path: &str, digest: &str) -> FileEntry {
        let mut entry = FileEntry::from_scan(path, "text/plain");
        entry.digest = Some(digest.to_string());
        entry
    }

    fn remote_entry(path: &str, digest: &str) -> FileEntry {
        FileEntry::from_remote(path, digest, "eventid", vec!["wss://r1".into()])
    }

    #[test]
    fn clean_deploy_all_local_to_transfer() {
        let local = vec![local_entry("/index.html", "aaa"), local_entry("/style.css", "bbb")];
        let result = diff(&local, &[], false);
        assert_eq!(result.to_transfer.len(), 2);
        assert!(result.unchanged.is_empty());
        assert!(result.to_delete.is_empty());
    }

    #[test]
    fn no_op_when_digests_match() {
        let local = vec![local_entry("/index.html", "aaa"), local_entry("/style.css", "bbb")];
        let remote = vec![remote_entry("/index.html", "aaa"), remote_entry("/style.css", "bbb")];
        let result = diff(&local, &remote, false);
        assert!(result.to_transfer.is_empty());
        assert_eq!(result.unchanged.len(), 2);
        assert!(result.to_delete.is_empty());
    }

    #[test]
    fn differing_digest_is_an_update() {
        let local = vec![local_entry("/a", "new")];
        let remote = vec![remote_entry("/a", "old")];
        let result = diff(&local, &remote, false);
        assert_eq!(result.to_transfer.len(), 1);
        assert!(result.unchanged.is_empty());
        assert!(result.to_delete.is_empty());
    }

    #[test]
    fn remote_only_entries_are_to_delete() {
        let local = vec![local_entry("/a", "aaa")];
        let remote = vec![remote_entry("/a", "aaa"), remote_entry("/b", "bbb")];
        let result = diff(&local, &remote, false);
        assert!(result.to_transfer.is_empty());
        assert_eq!(result.unchanged.len(), 1);
        assert_eq!(result.to_delete.len(), 1);
        assert_eq!(result.to_delete[0].path, "/b");
    }

    #[test]
    fn force_mode_moves_everything_to_transfer() {
        let local = vec![local_entry("/a", "aaa")];
        let remote = vec![remote_entry("/a", "aaa")];
        let result = diff(&local, &remote, true);
        assert_eq!(result.to_transfer.len(), 1);
        assert!(result.unchanged.is_empty());
    }

    #[test]
    fn path_comparison_is_case_insensitive() {
        let local = vec![local_entry("/Index.html", "aaa")];
        let remote = vec![remote_entry("/index.HTML", "aaa")];
        let result = diff(&local, &remote, false);
        assert_eq!(result.unchanged.len(), 1);
        assert!(result.to_delete.is_empty());
    }

    #[test]
    fn missing_digest_on_either_side_counts_as_unchanged() {
        let mut local = local_entry("/a", "aaa");
        local.digest = None;
        let remote = vec![remote_entry("/a", "aaa")];
        let result = diff(&[local], &remote, false);
        assert_eq!(result.unchanged.len(), 1);
    }

    #[test]
    fn result_is_exhaustive_and_disjoint_over_local_and_remote() {
        let local = vec![local_entry("/a", "aaa"), local_entry("/b", "new")];
        let remote = vec![remote_entry("/b", "old"), remote_entry("/c", "ccc")];
        let result = diff(&local, &remote, false);

        let total_classified = result.to_transfer.len() + result.unchanged.len();
        assert_eq!(total_classified, local.len());
        assert_eq!(result.to_delete.len(), 1);
        assert_eq!(result.to_delete[0].path, "/c");
    }

    #[test]
    fn running_diff_on_a_successful_upload_result_is_stable() {
        let local = vec![local_entry("/a", "aaa")];
        let first = diff(&local, &[], false);
        assert_eq!(first.to_transfer.len(), 1);

        // Simulate the just-uploaded file becoming the remote state.
        let remote = vec![remote_entry("/a", "aaa")];
        let second = diff(&local, &remote, false);
        assert!(second.to_transfer.is_empty());
        assert!(second.to_delete.is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_entry() -> impl Strategy<Value = (String, String)> {
        ("[a-z]{1,5}", "[a-f0-9]{4}")
    }

    proptest! {
        #[test]
        fn to_transfer_and_unchanged_partition_local(
            paths in proptest::collection::vec(arb_entry(), 0..8)
        ) {
            let local: Vec<FileEntry> = paths
                .iter()
                .map(|(p, d)| super::tests_support::local_entry(p, d))
                .collect();
            let result = diff(&local, &[], false);
            prop_assert_eq!(result.to_transfer.len() + result.unchanged.len(), local.len());
        }

        #[test]
        fn force_mode_always_empties_unchanged(
            paths in proptest::collection::vec(arb_entry(), 0..8)
        ) {
            let local: Vec<FileEntry> = paths
                .iter()
                .map(|(p, d)| super::tests_support::local_entry(p, d))
                .collect();
            let remote: Vec<FileEntry> = paths
                .iter()
                .map(|(p, d)| super::tests_support::remote_entry(p, d))
                .collect();
            let result = diff(&local, &remote, true);
            prop_assert!(result.unchanged.is_empty());
        }
    }
}

#[cfg(test)]
mod tests_support {
    use nsyte_types::FileEntry;

    pub fn local_entry(path: &str, digest: &str) -> FileEntry {
        let mut entry = FileEntry::from_scan(format!("/{path}"), "text/plain");
        entry.digest = Some(digest.to_string());
        entry
    }

    pub fn remote_entry(path: &str, digest: &str) -> FileEntry {
        FileEntry::from_remote(format!("/{path}"), digest, "eventid", vec![])
    }
}
