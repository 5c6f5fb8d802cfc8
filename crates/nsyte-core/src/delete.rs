//! Verified Deletion Orchestrator — spec 4.H.
//!
//! Four steps per the spec, run in order against a fixed set of
//! [`DeleteItem`]s: advisory per-server blob deletes, one signed NIP-09
//! delete event naming every tombstoned manifest event id, a grace
//! period then a per-event relay re-query, and a local state update
//! (left to the caller via [`DeletionReport::fully_deleted_paths`]).
//!
//! The auth-capture transition (spec 4.H's last paragraph) is modeled
//! as [`DeletionSession`], so a TUI can drive credential collection
//! without this crate knowing anything about terminals. Credentials
//! are wrapped in `zeroize::Zeroizing` and dropped as soon as the
//! `Signer` they produce is constructed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use nostr::EventId;
use nostr_sdk::Client as RelayClient;
use zeroize::Zeroizing;

use nsyte_blobstore::{delete_blob_everywhere, DeleteOutcome};
use nsyte_collector::{Category, Collector};
use nsyte_relay::{delete_event_builder, publish_event, query_event_presence, PublishTimeouts};
use nsyte_signer::{BunkerSigner, BunkerUri, LocalKeySigner, NbunksecSigner, Signer};
use nsyte_types::{FileEntry, NsyteError, PublicationReport};

/// Why a [`DeletionSession`] is waiting on credentials.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub reason: String,
}

/// The auth-capture state machine spec 4.H's last paragraph describes:
/// either a signer is ready to use, or one must be collected first.
pub enum DeletionSession {
    NeedsAuth(AuthRequest),
    Ready(Arc<dyn Signer>),
}

impl DeletionSession {
    pub fn needs_auth(reason: impl Into<String>) -> Self {
        Self::NeedsAuth(AuthRequest { reason: reason.into() })
    }

    pub fn ready(signer: Arc<dyn Signer>) -> Self {
        Self::Ready(signer)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Construct a local-key signer from a raw secret key, zeroizing the
    /// input as soon as the `Signer` exists.
    pub fn resume_with_local_key(secret_key: String) -> Result<Self, NsyteError> {
        let secret_key = Zeroizing::new(secret_key);
        let signer = LocalKeySigner::from_secret_key_str(&secret_key)?;
        Ok(Self::Ready(Arc::new(signer)))
    }

    /// Connect a NIP-46 bunker session from a raw `bunker://` uri,
    /// zeroizing the input as soon as the `Signer` exists.
    pub async fn resume_with_bunker_uri(raw_uri: String) -> Result<Self, NsyteError> {
        let raw_uri = Zeroizing::new(raw_uri);
        let uri = BunkerUri::parse(&raw_uri).map_err(|e| NsyteError::Auth(e.to_string()))?;
        let signer = BunkerSigner::connect(uri).await?;
        Ok(Self::Ready(Arc::new(signer)))
    }

    /// Connect a stored "nbunksec" connection string, zeroizing the
    /// input as soon as the `Signer` exists.
    pub async fn resume_with_nbunksec(nbunksec: String) -> Result<Self, NsyteError> {
        let nbunksec = Zeroizing::new(nbunksec);
        let signer = NbunksecSigner::connect(&nbunksec).await?;
        Ok(Self::Ready(Arc::new(signer)))
    }
}

/// One file queued for deletion: the remote [`FileEntry`] that named it
/// (carrying its manifest event id and the relays it was seen on) and
/// the set of servers known to hold its blob, from a prior probe.
#[derive(Debug, Clone)]
pub struct DeleteItem {
    pub file: FileEntry,
    pub known_servers: Vec<String>,
}

/// Intermediate UI state per file, tracked through the three steps of a
/// deletion (spec 4.H: "deleting → deleted → verified").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileDeletionState {
    Deleting,
    Deleted,
    Verified,
}

/// Result of re-querying relays for one file's manifest event id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteVerification {
    /// No relay still returns the manifest event.
    FullyDeleted,
    /// Some relays still return it.
    PartiallyDeleted,
    /// Every relay still returns it.
    NotDeleted,
}

/// Per-file outcome of a deletion run.
#[derive(Debug, Clone)]
pub struct FileDeletionOutcome {
    pub path: String,
    pub state: FileDeletionState,
    pub per_server: BTreeMap<String, DeleteOutcome>,
    pub verification: Option<DeleteVerification>,
}

/// Aggregate result of [`run_verified_deletion`].
#[derive(Debug, Clone)]
pub struct DeletionReport {
    pub per_file: Vec<FileDeletionOutcome>,
    /// The one NIP-09 delete event published, if any tombstoned ids existed.
    pub delete_event_id: Option<String>,
    pub publish_report: Option<PublicationReport>,
}

impl DeletionReport {
    /// Paths verified as fully deleted — the set a caller should drop
    /// from its working list (spec 4.H step 4).
    pub fn fully_deleted_paths(&self) -> Vec<&str> {
        self.per_file
            .iter()
            .filter(|f| f.verification == Some(DeleteVerification::FullyDeleted))
            .map(|f| f.path.as_str())
            .collect()
    }
}

fn union_relays(items: &[DeleteItem]) -> Vec<String> {
    let mut set: BTreeSet<String> = BTreeSet::new();
    for item in items {
        set.extend(item.file.found_on_relays.iter().cloned());
    }
    set.into_iter().collect()
}

/// Run the full verified-deletion flow (spec 4.H steps 1-3) against
/// `items`. Step 4 (dropping fully-deleted files from a working list)
/// is left to the caller, via [`DeletionReport::fully_deleted_paths`].
///
/// Returns [`NsyteError::Auth`] immediately, without touching any
/// server or relay, when `session` is still [`DeletionSession::NeedsAuth`].
pub async fn run_verified_deletion(
    items: Vec<DeleteItem>,
    relay_client: &RelayClient,
    session: &DeletionSession,
    http: &reqwest::Client,
    publish_timeouts: PublishTimeouts,
    grace_period: Duration,
    collector: &Collector,
) -> Result<DeletionReport, NsyteError> {
    let signer = match session {
        DeletionSession::Ready(signer) => Arc::clone(signer),
        DeletionSession::NeedsAuth(request) => {
            return Err(NsyteError::Auth(format!("no signer configured: {}", request.reason)));
        }
    };

    if items.is_empty() {
        return Ok(DeletionReport { per_file: Vec::new(), delete_event_id: None, publish_report: None });
    }

    // Step 1: advisory per-server blob deletes.
    let mut per_file = Vec::with_capacity(items.len());
    for item in &items {
        let digest = item.file.digest.clone().unwrap_or_default();
        let results = delete_blob_everywhere(http, &item.known_servers, &digest, Arc::clone(&signer)).await;

        let mut per_server = BTreeMap::new();
        for (server, outcome) in results {
            collector.info(Category::Server, &server, format!("delete {}: {outcome:?}", item.file.path));
            per_server.insert(server, outcome);
        }
        per_file.push(FileDeletionOutcome {
            path: item.file.path.clone(),
            state: FileDeletionState::Deleting,
            per_server,
            verification: None,
        });
    }

    // Step 2: one signed Delete event naming every tombstoned manifest
    // event id, published to the union of relays the originals were
    // seen on.
    let tombstoned_ids: Vec<String> = items.iter().filter_map(|i| i.file.source_event_id.clone()).collect();
    let relays = union_relays(&items);

    let (delete_event_id, publish_report) = if tombstoned_ids.is_empty() {
        (None, None)
    } else {
        let note = format!("removed {} file(s)", items.len());
        let builder = delete_event_builder(&tombstoned_ids, &note);
        match publish_event(relay_client, builder, signer.as_ref(), publish_timeouts).await {
            Ok((event, report)) => (Some(event.id.to_hex()), Some(report)),
            Err(e) => {
                collector.error(Category::Event, "delete", format!("failed to publish delete event: {e}"));
                (None, None)
            }
        }
    };

    for outcome in &mut per_file {
        outcome.state = FileDeletionState::Deleted;
    }

    // Step 3: grace period, then re-query each relay for each
    // tombstoned manifest event id.
    tokio::time::sleep(grace_period).await;

    for (item, outcome) in items.iter().zip(per_file.iter_mut()) {
        let Some(event_id_hex) = &item.file.source_event_id else {
            // Nothing was ever published for this file; treat it as
            // already gone.
            outcome.verification = Some(DeleteVerification::FullyDeleted);
            outcome.state = FileDeletionState::Verified;
            continue;
        };

        let Ok(event_id) = EventId::from_hex(event_id_hex) else {
            outcome.verification = Some(DeleteVerification::NotDeleted);
            outcome.state = FileDeletionState::Verified;
            continue;
        };

        let query_relays = if item.file.found_on_relays.is_empty() { relays.clone() } else { item.file.found_on_relays.clone() };
        let still_present = query_event_presence(event_id, &query_relays, Duration::from_secs(5)).await;

        let verification = if still_present.is_empty() {
            DeleteVerification::FullyDeleted
        } else if still_present.len() < query_relays.len() {
            DeleteVerification::PartiallyDeleted
        } else {
            DeleteVerification::NotDeleted
        };

        collector.info(Category::File, &item.file.path, format!("deletion verification: {verification:?}"));
        outcome.verification = Some(verification);
        outcome.state = FileDeletionState::Verified;
    }

    Ok(DeletionReport { per_file, delete_event_id, publish_report })
}
