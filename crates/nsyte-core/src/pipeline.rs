//! Pipeline Orchestrator — spec 4.J.
//!
//! A linear state machine — resolve config, plan, execute, report —
//! spec 4.J names:
//!
//! ```text
//! Start → ResolveConfig → InitSigner → ScanLocal
//!       → FetchRemote  → (Purge?) → Diff
//!       → (Transfer & Delete in parallel) → PublishMeta? → Report → Exit
//! ```
//!
//! `ResolveConfig` and `InitSigner` happen before this module is
//! called — they may prompt interactively (spec 4.J), which is
//! `nsyte-cli`'s concern, not this crate's. [`run`] starts at
//! `ScanLocal` with an already-resolved [`nsyte_types::ProjectConfig`]
//! and an already-constructed [`Signer`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use nostr::Keys;
use nostr_sdk::Client as RelayClient;
use tokio_util::sync::CancellationToken;

use nsyte_blobstore::{probe_batch, upload_batch, ProbeOutcome, UploadOptions};
use nsyte_collector::{Category, Collector};
use nsyte_diff::diff;
use nsyte_relay::{
    fetch_manifest, profile_event_builder, publish_event, relay_list_event_builder, server_list_event_builder,
    FetchTimeouts, PublishTimeouts,
};
use nsyte_scanner::{load, scan, IgnoreMatcher, NoopMatcher};
use nsyte_signer::Signer;
use nsyte_types::{content_type_for_path, FileEntry, NsyteError, ProjectConfig, RunSummary, ServerHealthTable};

use crate::delete::{run_verified_deletion, DeleteItem, DeletionSession};

/// Tuning knobs and CLI-provided overrides for one pipeline run (spec §6).
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub target_dir: PathBuf,
    /// Skip `FetchRemote` and treat the remote set as empty (spec 4.J:
    /// "force mode skips FetchRemote").
    pub force: bool,
    /// Delete everything already on the servers/relays before
    /// reconciling, then proceed as if nothing was remote (spec 4.J:
    /// "Purge mode replaces FetchRemote's result with an empty set
    /// after issuing deletes").
    pub purge: bool,
    pub concurrency: usize,
    /// A local file to additionally publish at a fixed `/404.html`
    /// path (spec §9 Open Question 3).
    pub fallback_file: Option<PathBuf>,
    pub publish_server_list: bool,
    pub publish_relay_list: bool,
    pub publish_profile: bool,
}

impl PipelineOptions {
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            force: false,
            purge: false,
            concurrency: 4,
            fallback_file: None,
            publish_server_list: false,
            publish_relay_list: false,
            publish_profile: false,
        }
    }
}

/// Run the pipeline from `ScanLocal` through `Report` against an
/// already-resolved config and signer. `signer` is an `Arc` because
/// [`DeletionSession`] needs to hold its own owning reference across
/// the auth-capture pause spec 4.H describes; the pipeline itself just
/// clones the `Arc` into that session rather than borrowing from it.
pub async fn run(
    options: &PipelineOptions,
    config: &ProjectConfig,
    signer: Arc<dyn Signer>,
    collector: &Collector,
    cancellation: &CancellationToken,
) -> Result<RunSummary, NsyteError> {
    let mut summary = RunSummary::default();
    let http = reqwest::Client::new();
    let health = Arc::new(ServerHealthTable::new());

    // An ephemeral keypair is enough to drive the relay pool: outgoing
    // events are already signed by `signer` before `publish_event`
    // hands them to this client, and incoming queries don't need an
    // identity of their own.
    let relay_client = RelayClient::new(Keys::generate());
    for relay in &config.relays {
        let _ = relay_client.add_relay(relay.url.as_str()).await;
    }
    relay_client.connect().await;

    if cancellation.is_cancelled() {
        return Err(NsyteError::Partial("cancelled before scan".into()));
    }

    // ScanLocal (4.A/4.B).
    let mut local = scan_and_load(&options.target_dir, &NoopMatcher)?;
    if let Some(fallback) = &options.fallback_file {
        local.retain(|e| e.path != "/404.html");
        local.push(load_fallback(fallback)?);
        local.sort_by(|a, b| a.path.cmp(&b.path));
    }
    summary.files_scanned = local.len();

    if cancellation.is_cancelled() {
        return Err(NsyteError::Partial("cancelled after scan".into()));
    }

    // FetchRemote (4.C), skipped entirely in force mode.
    let mut remote = if options.force {
        Vec::new()
    } else {
        fetch_manifest(signer.public_key(), &config.read_relays_owned(), FetchTimeouts::default(), collector).await
    };

    // Purge: delete every remote entry, then reconcile against an
    // empty remote set as if nothing had ever been published.
    if options.purge && !remote.is_empty() {
        let probed = probe_batch(&remote, &config.servers, &health, &http, 5, 3).await;
        let items: Vec<DeleteItem> = remote
            .iter()
            .map(|entry| {
                let known_servers = entry
                    .digest
                    .as_ref()
                    .and_then(|d| probed.get(d))
                    .map(|per_server| {
                        per_server
                            .iter()
                            .filter(|(_, outcome)| **outcome == ProbeOutcome::Present)
                            .map(|(server, _)| server.clone())
                            .collect()
                    })
                    .unwrap_or_else(|| config.servers.clone());
                DeleteItem { file: entry.clone(), known_servers }
            })
            .collect();

        run_purge(&items, &relay_client, Arc::clone(&signer), &http, collector).await?;
        remote = Vec::new();
    }

    let diff_result = diff(&local, &remote, options.force);

    let deletable = diff_result.to_delete.clone();
    let nothing_to_do = local.is_empty()
        && !options.publish_server_list
        && !options.publish_relay_list
        && !options.publish_profile
        && deletable.is_empty();

    if nothing_to_do {
        collector.info(Category::General, "pipeline", "nothing to do: no local files, no deletions, no metadata publish requested");
        return Ok(summary);
    }

    if cancellation.is_cancelled() {
        return Err(NsyteError::Partial("cancelled before transfer".into()));
    }

    // Transfer & Delete run concurrently: loading blobs already happened
    // during ScanLocal, and deletion only touches files absent locally,
    // so the two sets never contend over the same path (spec §5
    // ordering guarantee 2: delete events publish after blob-delete
    // attempts complete, independent of upload progress).
    let upload_options = UploadOptions { concurrency: options.concurrency, relays: config.write_relays_owned(), ..UploadOptions::default() };

    let probed_for_delete = if deletable.is_empty() {
        Default::default()
    } else {
        probe_batch(&deletable, &config.servers, &health, &http, 5, 3).await
    };

    let (upload_outcomes, deletion_report) = tokio::join!(
        upload_batch(
            diff_result.to_transfer.clone(),
            &config.servers,
            Arc::clone(&signer),
            &relay_client,
            &health,
            &http,
            &upload_options,
            collector,
            |_progress| {},
        ),
        delete_leftovers(&deletable, &probed_for_delete, &relay_client, Arc::clone(&signer), &http, collector)
    );

    for outcome in &upload_outcomes {
        summary.record_outcome(outcome);
    }
    summary.files_unchanged = diff_result.unchanged.len();

    let deletion_report = deletion_report?;
    summary.files_deleted = deletion_report.fully_deleted_paths().len();
    summary.servers_probed = probed_for_delete.len();

    if cancellation.is_cancelled() {
        return Err(NsyteError::Partial("cancelled before metadata publish".into()));
    }

    // PublishMeta? (optional, spec §6 flags).
    let publish_timeouts = PublishTimeouts::default();
    if options.publish_server_list {
        publish_list_event(&relay_client, server_list_event_builder(&config.servers), signer.as_ref(), publish_timeouts, collector, "server list")
            .await;
    }
    if options.publish_relay_list {
        let relays: Vec<(String, bool, bool)> = config.relays.iter().map(|r| (r.url.clone(), r.read, r.write)).collect();
        publish_list_event(&relay_client, relay_list_event_builder(&relays), signer.as_ref(), publish_timeouts, collector, "relay list").await;
    }
    if options.publish_profile {
        let profile_json = config.profile_json.clone().unwrap_or_else(|| "{}".to_string());
        publish_list_event(&relay_client, profile_event_builder(&profile_json), signer.as_ref(), publish_timeouts, collector, "profile").await;
    }

    relay_client.disconnect().await;

    // Report.
    collector.info(
        Category::General,
        "pipeline",
        format!(
            "{} uploaded, {} unchanged, {} deleted, {} failed",
            summary.files_transferred, summary.files_unchanged, summary.files_deleted, summary.files_failed
        ),
    );

    Ok(summary)
}

fn scan_and_load(target_dir: &Path, matcher: &impl IgnoreMatcher) -> Result<Vec<FileEntry>, NsyteError> {
    let scan_result = scan(target_dir, matcher).map_err(|e| NsyteError::Configuration(format!("scan failed: {e}")))?;

    let mut loaded = Vec::with_capacity(scan_result.included.len());
    for entry in scan_result.included {
        let fs_path = target_dir.join(entry.path.trim_start_matches('/'));
        let with_bytes = load(&entry, &fs_path).map_err(|e| NsyteError::Configuration(format!("failed to load {}: {e}", entry.path)))?;
        loaded.push(with_bytes);
    }
    Ok(loaded)
}

fn load_fallback(fallback_file: &Path) -> Result<FileEntry, NsyteError> {
    let entry = FileEntry::from_scan("/404.html", content_type_for_path("/404.html"));
    load(&entry, fallback_file).map_err(|e| NsyteError::Configuration(format!("failed to load fallback file: {e}")))
}

async fn delete_leftovers(
    deletable: &[FileEntry],
    probed: &std::collections::BTreeMap<String, std::collections::BTreeMap<String, ProbeOutcome>>,
    relay_client: &RelayClient,
    signer: Arc<dyn Signer>,
    http: &reqwest::Client,
    collector: &Collector,
) -> Result<crate::delete::DeletionReport, NsyteError> {
    if deletable.is_empty() {
        return Ok(crate::delete::DeletionReport { per_file: Vec::new(), delete_event_id: None, publish_report: None });
    }

    let items: Vec<DeleteItem> = deletable
        .iter()
        .map(|entry| {
            let known_servers = entry
                .digest
                .as_ref()
                .and_then(|d| probed.get(d))
                .map(|per_server| {
                    per_server
                        .iter()
                        .filter(|(_, outcome)| **outcome == ProbeOutcome::Present)
                        .map(|(server, _)| server.clone())
                        .collect()
                })
                .unwrap_or_default();
            DeleteItem { file: entry.clone(), known_servers }
        })
        .collect();

    let session = DeletionSession::ready(signer);
    run_verified_deletion(items, relay_client, &session, http, PublishTimeouts::default(), Duration::from_secs(2), collector).await
}

async fn run_purge(
    items: &[DeleteItem],
    relay_client: &RelayClient,
    signer: Arc<dyn Signer>,
    http: &reqwest::Client,
    collector: &Collector,
) -> Result<(), NsyteError> {
    if items.is_empty() {
        return Ok(());
    }
    let session = DeletionSession::ready(signer);
    run_verified_deletion(items.to_vec(), relay_client, &session, http, PublishTimeouts::default(), Duration::from_secs(2), collector)
        .await?;
    Ok(())
}

async fn publish_list_event(
    relay_client: &RelayClient,
    builder: nostr::EventBuilder,
    signer: &dyn Signer,
    timeouts: PublishTimeouts,
    collector: &Collector,
    label: &str,
) {
    match publish_event(relay_client, builder, signer, timeouts).await {
        Ok((_event, report)) => {
            if report.is_published() {
                collector.info(Category::Event, label, "published");
            } else {
                collector.warn(Category::Event, label, "no relay accepted the event");
            }
        }
        Err(e) => collector.error(Category::Event, label, format!("failed to publish: {e}")),
    }
}

trait ConfigExt {
    fn read_relays_owned(&self) -> Vec<String>;
    fn write_relays_owned(&self) -> Vec<String>;
}

impl ConfigExt for ProjectConfig {
    fn read_relays_owned(&self) -> Vec<String> {
        self.read_relays().into_iter().map(String::from).collect()
    }

    fn write_relays_owned(&self) -> Vec<String> {
        self.write_relays().into_iter().map(String::from).collect()
    }
}
