//! Blob Uploader — spec 4.E.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use nostr_sdk::Client as RelayClient;
use reqwest::Client as HttpClient;

use nsyte_collector::{Category, Collector, MessageKind};
use nsyte_relay::{manifest_event_builder, publish_event, PublishTimeouts};
use nsyte_retry::{calculate_delay, RetryPolicy};
use nsyte_signer::Signer;
use nsyte_types::{FileEntry, ServerHealthTable, ServerUploadResult, UploadOutcome};

use crate::auth::build_upload_auth;

/// Tuning knobs for one upload run (spec 4.E).
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Bounded worker pool size (spec default: 4).
    pub concurrency: usize,
    /// Per-file server fan-out bound (spec: <=3).
    pub inner_concurrency: usize,
    /// Grace period between batches, to be "server-friendly" under load
    /// (spec default: ~500ms).
    pub batch_grace: Duration,
    /// Blossom upload authorization TTL.
    pub auth_ttl_secs: i64,
    pub relays: Vec<String>,
    pub publish_timeouts: PublishTimeouts,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            inner_concurrency: 3,
            batch_grace: Duration::from_millis(500),
            auth_ttl_secs: 300,
            relays: Vec::new(),
            publish_timeouts: PublishTimeouts::default(),
        }
    }
}

/// Progress reported after each batch completes (spec 4.E:
/// "emits a progress event (completed, failed, in-flight)").
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressEvent {
    pub completed: usize,
    pub failed: usize,
    pub in_flight: usize,
    pub pending: usize,
}

/// Upload every loaded `files` entry to `servers`, bounded by
/// `options.concurrency` files at a time and `options.inner_concurrency`
/// servers per file. On each server acceptance the manifest event is
/// published via `relay_client` (spec 4.E step 4). Returns one
/// [`UploadOutcome`] per file, in input order.
///
/// `signer` is an `Arc` (rather than `&dyn Signer`) because each file in
/// a chunk runs on its own `tokio::spawn`ed task — genuinely concurrent,
/// not just structured as independent futures — so every task needs an
/// owned handle to it.
pub async fn upload_batch(
    files: Vec<FileEntry>,
    servers: &[String],
    signer: Arc<dyn Signer>,
    relay_client: &RelayClient,
    health: &Arc<ServerHealthTable>,
    http: &HttpClient,
    options: &UploadOptions,
    collector: &Collector,
    mut on_progress: impl FnMut(ProgressEvent),
) -> Vec<UploadOutcome> {
    let total = files.len();
    let mut outcomes = Vec::with_capacity(total);
    let mut completed = 0usize;
    let mut failed = 0usize;

    for chunk in files.chunks(options.concurrency.max(1)) {
        let in_flight = chunk.len();
        on_progress(ProgressEvent {
            completed,
            failed,
            in_flight,
            pending: total.saturating_sub(completed + failed + in_flight),
        });

        let mut handles = Vec::new();
        for file in chunk.iter().cloned() {
            let servers = servers.to_vec();
            let inner_concurrency = options.inner_concurrency;
            let auth_ttl = options.auth_ttl_secs;
            let health = Arc::clone(health);
            let http = http.clone();
            let relay_client = relay_client.clone();
            let relays = options.relays.clone();
            let publish_timeouts = options.publish_timeouts;
            let signer = Arc::clone(&signer);

            handles.push(tokio::spawn(async move {
                upload_one(
                    file,
                    &servers,
                    inner_concurrency,
                    auth_ttl,
                    signer.as_ref(),
                    &relay_client,
                    &relays,
                    publish_timeouts,
                    &health,
                    &http,
                )
                .await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(outcome) = handle.await {
                results.push(outcome);
            }
        }
        for outcome in results {
            if outcome.is_fully_synced() {
                completed += 1;
                collector.info(Category::File, &outcome.path, "uploaded");
            } else if outcome.has_blob_on_any_server() {
                failed += 1;
                collector.record(
                    MessageKind::Warn,
                    Category::File,
                    &outcome.path,
                    "visible on servers but not discoverable: manifest event was rejected by every relay",
                );
            } else {
                failed += 1;
                collector.error(Category::File, &outcome.path, "no server accepted the blob");
            }
            outcomes.push(outcome);
        }

        on_progress(ProgressEvent {
            completed,
            failed,
            in_flight: 0,
            pending: total.saturating_sub(completed + failed),
        });

        tokio::time::sleep(options.batch_grace).await;
    }

    outcomes
}

#[allow(clippy::too_many_arguments)]
async fn upload_one(
    file: FileEntry,
    servers: &[String],
    inner_concurrency: usize,
    auth_ttl: i64,
    signer: &dyn Signer,
    relay_client: &RelayClient,
    relays: &[String],
    publish_timeouts: PublishTimeouts,
    health: &Arc<ServerHealthTable>,
    http: &HttpClient,
) -> UploadOutcome {
    let digest = file.digest.clone().unwrap_or_default();
    let mut outcome = UploadOutcome::new(file.path.clone(), digest.clone());

    let auth_header = match build_upload_auth(&digest, auth_ttl, signer).await {
        Ok(header) => header,
        Err(e) => {
            for server in servers {
                outcome.per_server.insert(
                    server.clone(),
                    ServerUploadResult::Rejected { reason: format!("failed to build upload auth: {e}") },
                );
            }
            return outcome;
        }
    };

    let bytes = Arc::new(file.bytes.clone().unwrap_or_default());
    let content_type = file.content_type.clone();

    let semaphore = Arc::new(tokio::sync::Semaphore::new(inner_concurrency.max(1)));
    let mut handles = Vec::new();
    for server in servers {
        let server = server.clone();
        let auth_header = auth_header.clone();
        let bytes = Arc::clone(&bytes);
        let content_type = content_type.clone();
        let health = Arc::clone(health);
        let http = http.clone();
        let semaphore = Arc::clone(&semaphore);

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            let result = upload_to_server(&http, &server, &auth_header, &bytes, &content_type, &health).await;
            (server, result)
        }));
    }

    let mut any_accepted = false;
    for handle in handles {
        if let Ok((server, result)) = handle.await {
            if result.is_accepted() {
                any_accepted = true;
            }
            outcome.per_server.insert(server, result);
        }
    }

    if any_accepted {
        let builder = manifest_event_builder(&file.path, &digest);
        match publish_event(relay_client, builder, signer, publish_timeouts).await {
            Ok((_event, report)) => {
                outcome.event_published = report.is_published();
                outcome.per_relay = report.per_relay;
            }
            Err(_e) => {
                outcome.event_published = false;
            }
        }
    }

    outcome
}

async fn upload_to_server(
    http: &HttpClient,
    server: &str,
    auth_header: &str,
    bytes: &[u8],
    content_type: &str,
    health: &ServerHealthTable,
) -> ServerUploadResult {
    if health.is_skipped(server) {
        return ServerUploadResult::Unavailable { detail: "circuit breaker tripped".to_string() };
    }

    let url = server.trim_end_matches('/').to_string();
    let policy = RetryPolicy::Default.to_config();
    let mut attempt = 0u32;

    loop {
        let response = http
            .put(&url)
            .header("Authorization", auth_header)
            .header("Content-Type", content_type)
            .body(bytes.to_vec())
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                health.record_success(server);
                return ServerUploadResult::Accepted;
            }
            Ok(resp) if resp.status().as_u16() == 404 || resp.status().as_u16() == 410 => {
                health.record_success(server);
                return ServerUploadResult::Rejected { reason: format!("server returned {}", resp.status()) };
            }
            Ok(resp) if resp.status().is_client_error() => {
                health.record_failure(server);
                return ServerUploadResult::Rejected { reason: format!("server returned {}", resp.status()) };
            }
            Ok(resp) => {
                if attempt >= policy.max_attempts.saturating_sub(1) {
                    health.record_failure(server);
                    return ServerUploadResult::Unavailable { detail: format!("server returned {}", resp.status()) };
                }
            }
            Err(e) => {
                if attempt >= policy.max_attempts.saturating_sub(1) {
                    health.record_failure(server);
                    return ServerUploadResult::Unavailable { detail: format!("network error: {e}") };
                }
            }
        }

        let delay = calculate_delay(&policy, attempt + 1);
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_spec_4e() {
        let options = UploadOptions::default();
        assert_eq!(options.concurrency, 4);
        assert_eq!(options.inner_concurrency, 3);
        assert_eq!(options.batch_grace, Duration::from_millis(500));
    }
}
