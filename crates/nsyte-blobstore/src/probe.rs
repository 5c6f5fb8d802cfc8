//! Server Availability Probe — spec 4.G.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use nsyte_retry::{calculate_delay, RetryPolicy};
use nsyte_types::{FileEntry, ServerHealthTable};

/// Per-attempt timeout growth: starts at 5s, grows 2s per retry
/// (spec 4.G).
#[derive(Debug, Clone, Copy)]
pub struct ProbeTimeouts {
    pub initial: Duration,
    pub growth_per_attempt: Duration,
    pub max_retries: u32,
}

impl Default for ProbeTimeouts {
    fn default() -> Self {
        Self { initial: Duration::from_secs(5), growth_per_attempt: Duration::from_secs(2), max_retries: 2 }
    }
}

/// Outcome of probing one (digest, server) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// HTTP 200 — blob present, server health reset.
    Present,
    /// HTTP 404, or retries exhausted — blob absent (authoritative or
    /// assumed, per spec 4.G).
    Absent,
    /// The server's circuit breaker had already tripped; no request was
    /// sent.
    Skipped,
}

fn server_probe_url(server: &str, digest: &str) -> String {
    format!("{}/{digest}", server.trim_end_matches('/'))
}

/// Probe one (digest, server) pair, consulting and updating `health`
/// per spec 4.G's circuit-breaker rule.
pub async fn probe_digest(
    client: &Client,
    server: &str,
    digest: &str,
    health: &ServerHealthTable,
    timeouts: ProbeTimeouts,
) -> ProbeOutcome {
    if health.is_skipped(server) {
        return ProbeOutcome::Skipped;
    }

    let url = server_probe_url(server, digest);
    let policy = RetryPolicy::Default.to_config();
    let mut attempt = 0u32;

    loop {
        let timeout = timeouts.initial + timeouts.growth_per_attempt * attempt;
        let result = tokio::time::timeout(timeout, client.head(&url).send()).await;

        match result {
            Ok(Ok(response)) if response.status().is_success() => {
                health.record_success(server);
                return ProbeOutcome::Present;
            }
            Ok(Ok(response)) if response.status().as_u16() == 404 => {
                health.record_success(server);
                return ProbeOutcome::Absent;
            }
            Ok(Ok(_other_status)) | Ok(Err(_)) | Err(_) => {
                if attempt >= timeouts.max_retries {
                    health.record_failure(server);
                    return ProbeOutcome::Absent;
                }
                let delay = calculate_delay(&policy, attempt + 1);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Probe every (file digest, server) pair in `files`, outer parallelism
/// `batch_size` (default 5) files at a time, inner parallelism
/// `inner_concurrency` (<=3) probes per file, with a short delay between
/// batches (spec 4.G).
pub async fn probe_batch(
    files: &[FileEntry],
    servers: &[String],
    health: &Arc<ServerHealthTable>,
    client: &Client,
    batch_size: usize,
    inner_concurrency: usize,
) -> BTreeMap<String, BTreeMap<String, ProbeOutcome>> {
    let mut result: BTreeMap<String, BTreeMap<String, ProbeOutcome>> = BTreeMap::new();
    let digests: Vec<String> = files.iter().filter_map(|f| f.digest.clone()).collect();

    for chunk in digests.chunks(batch_size.max(1)) {
        let mut handles = Vec::new();
        for digest in chunk {
            let semaphore = Arc::new(tokio::sync::Semaphore::new(inner_concurrency.max(1)));
            for server in servers {
                let client = client.clone();
                let server = server.clone();
                let digest = digest.clone();
                let health = Arc::clone(health);
                let semaphore = Arc::clone(&semaphore);
                handles.push(tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                    let outcome = probe_digest(&client, &server, &digest, &health, ProbeTimeouts::default()).await;
                    (digest, server, outcome)
                }));
            }
        }

        for handle in handles {
            if let Ok((digest, server, outcome)) = handle.await {
                result.entry(digest).or_default().insert(server, outcome);
            }
        }

        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    result
}
