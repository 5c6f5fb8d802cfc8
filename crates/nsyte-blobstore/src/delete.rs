//! Advisory per-server blob deletion — spec 4.H: "delete each blob with
//! a signed delete-authorization request per server ... servers may
//! return false-positives or ignore the request entirely; these
//! outcomes are advisory and do not block the nostr-side tombstone."
//!
//! Generalizes `probe.rs`'s bounded-batch-of-HTTP-calls shape to an
//! HTTP DELETE instead of a HEAD, dropping the circuit breaker and
//! retry loop since a single best-effort attempt per server is all the
//! spec asks for here.

use std::sync::Arc;

use reqwest::Client;

use nsyte_signer::Signer;

use crate::auth::build_delete_auth;

/// Outcome of one (digest, server) delete attempt. Never treated as
/// authoritative by callers (spec 4.H).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Server acknowledged the deletion (2xx) or already had nothing to
    /// delete (404).
    Acknowledged,
    /// The server rejected the request, ignored it, or was unreachable.
    Ignored,
}

fn server_delete_url(server: &str, digest: &str) -> String {
    format!("{}/{digest}", server.trim_end_matches('/'))
}

/// Issue one advisory delete request for `digest` against `server`.
pub async fn delete_blob(client: &Client, server: &str, digest: &str, signer: &dyn Signer) -> DeleteOutcome {
    let auth_header = match build_delete_auth(digest, 300, signer).await {
        Ok(header) => header,
        Err(_) => return DeleteOutcome::Ignored,
    };

    let url = server_delete_url(server, digest);
    match client.delete(&url).header("Authorization", auth_header).send().await {
        Ok(resp) if resp.status().is_success() || resp.status().as_u16() == 404 => DeleteOutcome::Acknowledged,
        _ => DeleteOutcome::Ignored,
    }
}

/// Issue advisory delete requests for `digest` against every server in
/// `servers`, one per server, all concurrently. The return value is
/// informational only; callers must not infer blob absence from it
/// (spec 4.H).
///
/// `signer` is an `Arc` so each server's request can run on its own
/// `tokio::spawn`ed task rather than being awaited in sequence.
pub async fn delete_blob_everywhere(
    client: &Client,
    servers: &[String],
    digest: &str,
    signer: Arc<dyn Signer>,
) -> Vec<(String, DeleteOutcome)> {
    let mut handles = Vec::new();
    for server in servers {
        let client = client.clone();
        let server = server.clone();
        let digest = digest.to_string();
        let signer = Arc::clone(&signer);
        handles.push(tokio::spawn(async move {
            let outcome = delete_blob(&client, &server, &digest, signer.as_ref()).await;
            (server, outcome)
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        if let Ok(pair) = handle.await {
            results.push(pair);
        }
    }
    results
}
