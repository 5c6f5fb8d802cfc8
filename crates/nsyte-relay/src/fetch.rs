//! Remote Manifest Fetcher — spec 4.C, plus the relay re-query step
//! spec 4.H's Verified Deletion Orchestrator needs to confirm a delete
//! has propagated.

use std::collections::HashMap;
use std::time::Duration;

use nostr::{Event, EventId, Filter, Keys, Kind, PublicKey};
use nostr_sdk::{Client, RelayPoolNotification};

use nsyte_collector::{Category, Collector};
use nsyte_types::{FileEntry, NSITE_KIND};

/// Per-relay deadlines for one fetch (spec 4.C: "soft inactivity timeout
/// ~8s and a hard wall timeout ~10s").
#[derive(Debug, Clone, Copy)]
pub struct FetchTimeouts {
    pub soft_inactivity: Duration,
    pub hard_wall: Duration,
}

impl Default for FetchTimeouts {
    fn default() -> Self {
        Self { soft_inactivity: Duration::from_secs(8), hard_wall: Duration::from_secs(10) }
    }
}

struct SeenEvent {
    event: Event,
    found_on_relays: std::collections::BTreeSet<String>,
}

/// Subscribe to every relay in `relays` for `pubkey`'s manifest events,
/// collect until the soft-inactivity or hard-wall deadline is hit,
/// reduce to one entry per path keeping the greatest `created_at`, and
/// merge the losing entry's relay set into the winner's (spec 4.C).
///
/// Never returns an error: an empty relay set or total connection
/// failure yields an empty list plus a collector warning, per spec.
pub async fn fetch_manifest(
    pubkey: PublicKey,
    relays: &[String],
    timeouts: FetchTimeouts,
    collector: &Collector,
) -> Vec<FileEntry> {
    if relays.is_empty() {
        collector.warn(Category::General, "relays", "no relays configured, manifest fetch skipped");
        return Vec::new();
    }

    let reader_keys = Keys::generate();
    let client = Client::new(reader_keys);

    for relay in relays {
        if let Err(e) = client.add_relay(relay.as_str()).await {
            collector.warn(Category::Relay, relay, format!("failed to add relay: {e}"));
        }
    }
    client.connect().await;

    let filter = Filter::new().kind(Kind::Custom(NSITE_KIND)).author(pubkey);
    if let Err(e) = client.subscribe(filter, None).await {
        collector.warn(Category::General, "relays", format!("subscribe failed: {e}"));
        client.disconnect().await;
        return Vec::new();
    }

    let mut seen: HashMap<EventId, SeenEvent> = HashMap::new();
    let mut notifications = client.notifications();
    let deadline = tokio::time::Instant::now() + timeouts.hard_wall;

    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        let wait = remaining.min(timeouts.soft_inactivity);

        match tokio::time::timeout(wait, notifications.recv()).await {
            Ok(Ok(RelayPoolNotification::Event { relay_url, event, .. })) => {
                let id = event.id;
                seen.entry(id)
                    .and_modify(|existing| {
                        existing.found_on_relays.insert(relay_url.to_string());
                    })
                    .or_insert_with(|| {
                        let mut found = std::collections::BTreeSet::new();
                        found.insert(relay_url.to_string());
                        SeenEvent { event: (*event).clone(), found_on_relays: found }
                    });
            }
            Ok(Ok(_other)) => continue,
            Ok(Err(_channel_closed)) => break,
            // Soft inactivity timeout: no event arrived within the window.
            Err(_elapsed) => break,
        }
    }

    client.disconnect().await;

    if seen.is_empty() {
        collector.warn(Category::General, "relays", "manifest fetch returned no events");
    }

    reduce_to_latest_per_path(seen)
}

/// Reduce a set of events keyed by id to one [`FileEntry`] per `d`
/// (path) tag, keeping the event with the greatest `created_at`; the
/// loser's relay set is merged into the winner's.
fn reduce_to_latest_per_path(seen: HashMap<EventId, SeenEvent>) -> Vec<FileEntry> {
    let mut winners: HashMap<String, SeenEvent> = HashMap::new();

    for (_, candidate) in seen {
        let Some(path) = candidate
            .event
            .tags
            .iter()
            .find(|t| t.kind().as_str() == "d")
            .and_then(|t| t.content())
            .map(|s| s.to_string())
        else {
            continue;
        };

        match winners.get_mut(&path) {
            None => {
                winners.insert(path, candidate);
            }
            Some(current) => {
                if candidate.event.created_at > current.event.created_at {
                    let merged = std::mem::take(&mut current.found_on_relays);
                    let mut replacement = candidate;
                    replacement.found_on_relays.extend(merged);
                    *current = replacement;
                } else {
                    current.found_on_relays.extend(candidate.found_on_relays);
                }
            }
        }
    }

    let mut entries: Vec<FileEntry> = winners
        .into_iter()
        .filter_map(|(path, seen_event)| {
            let digest = seen_event
                .event
                .tags
                .iter()
                .find(|t| t.kind().as_str() == "x")
                .and_then(|t| t.content())
                .map(|s| s.to_string())?;
            Some(FileEntry::from_remote(
                path,
                digest,
                seen_event.event.id.to_hex(),
                seen_event.found_on_relays.into_iter().collect(),
            ))
        })
        .collect();

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    entries
}

/// Re-query `relays` for `event_id`, for the Verified Deletion
/// Orchestrator's confirmation step (spec 4.H: "re-query each relay for
/// each event id"). Returns the subset of `relays` that still answer
/// with the event.
pub async fn query_event_presence(event_id: EventId, relays: &[String], timeout: Duration) -> Vec<String> {
    if relays.is_empty() {
        return Vec::new();
    }

    let reader_keys = Keys::generate();
    let client = Client::new(reader_keys);
    for relay in relays {
        let _ = client.add_relay(relay.as_str()).await;
    }
    client.connect().await;

    let filter = Filter::new().id(event_id);
    let still_present = match client.subscribe(filter, None).await {
        Ok(_) => {
            let mut notifications = client.notifications();
            let mut present = std::collections::BTreeSet::new();
            let deadline = tokio::time::Instant::now() + timeout;
            loop {
                let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
                if remaining.is_zero() {
                    break;
                }
                match tokio::time::timeout(remaining, notifications.recv()).await {
                    Ok(Ok(RelayPoolNotification::Event { relay_url, event, .. })) if event.id == event_id => {
                        present.insert(relay_url.to_string());
                    }
                    Ok(Ok(_)) => continue,
                    _ => break,
                }
            }
            present.into_iter().collect()
        }
        Err(_) => Vec::new(),
    };

    client.disconnect().await;
    still_present
}
