//! Event Publisher — spec 4.F.

use std::time::Duration;

use nostr::{Event, EventBuilder};
use nostr_sdk::Client;

use nsyte_retry::{calculate_delay, RetryPolicy};
use nsyte_signer::Signer;
use nsyte_types::{NsyteError, PublicationReport, RelayAck};

/// Per-relay timeout for one publish round trip (spec 4.F: "~5s").
#[derive(Debug, Clone, Copy)]
pub struct PublishTimeouts {
    pub per_relay: Duration,
}

impl Default for PublishTimeouts {
    fn default() -> Self {
        Self { per_relay: Duration::from_secs(5) }
    }
}

/// Sign `builder` and dispatch it to every relay the `client` is
/// connected to, concurrently, with a conservative one-retry budget
/// (`nsyte_retry::RetryPolicy::Conservative`, spec 4.F). Returns the
/// signed event and the full per-relay acceptance map; the event is
/// "published" when at least one relay accepted
/// ([`PublicationReport::is_published`]).
pub async fn publish_event(
    client: &Client,
    builder: EventBuilder,
    signer: &dyn Signer,
    timeouts: PublishTimeouts,
) -> Result<(Event, PublicationReport), NsyteError> {
    let event = signer.sign(builder).await?;
    let mut report = PublicationReport::default();

    let policy = RetryPolicy::Conservative.to_config();
    let mut attempt = 1u32;

    loop {
        let outcome = tokio::time::timeout(timeouts.per_relay, client.send_event(&event)).await;

        match outcome {
            Ok(Ok(output)) => {
                for relay in &output.success {
                    report.per_relay.insert(relay.to_string(), RelayAck::Accepted);
                }
                for (relay, reason) in &output.failed {
                    report
                        .per_relay
                        .entry(relay.to_string())
                        .or_insert_with(|| classify_failure(reason));
                }
            }
            Ok(Err(e)) => {
                // The whole send failed (e.g. no relays connected); record
                // nothing relay-specific, the caller sees an empty report.
                if attempt >= policy.max_attempts {
                    return Err(NsyteError::NetworkTransient(format!("publish failed: {e}")));
                }
            }
            Err(_elapsed) => {
                // Transport-level timeout across all relays for this attempt.
            }
        }

        let all_accepted = !report.per_relay.is_empty()
            && report.per_relay.values().all(RelayAck::is_accepted);
        if all_accepted || attempt >= policy.max_attempts {
            break;
        }

        let delay = calculate_delay(&policy, attempt);
        tokio::time::sleep(delay).await;
        attempt += 1;
    }

    Ok((event, report))
}

fn classify_failure(reason: &str) -> RelayAck {
    let lowered = reason.to_ascii_lowercase();
    if lowered.contains("timeout") || lowered.contains("connect") || lowered.contains("disconnected") {
        RelayAck::ConnectionError { detail: reason.to_string() }
    } else {
        RelayAck::Rejected { reason: reason.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_failure_detects_connection_errors() {
        assert!(matches!(classify_failure("connection timeout"), RelayAck::ConnectionError { .. }));
        assert!(matches!(classify_failure("blocked: spam"), RelayAck::Rejected { .. }));
    }

    #[test]
    fn default_timeouts_match_spec_4f() {
        assert_eq!(PublishTimeouts::default().per_relay, Duration::from_secs(5));
    }
}
