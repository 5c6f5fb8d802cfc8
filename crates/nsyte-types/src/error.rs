//! `NsyteError` — the typed error taxonomy from spec §7.
//!
//! Deliberately coarser-grained than `anyhow`'s chain-of-context style:
//! every fallible nsyte operation returns one of these variants so the
//! orchestrator and CLI can decide retry/report/exit-code behavior by
//! matching on a closed set, while still carrying a human-readable
//! `source`/`context` string for the report.

use thiserror::Error;

/// The closed set of error categories an nsyte operation can fail with
/// (spec §7).
#[derive(Debug, Error)]
pub enum NsyteError {
    /// Missing/invalid project configuration, or a config file that
    /// cannot be parsed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Signing or key-resolution failure (local key, bunker, or stored
    /// token all failed to produce a usable signer).
    #[error("authentication error: {0}")]
    Auth(String),

    /// A network condition expected to be transient: timeout, connection
    /// reset, 5xx from a relay or server. Callers may retry.
    #[error("transient network error: {0}")]
    NetworkTransient(String),

    /// A network condition that retrying will not fix: TLS failure, DNS
    /// resolution failure, 4xx other than auth/not-found.
    #[error("terminal network error: {0}")]
    NetworkTerminal(String),

    /// The requested resource (blob, event, relay, server) does not
    /// exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A relay explicitly rejected a published event (`ok=false`).
    #[error("relay rejected event: {0}")]
    RelayRejection(String),

    /// The overall operation completed with some but not all of its
    /// sub-operations succeeding (spec §7: "partial success is reported,
    /// never silently dropped").
    #[error("partial success: {0}")]
    Partial(String),
}

impl NsyteError {
    /// Whether retrying the operation that produced this error might
    /// succeed, independent of any particular retry policy's
    /// classification of the underlying cause.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NsyteError::NetworkTransient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_network_errors_are_retryable() {
        assert!(NsyteError::NetworkTransient("timeout".into()).is_retryable());
        assert!(!NsyteError::NetworkTerminal("tls".into()).is_retryable());
        assert!(!NsyteError::Auth("bad key".into()).is_retryable());
        assert!(!NsyteError::Configuration("missing field".into()).is_retryable());
        assert!(!NsyteError::NotFound("blob".into()).is_retryable());
        assert!(!NsyteError::RelayRejection("blocked".into()).is_retryable());
        assert!(!NsyteError::Partial("3/5 servers".into()).is_retryable());
    }

    #[test]
    fn display_includes_the_context_string() {
        let err = NsyteError::NotFound("blob abcd1234".into());
        assert_eq!(err.to_string(), "not found: blob abcd1234");
    }
}
