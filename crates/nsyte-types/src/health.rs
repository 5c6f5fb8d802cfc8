//! `ServerHealth` — spec §3 and the circuit-breaker rule in 4.G.

use std::collections::HashMap;
use std::sync::Mutex;

/// Consecutive-failure threshold at which a server is treated as
/// unavailable for subsequent probes (spec 4.G: "servers with >=3
/// consecutive failures are skipped").
pub const SKIP_THRESHOLD: u32 = 3;

/// Per-server counter of consecutive failures.
///
/// Invariant: on any successful response (including an authoritative
/// "not found") the counter resets to zero; when the counter reaches
/// [`SKIP_THRESHOLD`] the server is treated as unavailable until a
/// successful probe resets it.
#[derive(Debug, Default)]
pub struct ServerHealthTable {
    counters: Mutex<HashMap<String, u32>>,
}

impl ServerHealthTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful response (200 present, or 404 absent — both
    /// are authoritative and reset the counter).
    pub fn record_success(&self, server: &str) {
        let mut counters = self.counters.lock().expect("server health lock poisoned");
        counters.insert(server.to_string(), 0);
    }

    /// Record a terminal failure (retries exhausted) for a server.
    pub fn record_failure(&self, server: &str) -> u32 {
        let mut counters = self.counters.lock().expect("server health lock poisoned");
        let count = counters.entry(server.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Whether a server should be skipped by the probe/uploader because
    /// it has accumulated too many consecutive failures.
    pub fn is_skipped(&self, server: &str) -> bool {
        let counters = self.counters.lock().expect("server health lock poisoned");
        counters.get(server).copied().unwrap_or(0) >= SKIP_THRESHOLD
    }

    /// Current consecutive-failure count for a server (0 if never probed
    /// or currently healthy).
    pub fn failure_count(&self, server: &str) -> u32 {
        let counters = self.counters.lock().expect("server health lock poisoned");
        counters.get(server).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_consecutive_failures_trip_the_breaker() {
        let table = ServerHealthTable::new();
        assert!(!table.is_skipped("s1"));
        table.record_failure("s1");
        table.record_failure("s1");
        assert!(!table.is_skipped("s1"));
        table.record_failure("s1");
        assert!(table.is_skipped("s1"));
    }

    #[test]
    fn success_resets_the_counter() {
        let table = ServerHealthTable::new();
        table.record_failure("s1");
        table.record_failure("s1");
        table.record_failure("s1");
        assert!(table.is_skipped("s1"));

        table.record_success("s1");
        assert!(!table.is_skipped("s1"));
        assert_eq!(table.failure_count("s1"), 0);
    }

    #[test]
    fn health_is_per_server() {
        let table = ServerHealthTable::new();
        table.record_failure("s1");
        table.record_failure("s1");
        table.record_failure("s1");
        assert!(table.is_skipped("s1"));
        assert!(!table.is_skipped("s2"));
    }
}
