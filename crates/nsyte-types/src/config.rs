//! `ProjectConfig` — spec §3: identifies the publisher and defaults.

use serde::{Deserialize, Serialize};

use crate::event::RelayListEntry;

/// Persisted project configuration (spec §3). Stored as JSON by
/// `nsyte-config` because the config mirrors a signed JSON event payload
/// (server list, relay list, profile) closely enough that round-tripping
/// through the same format avoids a second schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Hex-encoded publisher public key. Always present; derived from
    /// the signer at first run if not supplied.
    pub publisher_pubkey: String,

    /// Relays to query and publish to.
    #[serde(default)]
    pub relays: Vec<RelayListEntry>,

    /// Blob servers to probe and upload to.
    #[serde(default)]
    pub servers: Vec<String>,

    /// Hex-encoded pubkey of a NIP-46 bunker, when signing is delegated
    /// rather than done with a local key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bunker_pubkey: Option<String>,

    /// Filename served when a directory path has no exact match
    /// (spec 4.A: e.g. `index.html`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_filename: Option<String>,

    /// Raw JSON profile payload to publish alongside the manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_json: Option<String>,

    /// Publish the server list (kind 10063) on this run.
    #[serde(default)]
    pub publish_server_list: bool,

    /// Publish the relay list (kind 10002) on this run.
    #[serde(default)]
    pub publish_relay_list: bool,

    /// Gateway hostnames this site is also reachable at, recorded for
    /// report purposes only (spec §3: "optional gateway hostnames").
    #[serde(default)]
    pub gateway_hostnames: Vec<String>,
}

impl ProjectConfig {
    /// Relay URLs marked writable, in declaration order.
    pub fn write_relays(&self) -> Vec<&str> {
        self.relays
            .iter()
            .filter(|r| r.write)
            .map(|r| r.url.as_str())
            .collect()
    }

    /// Relay URLs marked readable, in declaration order.
    pub fn read_relays(&self) -> Vec<&str> {
        self.relays
            .iter()
            .filter(|r| r.read)
            .map(|r| r.url.as_str())
            .collect()
    }

    /// A config is usable once it names at least one relay and one
    /// server; `nsyte-config` validates this at load time.
    pub fn is_minimally_valid(&self) -> bool {
        !self.relays.is_empty() && !self.servers.is_empty() && !self.publisher_pubkey.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProjectConfig {
        ProjectConfig {
            publisher_pubkey: "abc123".into(),
            relays: vec![
                RelayListEntry { url: "wss://r1".into(), read: true, write: true },
                RelayListEntry { url: "wss://r2".into(), read: true, write: false },
            ],
            servers: vec!["https://s1".into()],
            bunker_pubkey: None,
            fallback_filename: Some("index.html".into()),
            profile_json: None,
            publish_server_list: false,
            publish_relay_list: false,
            gateway_hostnames: Vec::new(),
        }
    }

    #[test]
    fn write_relays_filters_by_write_flag() {
        let config = sample();
        assert_eq!(config.write_relays(), vec!["wss://r1"]);
        assert_eq!(config.read_relays(), vec!["wss://r1", "wss://r2"]);
    }

    #[test]
    fn empty_relays_or_servers_is_not_minimally_valid() {
        let mut config = sample();
        config.relays.clear();
        assert!(!config.is_minimally_valid());

        let mut config = sample();
        config.servers.clear();
        assert!(!config.is_minimally_valid());
    }

    #[test]
    fn serializes_without_null_optional_fields() {
        let config = sample();
        let json = serde_json::to_string(&config).expect("serialize");
        assert!(!json.contains("bunker_pubkey"));
        assert!(json.contains("fallback_filename"));
    }
}
