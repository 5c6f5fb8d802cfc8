//! `ProjectConfig` load/save/validate — spec §6 "Persisted state layout".
//!
//! Searches the workspace root for a well-known filename, parses it,
//! then runs structural checks before anything downstream trusts the
//! result, stored as JSON per spec §6's explicit "One project
//! configuration document (JSON)".

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use nsyte_types::ProjectConfig;

/// Well-known config filename searched for in the target directory's
/// ancestry.
pub const CONFIG_FILE_NAME: &str = ".nsyte/config.json";

/// Schemes a relay or server URL is allowed to use. Anything else fails
/// validation (spec §7 `NsyteError::Configuration`).
const ALLOWED_RELAY_SCHEMES: [&str; 2] = ["wss://", "ws://"];
const ALLOWED_SERVER_SCHEMES: [&str; 2] = ["https://", "http://"];

/// Resolve the config path under `workspace_root` (spec: "persisted ...
/// document"). Does not check existence.
pub fn config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(CONFIG_FILE_NAME)
}

/// Load `ProjectConfig` from `workspace_root`'s config file, if present.
///
/// Returns `Ok(None)` when no config file exists yet (first run, or a
/// directory never published from), matching
/// `ShipperConfig::load_from_workspace`'s "no file is not an error" rule.
pub fn load_from_workspace(workspace_root: &Path) -> Result<Option<ProjectConfig>> {
    let path = config_path(workspace_root);
    if !path.exists() {
        return Ok(None);
    }
    load_from_file(&path).map(Some)
}

/// Load and parse a `ProjectConfig` from an exact file path.
pub fn load_from_file(path: &Path) -> Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config: ProjectConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file as JSON: {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config file: {}", path.display()))?;
    Ok(config)
}

/// Persist `config` to `workspace_root`'s config file, creating parent
/// directories as needed.
pub fn save_to_workspace(workspace_root: &Path, config: &ProjectConfig) -> Result<()> {
    let path = config_path(workspace_root);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config dir {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(config).context("failed to serialize config to JSON")?;
    std::fs::write(&path, json).with_context(|| format!("failed to write config file: {}", path.display()))?;
    Ok(())
}

/// Extension trait carrying the structural validation pass: non-empty
/// relay/server URL lists, each URL using an allowed scheme, and a
/// non-empty publisher pubkey.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

impl Validate for ProjectConfig {
    fn validate(&self) -> Result<()> {
        if self.publisher_pubkey.is_empty() {
            bail!("publisher_pubkey must not be empty");
        }

        if self.relays.is_empty() {
            bail!("relays must not be empty");
        }
        for relay in &self.relays {
            if !ALLOWED_RELAY_SCHEMES.iter().any(|scheme| relay.url.starts_with(scheme)) {
                bail!("relay url {} must use ws:// or wss://", relay.url);
            }
        }

        if self.servers.is_empty() {
            bail!("servers must not be empty");
        }
        for server in &self.servers {
            if !ALLOWED_SERVER_SCHEMES.iter().any(|scheme| server.starts_with(scheme)) {
                bail!("server url {server} must use http:// or https://");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nsyte_types::RelayListEntry;
    use tempfile::tempdir;

    fn sample() -> ProjectConfig {
        ProjectConfig {
            publisher_pubkey: "abc123".into(),
            relays: vec![RelayListEntry { url: "wss://r1.example".into(), read: true, write: true }],
            servers: vec!["https://s1.example".into()],
            bunker_pubkey: None,
            fallback_filename: None,
            profile_json: None,
            publish_server_list: false,
            publish_relay_list: false,
            gateway_hostnames: Vec::new(),
        }
    }

    #[test]
    fn missing_config_file_is_none_not_error() {
        let dir = tempdir().expect("tempdir");
        let loaded = load_from_workspace(dir.path()).expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().expect("tempdir");
        let config = sample();
        save_to_workspace(dir.path(), &config).expect("save");

        let loaded = load_from_workspace(dir.path()).expect("load").expect("present");
        assert_eq!(loaded, config);
    }

    #[test]
    fn rejects_non_wss_relay_scheme() {
        let mut config = sample();
        config.relays[0].url = "https://not-a-relay".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_server_list() {
        let mut config = sample();
        config.servers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_http_server_scheme() {
        let mut config = sample();
        config.servers[0] = "wss://not-a-server".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_file_runs_validation() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"publisher_pubkey":"","relays":[],"servers":[]}"#).unwrap();
        let err = load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("invalid config file"));
    }
}
