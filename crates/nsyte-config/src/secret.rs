//! Secret-store collaborator interface — spec §1 / §6.
//!
//! The OS keychain itself is an out-of-core collaborator (spec §1: "secret
//! storage (OS keychain)"); this crate only owns the narrow trait nsyte
//! calls through, keyed by the bunker pubkey recorded in
//! [`nsyte_types::ProjectConfig::bunker_pubkey`] (spec §6: "fetched from the
//! OS secret store ... keyed by the bunker pubkey"). A single
//! lookup-by-key call, since nsyte's secrets are per-bunker rather than
//! per-registry.

use anyhow::Result;

/// Resolves a stored secret (an "nbunksec" connection string) by the
/// bunker pubkey it belongs to. Real implementations reach the OS
/// keychain; [`InMemorySecretStore`] below exists for tests and for
/// [`crate::env::keychain_disabled`]'s "test mode" path.
pub trait SecretStore: Send + Sync {
    /// Look up the stored nbunksec string for `bunker_pubkey`, if any.
    fn get(&self, bunker_pubkey: &str) -> Result<Option<String>>;

    /// Store or overwrite the nbunksec string for `bunker_pubkey`.
    fn set(&self, bunker_pubkey: &str, nbunksec: &str) -> Result<()>;

    /// Remove any stored secret for `bunker_pubkey`.
    fn remove(&self, bunker_pubkey: &str) -> Result<()>;
}

/// A `SecretStore` backed by an in-process map rather than the OS
/// keychain. Used under `NSYTE_DISABLE_KEYCHAIN=true` (spec §6: "test
/// mode") and in unit tests.
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    entries: std::sync::Mutex<std::collections::HashMap<String, String>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for InMemorySecretStore {
    fn get(&self, bunker_pubkey: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().expect("secret store lock poisoned").get(bunker_pubkey).cloned())
    }

    fn set(&self, bunker_pubkey: &str, nbunksec: &str) -> Result<()> {
        self.entries
            .lock()
            .expect("secret store lock poisoned")
            .insert(bunker_pubkey.to_string(), nbunksec.to_string());
        Ok(())
    }

    fn remove(&self, bunker_pubkey: &str) -> Result<()> {
        self.entries.lock().expect("secret store lock poisoned").remove(bunker_pubkey);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_entry_is_none() {
        let store = InMemorySecretStore::new();
        assert!(store.get("abc").unwrap().is_none());
    }

    #[test]
    fn set_then_get_round_trips() {
        let store = InMemorySecretStore::new();
        store.set("abc", "bunker://...").unwrap();
        assert_eq!(store.get("abc").unwrap().as_deref(), Some("bunker://..."));
    }

    #[test]
    fn remove_clears_the_entry() {
        let store = InMemorySecretStore::new();
        store.set("abc", "bunker://...").unwrap();
        store.remove("abc").unwrap();
        assert!(store.get("abc").unwrap().is_none());
    }
}
