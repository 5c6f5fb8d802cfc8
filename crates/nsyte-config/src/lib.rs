//! `ProjectConfig` I/O and the out-of-core secret-store collaborator
//! interface for nsyte (spec §6 "Persisted state layout" and
//! "Environment variables").
//!
//! Covers load-from-workspace, validation, env-driven test-mode seams,
//! and layered secret resolution, with nsyte's JSON config format and
//! per-bunker secret keying.

mod env;
mod file;
mod secret;

pub use env::{keychain_disabled, test_mode};
pub use file::{config_path, load_from_file, load_from_workspace, save_to_workspace, Validate, CONFIG_FILE_NAME};
pub use secret::{InMemorySecretStore, SecretStore};
