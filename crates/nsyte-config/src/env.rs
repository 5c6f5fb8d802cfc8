//! Environment-variable test seams — spec §6.
//!
//! Reads the process environment once per call and exposes a small
//! typed surface, narrowed to the two env vars spec §6 names.

use std::env;

/// `NSYTE_DISABLE_KEYCHAIN=true` disables OS keychain access (spec §6:
/// "test mode"). Checked once per call rather than cached, so tests using
/// `temp-env`/`serial_test` can toggle it within a process.
pub fn keychain_disabled() -> bool {
    is_truthy_env("NSYTE_DISABLE_KEYCHAIN")
}

/// `NSYTE_TEST_MODE=true` places the process in test mode for safer
/// defaults (spec §6).
pub fn test_mode() -> bool {
    is_truthy_env("NSYTE_TEST_MODE")
}

fn is_truthy_env(name: &str) -> bool {
    env::var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1").unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn keychain_disabled_reads_truthy_values() {
        temp_env::with_var("NSYTE_DISABLE_KEYCHAIN", Some("true"), || {
            assert!(keychain_disabled());
        });
        temp_env::with_var("NSYTE_DISABLE_KEYCHAIN", Some("false"), || {
            assert!(!keychain_disabled());
        });
        temp_env::with_var("NSYTE_DISABLE_KEYCHAIN", None::<&str>, || {
            assert!(!keychain_disabled());
        });
    }

    #[test]
    #[serial]
    fn test_mode_reads_truthy_values() {
        temp_env::with_var("NSYTE_TEST_MODE", Some("1"), || {
            assert!(test_mode());
        });
        temp_env::with_var("NSYTE_TEST_MODE", None::<&str>, || {
            assert!(!test_mode());
        });
    }
}
