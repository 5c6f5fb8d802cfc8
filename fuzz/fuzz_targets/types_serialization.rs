#![no_main]

use libfuzzer_sys::fuzz_target;
use nsyte_types::{FileEntry, ManifestEventRecord, ProjectConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(json_str) = std::str::from_utf8(data) else { return };

    if let Ok(entry) = serde_json::from_str::<FileEntry>(json_str) {
        if let Ok(roundtripped) = serde_json::to_string(&entry) {
            if let Ok(parsed) = serde_json::from_str::<FileEntry>(&roundtripped) {
                assert_eq!(entry.path, parsed.path);
                assert_eq!(entry.digest, parsed.digest);
            }
        }
    }

    if let Ok(config) = serde_json::from_str::<ProjectConfig>(json_str) {
        if let Ok(roundtripped) = serde_json::to_string(&config) {
            if let Ok(parsed) = serde_json::from_str::<ProjectConfig>(&roundtripped) {
                assert_eq!(config.publisher_pubkey, parsed.publisher_pubkey);
                assert_eq!(config.relays.len(), parsed.relays.len());
            }
        }
    }

    if let Ok(record) = serde_json::from_str::<ManifestEventRecord>(json_str) {
        if let Ok(roundtripped) = serde_json::to_string(&record) {
            if let Ok(parsed) = serde_json::from_str::<ManifestEventRecord>(&roundtripped) {
                assert_eq!(record.event_id, parsed.event_id);
            }
        }
    }
});
