#![no_main]

use std::fs;

use libfuzzer_sys::fuzz_target;
use nsyte_config::load_from_file;
use tempfile::tempdir;

fuzz_target!(|data: &[u8]| {
    let Ok(td) = tempdir() else { return };
    let path = td.path().join("config.json");
    if fs::write(&path, data).is_err() {
        return;
    }
    let _ = load_from_file(&path);
});
