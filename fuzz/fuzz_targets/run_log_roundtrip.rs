#![no_main]

use std::fs;

use libfuzzer_sys::fuzz_target;
use nsyte_collector::Collector;
use tempfile::tempdir;

fuzz_target!(|data: &[u8]| {
    let Ok(td) = tempdir() else { return };
    let path = td.path().join("run.jsonl");
    if fs::write(&path, data).is_ok() {
        let _ = Collector::read_from_file(&path);
    }
});
