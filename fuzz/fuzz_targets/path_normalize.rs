#![no_main]

use libfuzzer_sys::fuzz_target;
use nsyte_types::PathKey;

fuzz_target!(|data: &str| {
    let once = PathKey::normalize(data);
    let twice = PathKey::normalize(&once.display);
    assert_eq!(once.normalized, twice.normalized);
});
