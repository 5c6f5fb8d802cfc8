#![no_main]

use libfuzzer_sys::fuzz_target;
use nsyte_signer::BunkerUri;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else { return };
    let _ = BunkerUri::parse(raw);
});
