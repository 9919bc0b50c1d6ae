#![no_main]

use libfuzzer_sys::fuzz_target;

use tasknet_ledger::StateUpdate;

// Parse untrusted state update files; shape validation must never panic.
fuzz_target!(|data: &[u8]| {
    if let Ok(update) = serde_json::from_slice::<StateUpdate>(data) {
        let _ = update.validate_shape();
    }
});
