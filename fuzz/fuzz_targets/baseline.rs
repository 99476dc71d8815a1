#![no_main]

use libfuzzer_sys::fuzz_target;
use testbed::backend::extract_result;
use testbed::compare::normalize_newlines;

fuzz_target!(|data: &[u8]| {
    let once = normalize_newlines(data);
    assert!(once.len() <= data.len());
    // Without CR runs a second pass has nothing left to collapse
    if !data.windows(2).any(|w| w == b"\r\r") {
        assert_eq!(normalize_newlines(&once), once);
    }

    if let Ok(s) = std::str::from_utf8(data) {
        if let Some(token) = extract_result(s) {
            assert!(!token.contains(')'));
        }
    }
});
