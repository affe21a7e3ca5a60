//! Fuzz target: entity escaping round trip.
#![no_main]

use libfuzzer_sys::fuzz_target;
use vimfork_client::xml::{escape, unescape};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let escaped = escape(text);
    // Escaped output must contain no raw markup characters.
    assert!(!escaped.contains('<') && !escaped.contains('>') && !escaped.contains('"'));
    assert_eq!(unescape(&escaped), text);

    // Unescaping arbitrary input must never panic either.
    let _ = unescape(text);
});
