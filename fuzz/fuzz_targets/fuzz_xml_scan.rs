//! Fuzz target: XML response scanners.
//!
//! The scanners run over whatever bytes the endpoint returns; they must
//! never panic, whatever the input looks like.
#![no_main]

use libfuzzer_sys::fuzz_target;
use vimfork_client::xml::{tag_blocks, tag_content};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    for tag in ["returnval", "val", "propSet", "objects", "faultstring"] {
        let _ = tag_content(text, tag);
        let _ = tag_blocks(text, tag);
    }
});
