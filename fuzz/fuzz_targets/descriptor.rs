#![no_main]

use libfuzzer_sys::fuzz_target;
use lz4s_frame::FrameInfo;

// Fuzz target: FrameInfo::read_from descriptor parsing.
//
// Catches bugs in:
// - FLG/BD bit handling
// - Optional field offsets (content size, dictionary id)
// - Short buffers
fuzz_target!(|data: &[u8]| {
    if let Ok(info) = FrameInfo::read_from(data) {
        assert!(data.len() >= FrameInfo::descriptor_len(data[0]));
        let _ = info.to_string();
    }
});
