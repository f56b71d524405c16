#![no_main]

use std::io::{Read, Write};

use libfuzzer_sys::fuzz_target;
use lz4_flex::frame::{BlockMode, FrameEncoder, FrameInfo};
use lz4s_reader::{Lz4Reader, ReaderConfig};

// Fuzz target: lz4_flex encode -> Lz4Reader read roundtrip.
//
// Input format:
//   byte 0:     bit 0 = linked blocks, bit 1 = block checksums,
//               bit 2 = content checksum
//   byte 1:     buffer capacity seed
//   bytes 2..:  payload
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let (opts, payload) = (data[0], &data[2..]);
    let mode = if opts & 1 != 0 { BlockMode::Linked } else { BlockMode::Independent };
    let info = FrameInfo::new()
        .block_mode(mode)
        .block_checksums(opts & 2 != 0)
        .content_checksum(opts & 4 != 0);

    let mut encoder = FrameEncoder::with_frame_info(info, Vec::new());
    encoder.write_all(payload).unwrap();
    let frame = encoder.finish().unwrap();

    let capacity = 4 + usize::from(data[1]);
    let config = ReaderConfig {
        compressed_capacity: capacity,
        decompressed_capacity: capacity,
        ..ReaderConfig::default()
    };
    let mut reader = Lz4Reader::new(&frame[..], config).unwrap();
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    assert_eq!(out, payload);
});
