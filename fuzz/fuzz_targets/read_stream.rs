#![no_main]

use libfuzzer_sys::fuzz_target;
use lz4s_reader::{Lz4Reader, ReadError, ReaderConfig, StreamState};

// Fuzz target: Lz4Reader over arbitrary bytes with tiny buffers.
//
// The reader must either fail cleanly or reach end of stream; it must
// never panic, loop, or deliver more than the declared block limits allow.
fuzz_target!(|data: &[u8]| {
    let config = ReaderConfig {
        compressed_capacity: 7,
        decompressed_capacity: 5,
        ..ReaderConfig::default()
    };
    let Ok(mut reader) = Lz4Reader::new(data, config) else {
        return;
    };

    let mut buf = [0u8; 11];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => {
                assert_eq!(reader.state(), StreamState::Exhausted);
                break;
            }
            Ok(_) => {}
            Err(_) => {
                assert_eq!(reader.state(), StreamState::Failed);
                assert!(matches!(reader.read(&mut buf), Err(ReadError::Failed)));
                break;
            }
        }
    }
    reader.close();
});
