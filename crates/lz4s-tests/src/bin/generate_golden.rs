//! Golden fixture generator for the lz4s conformance suite.
//!
//! Writes every fixture from [`lz4s_tests::golden_fixtures`] to
//! `tests/golden/`. Run it after changing `FrameBuilder`; the conformance
//! tests fail if the committed files drift from what the builder emits.
//!
//! ```bash
//! cargo run --bin generate_golden -p lz4s-tests
//! ```
//!
//! | File               | Contents                                          |
//! |--------------------|---------------------------------------------------|
//! | empty.lz4          | No blocks, content checksum only                  |
//! | hello_stored.lz4   | One stored block, no optional fields              |
//! | all_flags.lz4      | Literal block with every checksum and size field  |
//! | dict_id.lz4        | Stored block, dictionary id 0xDEADBEEF            |
//! | two_blocks_4mb.lz4 | Stored + literal block, 4 MiB maximum, checksums  |
//! | concatenated.lz4   | hello_stored + skippable frame + all_flags        |

#![allow(clippy::pedantic)]

use std::path::PathBuf;

fn main() {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let golden_dir = manifest_dir.join("tests/golden");
    std::fs::create_dir_all(&golden_dir).expect("create_dir_all");

    for fixture in lz4s_tests::golden_fixtures() {
        let path = golden_dir.join(fixture.name);
        std::fs::write(&path, &fixture.frame).expect("write fixture");
        println!("  wrote {} ({} bytes)", path.display(), fixture.frame.len());
    }

    println!("All golden fixtures written to {}", golden_dir.display());
}
