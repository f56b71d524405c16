//! Implementation of `lz4s test`.
//!
//! Decodes every input to a sink and prints one line per file:
//!
//! ```text
//! ✓ a.lz4: 5678 bytes in 1 frame
//! ✗ b.lz4: decompression failed: block checksum mismatch ...
//! ```
//!
//! All files are checked even after a failure; the command fails if any did.

use std::io;
use std::path::Path;

use anyhow::{Result, bail};
use lz4s_reader::{ReaderConfig, StreamStats};

use crate::{TestArgs, open_input};

/// Run the `lz4s test` command.
///
/// # Errors
///
/// Returns an error if at least one file failed to decode.
pub fn run(args: &TestArgs, config: &ReaderConfig) -> Result<()> {
    let mut failed = 0usize;
    for path in &args.files {
        match check(path, config) {
            Ok(stats) => println!(
                "✓ {}: {} bytes in {} frame{}",
                path.display(),
                stats.decompressed_bytes,
                stats.frames,
                if stats.frames == 1 { "" } else { "s" }
            ),
            Err(e) => {
                failed += 1;
                println!("✗ {}: {e:#}", path.display());
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} files failed", args.files.len());
    }
    Ok(())
}

fn check(path: &Path, config: &ReaderConfig) -> Result<StreamStats> {
    let mut reader = open_input(path, config)?;
    io::copy(&mut reader, &mut io::sink())?;
    let stats = reader.stats();
    reader.close();
    Ok(stats)
}
