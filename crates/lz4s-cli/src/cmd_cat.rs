//! Implementation of `lz4s cat`.
//!
//! Streams each input through an [`Lz4Reader`](lz4s_reader::Lz4Reader)
//! into one writer. Memory use is bounded by the configured buffer sizes,
//! regardless of file size.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use lz4s_reader::ReaderConfig;

use crate::{CatArgs, open_input};

/// Run the `lz4s cat` command.
///
/// # Errors
///
/// Returns an error if an input cannot be opened or decoded, or if the
/// output cannot be written. Output already written is left in place.
pub fn run(args: &CatArgs, config: &ReaderConfig) -> Result<()> {
    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    for path in &args.files {
        let mut reader = open_input(path, config)?;
        let written = io::copy(&mut reader, &mut out)
            .with_context(|| format!("failed to decompress {}", path.display()))?;
        log::info!("{}: {written} bytes", path.display());
        reader.close();
    }

    out.flush().context("cannot flush output")
}
