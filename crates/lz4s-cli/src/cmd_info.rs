//! Implementation of `lz4s info`.
//!
//! Decodes the whole file to measure it and prints the first frame's
//! descriptor alongside stream totals.
//!
//! ```text
//! File:          data.lz4
//! Block size:    64KiB
//! Block mode:    independent
//! Block checks:  no
//! Content check: yes
//! Content size:  (not stored)
//! Dictionary id: (none)
//! Frames:        1
//! Compressed:    1234 bytes
//! Decompressed:  5678 bytes  (ratio 4.60)
//! ```

use std::io;

use anyhow::{Context, Result};
use lz4s_reader::{FrameInfo, ReaderConfig, StreamStats};
use serde::Serialize;

use crate::{InfoArgs, open_input};

/// Machine-readable form of the report, emitted with `--json`.
#[derive(Debug, Serialize)]
struct InfoReport {
    file: String,
    block_size: usize,
    block_mode: String,
    block_checksums: bool,
    content_checksum: bool,
    content_size: Option<u64>,
    dict_id: Option<u32>,
    frames: u64,
    compressed_bytes: u64,
    decompressed_bytes: u64,
}

impl InfoReport {
    fn new(file: String, info: &FrameInfo, stats: StreamStats) -> Self {
        Self {
            file,
            block_size: info.block_size.bytes(),
            block_mode: info.block_mode.to_string(),
            block_checksums: info.block_checksums,
            content_checksum: info.content_checksum,
            content_size: info.content_size,
            dict_id: info.dict_id,
            frames: stats.frames,
            compressed_bytes: stats.compressed_bytes,
            decompressed_bytes: stats.decompressed_bytes,
        }
    }
}

/// Run the `lz4s info` command.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or fails to decode.
pub fn run(args: &InfoArgs, config: &ReaderConfig) -> Result<()> {
    let mut reader = open_input(&args.file, config)?;
    // The descriptor is parsed at open, before any block is read.
    let info = reader
        .frame_info()
        .copied()
        .context("stream has no frame descriptor")?;

    io::copy(&mut reader, &mut io::sink())
        .with_context(|| format!("failed to decompress {}", args.file.display()))?;
    let stats = reader.stats();
    reader.close();

    let report = InfoReport::new(args.file.display().to_string(), &info, stats);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_text(&report, &info);
    }
    Ok(())
}

fn print_text(report: &InfoReport, info: &FrameInfo) {
    let yes_no = |b: bool| if b { "yes" } else { "no" };

    println!("File:          {}", report.file);
    println!("Block size:    {}", info.block_size);
    println!("Block mode:    {}", report.block_mode);
    println!("Block checks:  {}", yes_no(report.block_checksums));
    println!("Content check: {}", yes_no(report.content_checksum));
    match report.content_size {
        Some(size) => println!("Content size:  {size} bytes"),
        None => println!("Content size:  (not stored)"),
    }
    match report.dict_id {
        Some(id) => println!("Dictionary id: {id:#010X}"),
        None => println!("Dictionary id: (none)"),
    }
    println!("Frames:        {}", report.frames);
    println!("Compressed:    {} bytes", report.compressed_bytes);
    print!("Decompressed:  {} bytes", report.decompressed_bytes);
    if report.compressed_bytes > 0 {
        #[allow(clippy::cast_precision_loss)]
        let ratio = report.decompressed_bytes as f64 / report.compressed_bytes as f64;
        println!("  (ratio {ratio:.2})");
    } else {
        println!();
    }
}
