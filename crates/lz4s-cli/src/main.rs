/// lz4s command-line tool: stream-decompress LZ4 frame files.
///
/// # Command overview
///
/// ```text
/// lz4s <COMMAND> [OPTIONS]
///
/// Commands:
///   cat     Decompress one or more files to stdout or a file
///   info    Print frame metadata and stream statistics
///   test    Decode and discard, reporting integrity per file
///   help    Print help information
///
/// Global options:
///   -v, --verbose        More log output (repeatable)
///   -q, --quiet          Only log errors
///   --buffer-size BYTES  Capacity of both stream buffers
///   --no-checksum        Skip block and content checksum verification
///   --single-frame       Stop after the first frame of each file
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                        |
/// |------|------------------------------------------------|
/// | 0    | Success                                        |
/// | 1    | Error (I/O failure, corrupt or truncated file) |
///
/// Diagnostics go to stderr so stdout can be piped cleanly. A path of `-`
/// reads from stdin.
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use lz4s_reader::{FrameMode, Lz4Reader, ReaderConfig};

mod cmd_cat;
mod cmd_info;
mod cmd_test;

// ── CLI root ──────────────────────────────────────────────────────────────────

/// Streaming LZ4 frame decompressor.
#[derive(Parser)]
#[command(name = "lz4s", version, about = "Streaming LZ4 frame reader")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only report errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Capacity in bytes of the compressed and decompressed buffers.
    #[arg(long, global = true, value_name = "BYTES")]
    buffer_size: Option<usize>,

    /// Do not verify block or content checksums.
    #[arg(long, global = true)]
    no_checksum: bool,

    /// Stop at the end of the first frame; ignore anything after it.
    #[arg(long, global = true)]
    single_frame: bool,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Decompress files to stdout or to a single output file.
    Cat(CatArgs),
    /// Print frame metadata and stream statistics for a file.
    Info(InfoArgs),
    /// Decode files without writing output and report integrity.
    Test(TestArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `lz4s cat`.
///
/// Files are decompressed in order and concatenated.
#[derive(clap::Args)]
pub struct CatArgs {
    /// Compressed input files (`-` for stdin).
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Write to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for `lz4s info`.
#[derive(clap::Args)]
pub struct InfoArgs {
    /// Compressed input file (`-` for stdin).
    pub file: PathBuf,

    /// Emit a JSON object instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `lz4s test`.
#[derive(clap::Args)]
pub struct TestArgs {
    /// Compressed input files (`-` for stdin).
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Log level selected by the `-v` / `-q` flags.
fn log_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn reader_config(cli: &Cli, verbosity: LevelFilter) -> ReaderConfig {
    let mut config = ReaderConfig {
        verify_checksums: !cli.no_checksum,
        verbosity,
        ..ReaderConfig::default()
    };
    if let Some(size) = cli.buffer_size {
        config.compressed_capacity = size;
        config.decompressed_capacity = size;
    }
    if cli.single_frame {
        config.frame_mode = FrameMode::Single;
    }
    config
}

/// Open `path` as a compressed stream; `-` means stdin.
pub(crate) fn open_input(
    path: &Path,
    config: &ReaderConfig,
) -> Result<Lz4Reader<Box<dyn Read>>> {
    let source: Box<dyn Read> = if path.as_os_str() == "-" {
        Box::new(io::stdin().lock())
    } else {
        Box::new(File::open(path).with_context(|| format!("cannot open {}", path.display()))?)
    };
    Lz4Reader::new(source, config.clone())
        .with_context(|| format!("cannot read {}", path.display()))
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let level = log_level(cli.verbose, cli.quiet);
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();
    let config = reader_config(&cli, level);

    let result = match &cli.command {
        Commands::Cat(args) => cmd_cat::run(args, &config),
        Commands::Info(args) => cmd_info::run(args, &config),
        Commands::Test(args) => cmd_test::run(args, &config),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
