//! tagwire - Dump the field records of tagwire-encoded buffers
//!
//! This tool scans binary files in the single-byte-tag wire format and prints
//! every field record, optionally descending into nested messages.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, ValueEnum};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tagwire_core::{records, Decoder, DecoderConfig, FieldRecord, WireType};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Dump the field records of tagwire-encoded buffers
#[derive(Parser, Debug)]
#[command(name = "tagwire")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Which view of the buffer to print
    #[arg(long, value_enum, default_value = "records")]
    format: OutputFormat,

    /// Try to decode length-delimited payloads as nested messages
    #[arg(long)]
    nested: bool,

    /// Maximum nesting depth to descend into
    #[arg(long, default_value = "16", env = "TAGWIRE_MAX_DEPTH")]
    max_depth: usize,

    /// Reject inputs larger than this many bytes (0 = unlimited)
    #[arg(long, default_value = "0")]
    max_input_len: usize,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single encoded file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory of encoded files
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// Output format for dumped buffers
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Every record in wire order, including overwritten ones
    Records,
    /// One line per field number, last occurrence only
    Fields,
}

impl Cli {
    fn decoder(&self) -> Decoder {
        Decoder::with_config(
            DecoderConfig::new()
                .max_depth(self.max_depth)
                .max_input_len(self.max_input_len),
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    // Dispatch based on input mode
    if let Some(ref file) = cli.input.file {
        process_single_file(&cli, file, &mut out)
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&cli, directory, &mut out)
    } else {
        bail!("Either --file or --directory must be specified")
    }
}

/// Dump a single file
fn process_single_file(cli: &Cli, file: &Path, out: &mut impl Write) -> Result<()> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }

    dump_file(cli, file, out)
}

/// Dump every file under a directory, continuing past undecodable ones
fn process_directory(cli: &Cli, directory: &Path, out: &mut impl Write) -> Result<()> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut decoded = 0;
    let mut failed = 0;

    let mut entries: Vec<PathBuf> = WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file())
        .collect();
    entries.sort();

    for path in entries {
        // Skip hidden files
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
        {
            trace!("Skipping hidden file: {}", path.display());
            continue;
        }

        writeln!(out, "== {}", path.display())?;
        match dump_file(cli, &path, out) {
            Ok(()) => decoded += 1,
            Err(e) => {
                // Log error but continue with other files
                warn!("Error processing {}: {:#}", path.display(), e);
                failed += 1;
            }
        }
    }

    info!("Summary: {} decoded, {} failed", decoded, failed);
    Ok(())
}

/// Scan one file and print its records
fn dump_file(cli: &Cli, path: &Path, out: &mut impl Write) -> Result<()> {
    trace!("Reading {}", path.display());
    let data =
        fs::read(path).with_context(|| format!("Failed to read input file: {}", path.display()))?;

    debug!("Read {} bytes from {}", data.len(), path.display());
    dump_buffer(cli, &data, out).with_context(|| format!("Failed to decode {}", path.display()))
}

/// Print the records of an in-memory buffer
fn dump_buffer(cli: &Cli, data: &[u8], out: &mut impl Write) -> Result<()> {
    // Scanning the whole buffer first keeps output all-or-nothing
    let fields = cli.decoder().scan(data)?;

    match cli.format {
        OutputFormat::Records => {
            for record in records(data) {
                write_record(cli, &record?, 0, out)?;
            }
        }
        OutputFormat::Fields => {
            for record in fields.field_numbers().filter_map(|n| fields.record(n)) {
                write_record(cli, record, 0, out)?;
            }
        }
    }
    Ok(())
}

/// Write one record line, then its nested records when requested
fn write_record(cli: &Cli, record: &FieldRecord, depth: usize, out: &mut impl Write) -> Result<()> {
    let indent = "  ".repeat(depth);
    writeln!(
        out,
        "{}{} {} @{} [{}] {}",
        indent,
        record.number,
        record.wire_type,
        record.offset,
        record.payload.len(),
        render_value(record)
    )?;

    if cli.nested && record.wire_type == WireType::LengthDelimited && depth < cli.max_depth {
        if let Some(children) = nested_records(&record.payload) {
            for child in &children {
                write_record(cli, child, depth + 1, out)?;
            }
        }
    }
    Ok(())
}

/// Records of a payload if it parses cleanly as a non-empty message
fn nested_records(payload: &[u8]) -> Option<Vec<FieldRecord>> {
    if payload.is_empty() {
        return None;
    }
    match records(payload).collect::<tagwire_core::Result<Vec<_>>>() {
        Ok(children) => Some(children),
        Err(e) => {
            trace!("Payload is not a nested message: {}", e);
            None
        }
    }
}

/// Human-readable rendering of a record's payload
fn render_value(record: &FieldRecord) -> String {
    let payload = &record.payload[..];
    match record.wire_type {
        WireType::Varint => {
            let value = le_u64(payload);
            if (value as i64) < 0 {
                format!("{} ({})", value, value as i64)
            } else {
                value.to_string()
            }
        }
        WireType::Fixed32 => {
            let value = le_u64(payload) as u32;
            format!("{} ({})", value, f32::from_bits(value))
        }
        WireType::Fixed64 => {
            let value = le_u64(payload);
            format!("{} ({})", value, f64::from_bits(value))
        }
        _ => match std::str::from_utf8(payload) {
            Ok(text) if !text.chars().any(|c| c.is_control()) => format!("{:?}", text),
            _ => hex(payload),
        },
    }
}

fn le_u64(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .take(8)
        .enumerate()
        .fold(0, |acc, (i, &b)| acc | u64::from(b) << (8 * i))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ")
}
