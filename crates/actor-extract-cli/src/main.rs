//! actor-extract CLI
//!
//! Runs the same extraction pipeline as the upload service against a local
//! archive and prints the result as JSON.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use actor_extract_archive::{
    has_suffix, list_entries, DEFAULT_CONTENT_TYPE, DEFAULT_JSON_SUFFIX,
};
use actor_extract_core::{ActorExtractor, ProcessorConfig};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

/// Parse a human-readable file size string into bytes.
///
/// Accepts plain byte counts and `K`/`M`/`G` suffixes, with or without a
/// trailing `B` ("100M", "1.5GB", "512k").
fn parse_file_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty file size".to_string());
    }

    let upper = s.to_ascii_uppercase();
    let unit_stripped = upper.strip_suffix('B').unwrap_or(&upper);
    let (num_str, multiplier) = match unit_stripped.chars().last() {
        Some('G') => (&unit_stripped[..unit_stripped.len() - 1], 1024 * 1024 * 1024),
        Some('M') => (&unit_stripped[..unit_stripped.len() - 1], 1024 * 1024),
        Some('K') => (&unit_stripped[..unit_stripped.len() - 1], 1024),
        _ => (unit_stripped, 1_u64),
    };

    // ASCII case mapping keeps byte offsets, so report the caller's spelling
    let num_str = s[..num_str.len()].trim();
    if num_str.is_empty() {
        return Err("missing numeric value".to_string());
    }

    // Float parse so "1.5M" works
    let value: f64 = num_str
        .parse()
        .map_err(|_| format!("invalid number: '{num_str}'"))?;
    if !value.is_finite() {
        return Err(format!("file size must be finite: '{num_str}'"));
    }
    if value < 0.0 {
        return Err("file size cannot be negative".to_string());
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let bytes = (value * multiplier as f64).round() as u64;
    if bytes == 0 {
        return Err("file size must be greater than zero".to_string());
    }
    Ok(bytes)
}

#[derive(Parser, Debug)]
#[command(
    name = "actor-extract",
    about = "Extract actor records from zipped event archives",
    version
)]
struct Args {
    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log each entry's decode attempts
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract every actor from an archive and print the result as JSON
    Process {
        /// Archive path, or '-' to read from stdin
        #[arg(value_name = "ARCHIVE")]
        input: String,

        /// Content type to validate the archive as
        #[arg(long, default_value = DEFAULT_CONTENT_TYPE)]
        content_type: String,

        /// Decode worker threads (default: one per CPU)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Size limit for the archive and its uncompressed contents (e.g. 100M)
        #[arg(long, value_name = "SIZE", value_parser = parse_file_size)]
        max_file_size: Option<u64>,

        /// Include per-entry reports
        #[arg(long)]
        diagnostics: bool,

        /// Compact JSON output (no pretty-printing)
        #[arg(long)]
        compact: bool,
    },

    /// List archive members without decoding them
    Inspect {
        /// Archive path, or '-' to read from stdin
        #[arg(value_name = "ARCHIVE")]
        input: String,

        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
}

fn read_input(input: &str) -> Result<Vec<u8>> {
    if input == "-" {
        let mut bytes = Vec::new();
        io::stdin()
            .read_to_end(&mut bytes)
            .context("Failed to read archive from stdin")?;
        return Ok(bytes);
    }
    fs::read(Path::new(input)).with_context(|| format!("Failed to read archive: {input}"))
}

fn init_logging(quiet: bool, verbose: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn print_json(value: &Value, compact: bool) -> Result<()> {
    let text = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
    .context("Failed to serialize output")?;
    println!("{text}");
    Ok(())
}

fn run_process(
    input: &str,
    content_type: &str,
    workers: Option<usize>,
    max_file_size: Option<u64>,
    diagnostics: bool,
    compact: bool,
) -> Result<()> {
    let mut config = match workers {
        Some(workers) => ProcessorConfig::with_workers(workers),
        None => ProcessorConfig::default(),
    };
    if let Some(max_file_size) = max_file_size {
        config.max_file_size = max_file_size;
    }

    let bytes = read_input(input)?;
    let extractor = ActorExtractor::new(config).context("Invalid extractor settings")?;
    let result = extractor
        .process(&bytes, content_type)
        .with_context(|| format!("Failed to process {input}"))?;

    let mut output = serde_json::to_value(&result).context("Failed to serialize result")?;
    if diagnostics {
        if let Value::Object(fields) = &mut output {
            let entries =
                serde_json::to_value(result.entries()).context("Failed to serialize entries")?;
            fields.insert("entries".to_string(), entries);
        }
    }
    print_json(&output, compact)
}

fn run_inspect(input: &str, json: bool) -> Result<()> {
    let bytes = read_input(input)?;
    let entries = list_entries(&bytes).with_context(|| format!("Failed to inspect {input}"))?;
    let suffix = DEFAULT_JSON_SUFFIX;

    if json {
        let value = serde_json::to_value(&entries).context("Failed to serialize listing")?;
        return print_json(&value, false);
    }

    let mut qualifying = 0;
    let mut total_size = 0_u64;
    for entry in &entries {
        let decodable = !entry.is_dir && has_suffix(&entry.name, suffix);
        if decodable {
            qualifying += 1;
        }
        total_size = total_size.saturating_add(entry.size);

        let mut flags = String::new();
        if entry.is_dir {
            flags.push('d');
        }
        if entry.is_encrypted {
            flags.push('e');
        }
        if decodable {
            flags.push('*');
        }
        println!(
            "{:>12} {:>12} {:<3} {}",
            entry.size, entry.compressed_size, flags, entry.name
        );
    }
    println!(
        "{} entries, {qualifying} {suffix} files, {total_size} bytes uncompressed",
        entries.len()
    );
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.quiet, args.verbose);

    match args.command {
        Commands::Process {
            input,
            content_type,
            workers,
            max_file_size,
            diagnostics,
            compact,
        } => run_process(
            &input,
            &content_type,
            workers,
            max_file_size,
            diagnostics,
            compact,
        ),
        Commands::Inspect { input, json } => run_inspect(&input, json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_size_plain_bytes() {
        assert_eq!(parse_file_size("1048576"), Ok(1_048_576));
        assert_eq!(parse_file_size("512B"), Ok(512));
    }

    #[test]
    fn test_parse_file_size_suffixes() {
        assert_eq!(parse_file_size("100K"), Ok(100 * 1024));
        assert_eq!(parse_file_size("100kb"), Ok(100 * 1024));
        assert_eq!(parse_file_size("100M"), Ok(100 * 1024 * 1024));
        assert_eq!(parse_file_size("1.5MB"), Ok(1_572_864));
        assert_eq!(parse_file_size("2G"), Ok(2 * 1024 * 1024 * 1024));
    }

    #[test]
    fn test_parse_file_size_rejects_bad_input() {
        assert!(parse_file_size("").is_err());
        assert!(parse_file_size("M").is_err());
        assert!(parse_file_size("ten").is_err());
        assert!(parse_file_size("-5M").is_err());
        assert!(parse_file_size("0").is_err());
    }

    #[test]
    fn test_parse_file_size_rejects_non_finite() {
        assert!(parse_file_size("inf").is_err());
        assert!(parse_file_size("infinity").is_err());
        assert!(parse_file_size("infM").is_err());
        assert!(parse_file_size("NaN").is_err());
    }
}
