//! # leveldump CLI
//!
//! Prints the live keys of a LevelDB directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use leveldump::{DumpReport, Dumper, FileOutcome, Options, WalFraming};

#[derive(Parser)]
#[command(name = "leveldump")]
#[command(version, about = "Reconstruct live key-value data from LevelDB log and table files")]
struct Cli {
    /// Directory holding the .log and .ldb/.sst files
    dir: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// How log segments are framed
    #[arg(long, value_enum, default_value_t = Framing::Simple)]
    wal_framing: Framing,

    /// Decode files on worker threads
    #[arg(long)]
    parallel: bool,

    /// Do not fall back to the nested leveldb/ directory
    #[arg(long)]
    no_nested: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// `key = value` lines
    Text,
    /// One JSON object
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum Framing {
    /// Records back to back
    Simple,
    /// 32 KiB blocks with fragment reassembly
    Blocked,
}

impl From<Framing> for WalFraming {
    fn from(framing: Framing) -> Self {
        match framing {
            Framing::Simple => WalFraming::Simple,
            Framing::Blocked => WalFraming::Blocked,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut options = Options::default()
        .wal_framing(cli.wal_framing.into())
        .parallel(cli.parallel);
    if cli.no_nested {
        options = options.nested_dir(None);
    }

    let report = Dumper::new(options)
        .dump_dir(&cli.dir)
        .with_context(|| format!("failed to dump {}", cli.dir.display()))?;

    match cli.format {
        Format::Text => {
            for (key, value) in report.snapshot.to_text_map() {
                println!("{} = {}", key, value);
            }
        }
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(&report.snapshot)?);
        }
    }

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &DumpReport) {
    for file in &report.files {
        match &file.outcome {
            FileOutcome::Complete { .. } => {}
            FileOutcome::Partial { errors, .. } => {
                eprintln!("{} {}: {}", file.kind, file.path.display(), file.outcome);
                for error in errors {
                    eprintln!("    {}", error);
                }
            }
            FileOutcome::Skipped(_) => {
                eprintln!("{} {}: {}", file.kind, file.path.display(), file.outcome);
            }
        }
    }
    eprintln!(
        "{} files ({} complete, {} partial, {} skipped), {} records, {} live keys",
        report.files.len(),
        report.complete(),
        report.partial(),
        report.skipped(),
        report.records(),
        report.snapshot.len()
    );
}
