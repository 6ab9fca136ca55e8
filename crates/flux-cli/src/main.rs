//! flux2json CLI
//!
//! Converts annotated CSV (as emitted by time-series query engines) into JSON.

use clap::Parser;
use flux_core::{parse_file, parse_reader, Error, ParseOptions, Table, TableSet};
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

const PROGRAM: &str = "flux2json";

#[derive(Parser)]
#[command(name = PROGRAM)]
#[command(about = "Convert InfluxDB annotated CSV to JSON.")]
#[command(long_about = "Convert InfluxDB annotated CSV to JSON.\n\
    Reads from stdin when no file argument is given.")]
struct Cli {
    /// Annotated CSV file to convert (defaults to stdin)
    file: Option<PathBuf>,
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("{}: {}", PROGRAM, describe(&e));
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr so stdout only ever carries JSON
fn init_logging() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(env)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> flux_core::Result<()> {
    let tables = read_tables(cli)?;
    info!(tables = tables.len(), "parsed input");

    TableSet::new(tables).write_json(io::stdout().lock())
}

fn read_tables(cli: &Cli) -> flux_core::Result<Vec<Table>> {
    match &cli.file {
        Some(path) => parse_file(path),
        None => parse_reader(io::stdin().lock(), &ParseOptions::default()),
    }
}

fn describe(e: &Error) -> String {
    match e {
        Error::Line { .. } | Error::Conversion { .. } => format!("parse error: {}", e),
        _ => e.to_string(),
    }
}
