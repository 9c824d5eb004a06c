//! DBN file tool — prints the metadata or the records of DBN files as JSON lines.
//! Plain and zstd-compressed files are accepted; `-` reads stdin.
//!
//! Usage example (CLI):
//! ```bash
//! dbn_file metadata session.dbn.zst
//! dbn_file json --with-metadata session.dbn
//! cat session.dbn.zst | dbn_file json --zstd -
//! ```
//!
//! A file that fails is reported and the remaining files are still printed.
#![warn(missing_docs)]
mod args;
mod printer;

use crate::args::{Args, Command};
use clap::Parser;
use dbn_common::compressed::open_reader;
use dbn_common::{DbnError, Result};
use log::{error, info};
use std::io::{self, Write};
use std::path::Path;

fn main() -> Result<(), DbnError> {
    init_logger();
    let args = Args::parse();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut first_error = None;
    let (files, zstd) = match &args.command {
        Command::Metadata { files, zstd } => (files, *zstd),
        Command::Json { files, zstd, .. } => (files, *zstd),
    };
    for path in files {
        let outcome = match &args.command {
            Command::Metadata { .. } => print_file_metadata(path, zstd, &mut out),
            Command::Json { with_metadata, .. } => {
                print_file_records(path, zstd, *with_metadata, &mut out)
            }
        };
        if let Err(e) = outcome {
            error!("Reading {}: {}", path.display(), e);
            first_error.get_or_insert(e);
        }
    }
    out.flush()?;
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn print_file_metadata(path: &Path, zstd: bool, out: &mut impl Write) -> Result<()> {
    let source = open_reader(path, zstd)?;
    printer::print_metadata(source, out)
}

fn print_file_records(
    path: &Path,
    zstd: bool,
    with_metadata: bool,
    out: &mut impl Write,
) -> Result<()> {
    let source = open_reader(path, zstd)?;
    let printed = printer::print_records(source, out, with_metadata)?;
    info!("{}: {} records", path.display(), printed);
    Ok(())
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
