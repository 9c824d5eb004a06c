//! Command-line arguments for the file tool.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about = "Inspects Databento DBN files", long_about = None)]
pub struct Args {
    /// What to print.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands of the file tool.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Prints each file's metadata as one JSON line.
    Metadata {
        /// DBN files to read, `-` for stdin. `.zst` files are decompressed.
        #[clap(required = true)]
        files: Vec<PathBuf>,

        /// Treat the input as zstd regardless of its extension.
        #[clap(long, short)]
        zstd: bool,
    },
    /// Prints each file's records as JSON lines.
    Json {
        /// DBN files to read, `-` for stdin. `.zst` files are decompressed.
        #[clap(required = true)]
        files: Vec<PathBuf>,

        /// Treat the input as zstd regardless of its extension.
        #[clap(long, short)]
        zstd: bool,

        /// Print the metadata line before the records.
        #[clap(long)]
        with_metadata: bool,
    },
}
