//! Live relay — connects to a Databento live gateway, subscribes to one schema for a
//! list of symbols and writes the session to a file (or stdout) byte for byte:
//! with `dbn` encoding the session metadata first, then every record frame
//! exactly as received; with `json` encoding one record per line.
//!
//! Usage example (CLI):
//! ```bash
//! DATABENTO_API_KEY=db-... dbn_live --dataset GLBX.MDP3 --schema ohlcv-1s \
//!     --symbols ESH4,NQH4 --output session.dbn.zst
//! ```
//!
//! Press Ctrl+C to close the session; the output is flushed before exit.
#![warn(missing_docs)]
mod args;

use crate::args::Args;
use clap::Parser;
use dbn_common::compressed::create_writer;
use dbn_common::record::rtype_name;
use dbn_common::{DbnError, Result};
use dbn_live::{LiveClient, relay};
use log::{error, info, warn};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

fn main() -> Result<(), DbnError> {
    init_logger();
    let args = Args::parse();

    let mut client = LiveClient::connect(args.live_config())?;
    let shutdown = Arc::new(AtomicBool::new(false));
    if let Err(e) = install_stop_handler(&client, shutdown.clone()) {
        if let Err(stop_err) = client.stop() {
            warn!("Failed to stop session: {}", stop_err);
        }
        return Err(e);
    }

    let counts = relay::run(
        &mut client,
        &[args.subscription()],
        || create_writer(&args.output, args.zstd),
        &shutdown,
    )?;
    for (tag, count) in &counts {
        info!("{:>8} {} records", count, rtype_name(*tag));
    }
    Ok(())
}

fn install_stop_handler(client: &LiveClient, shutdown: Arc<AtomicBool>) -> Result<()> {
    let stop = client.stop_handle()?;
    ctrlc::set_handler(move || {
        info!("Ctrl+C received. Stopping session...");
        shutdown.store(true, Ordering::SeqCst);
        if let Err(e) = stop.stop() {
            error!("Failed to stop session: {}", e);
        }
    })
    .map_err(|e| DbnError::Config(format!("Error setting Ctrl+C handler: {}", e)))
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
