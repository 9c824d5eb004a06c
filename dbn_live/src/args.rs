//! Command-line arguments for the live relay.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Parser;
use dbn_common::enums::Encoding;
use dbn_common::net::LIVE_API_PORT;
use dbn_common::{SType, Schema};
use dbn_live::client::default_client_name;
use dbn_live::{LiveConfig, SubscriptionRequest};

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// API key. Read from `DATABENTO_API_KEY` when not given.
    #[clap(long, env = "DATABENTO_API_KEY", hide_env_values = true)]
    pub key: String,

    /// Dataset to stream, e.g. GLBX.MDP3.
    #[clap(long)]
    pub dataset: String,

    /// Schema to subscribe to, e.g. mbp-1 or ohlcv-1s.
    #[clap(long)]
    pub schema: Schema,

    /// Symbology of the symbols.
    #[clap(long, value_enum, default_value_t = SType::RawSymbol)]
    pub stype_in: SType,

    /// Symbols to subscribe to, comma separated.
    #[clap(long, value_delimiter = ',', required = true)]
    pub symbols: Vec<String>,

    /// Replay start as RFC 3339, e.g. 2024-01-02T14:30:00Z.
    #[clap(long)]
    pub start: Option<DateTime<Utc>>,

    /// Request a book snapshot before live data.
    #[clap(long)]
    pub snapshot: bool,

    /// Ask the gateway to append its send timestamp to every record.
    #[clap(long)]
    pub ts_out: bool,

    /// Wire encoding of the session: dbn or json.
    #[clap(long, value_enum, default_value_t = Encoding::Dbn)]
    pub encoding: Encoding,

    /// Output file, `-` for stdout. `.zst` paths are compressed.
    #[clap(long, short, default_value = "-")]
    pub output: PathBuf,

    /// Compress the output with zstd regardless of its extension.
    #[clap(long)]
    pub zstd: bool,

    /// Gateway host override.
    #[clap(long)]
    pub gateway: Option<String>,

    /// Gateway port.
    #[clap(long, default_value_t = LIVE_API_PORT)]
    pub port: u16,

    /// Client identification sent to the gateway.
    #[clap(long, default_value_t = default_client_name())]
    pub client: String,
}

impl Args {
    /// Session settings described by the arguments.
    pub fn live_config(&self) -> LiveConfig {
        let mut config = LiveConfig::new(self.key.trim(), self.dataset.trim());
        config.client = self.client.clone();
        config.encoding = self.encoding;
        config.send_ts_out = self.ts_out;
        config.gateway = self.gateway.clone();
        config.port = self.port;
        config
    }

    /// The single subscription described by the arguments.
    pub fn subscription(&self) -> SubscriptionRequest {
        let symbols = self
            .symbols
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty());
        let mut subscription = SubscriptionRequest::new(self.schema, self.stype_in, symbols)
            .with_snapshot(self.snapshot);
        if let Some(start) = &self.start {
            subscription = subscription.with_start(start);
        }
        subscription
    }
}
