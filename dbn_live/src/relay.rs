//! Copies a live session to a byte sink.
//!
//! A `dbn` session is written byte for byte: the metadata frame first, then
//! every record frame exactly as received. A `json` session is written one
//! line per record. `run` stops the client on every return path.
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use dbn_common::enums::rtype;
use dbn_common::{DbnVersion, MetadataCodec, Record, RecordCodec, Result};
use log::{debug, error, info, warn};

use crate::client::LiveClient;
use crate::gateway::SubscriptionRequest;

/// Records relayed, keyed by record type tag.
pub type RecordCounts = BTreeMap<u8, u64>;

/// Authenticates, subscribes, starts and relays the session into the sink
/// returned by `open_output` until the gateway closes it or `interrupted` is
/// set. The client is stopped afterwards, whatever the outcome.
pub fn run<W, F>(
    client: &mut LiveClient,
    subscriptions: &[SubscriptionRequest],
    open_output: F,
    interrupted: &AtomicBool,
) -> Result<RecordCounts>
where
    W: Write,
    F: FnOnce() -> Result<W>,
{
    let outcome = relay(client, subscriptions, open_output, interrupted);
    let stopped = client.stop();
    match outcome {
        Ok(counts) => stopped.map(|_| counts),
        Err(e) => {
            if let Err(stop_err) = stopped {
                warn!("Failed to stop session after error: {}", stop_err);
            }
            Err(e)
        }
    }
}

fn relay<W, F>(
    client: &mut LiveClient,
    subscriptions: &[SubscriptionRequest],
    open_output: F,
    interrupted: &AtomicBool,
) -> Result<RecordCounts>
where
    W: Write,
    F: FnOnce() -> Result<W>,
{
    let session_id = client.authenticate()?;
    info!(
        "Session {} on {}:{} (gateway {})",
        session_id,
        client.gateway(),
        client.port(),
        client.lsg_version().unwrap_or("unknown")
    );
    for subscription in subscriptions {
        client.subscribe(subscription)?;
    }
    let metadata = client.start()?;

    let mut output = open_output()?;
    let codec = match &metadata {
        Some(metadata) => {
            MetadataCodec::write(&mut output, metadata)?;
            RecordCodec::for_metadata(metadata)
        }
        None => RecordCodec::new(DbnVersion::V2, false),
    };

    let mut counts = RecordCounts::new();
    loop {
        match client.next_frame() {
            Ok(true) => {}
            Ok(false) => {
                info!("Gateway closed the session");
                break;
            }
            Err(e) if interrupted.load(Ordering::SeqCst) => {
                debug!("Read interrupted by stop: {}", e);
                break;
            }
            Err(e) => {
                error!("Session failed: {}", e);
                if let Err(flush_err) = output.flush() {
                    warn!("Failed to flush output: {}", flush_err);
                }
                return Err(e);
            }
        }
        let tag = if let Some(scanner) = client.scanner() {
            output.write_all(scanner.current_bytes())?;
            let Some(header) = scanner.current_header() else {
                continue;
            };
            if matches!(header.rtype, rtype::ERROR | rtype::SYSTEM) {
                report_gateway_message(scanner.decode_current());
            }
            header.rtype
        } else if let Some(scanner) = client.json_scanner() {
            output.write_all(scanner.current_line().as_bytes())?;
            output.write_all(b"\n")?;
            let record = scanner.decode_current();
            let tag = match &record {
                Ok(record) => record.rtype(),
                Err(e) => {
                    warn!("Relaying undecodable JSON line: {}", e);
                    continue;
                }
            };
            if matches!(tag, rtype::ERROR | rtype::SYSTEM) {
                report_gateway_message(record);
            }
            tag
        } else {
            break;
        };
        let seen = counts.entry(tag).or_insert(0);
        *seen += 1;
        if codec.expected_size(tag).is_none() && *seen == 1 {
            warn!("Relaying unrecognized record type {:#04x} unchanged", tag);
        }
    }

    output.flush()?;
    Ok(counts)
}

fn report_gateway_message(record: Result<Record>) {
    match record {
        Ok(Record::Error(msg)) => error!("Gateway error: {}", msg.err),
        Ok(Record::System(msg)) if msg.is_heartbeat() => debug!("Heartbeat"),
        Ok(Record::System(msg)) => info!("Gateway: {}", msg.msg),
        Ok(_) => {}
        Err(e) => warn!("Could not decode gateway message: {}", e),
    }
}
