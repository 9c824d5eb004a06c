//! JSON-lines rendering of DBN streams.
use std::io::{Read, Write};

use dbn_common::{DbnScanner, Result};
use log::{debug, warn};
use serde::Serialize;

/// Writes `value` as one line of JSON.
pub fn write_json_line<T: Serialize, W: Write>(writer: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Prints the metadata of `source`.
pub fn print_metadata<R: Read, W: Write>(source: R, writer: &mut W) -> Result<()> {
    let mut scanner = DbnScanner::new(source);
    write_json_line(writer, scanner.metadata()?)
}

/// Prints every record of `source`, one JSON line each, and returns how many
/// were printed. Records of unknown type are skipped with a warning.
pub fn print_records<R: Read, W: Write>(
    source: R,
    writer: &mut W,
    with_metadata: bool,
) -> Result<u64> {
    let mut scanner = DbnScanner::new(source);
    let metadata = scanner.metadata()?;
    debug!(
        "Printing {} v{} {}",
        metadata.dataset,
        metadata.version.as_u8(),
        metadata
            .schema
            .map(|schema| schema.to_string())
            .unwrap_or_else(|| "mixed".to_string())
    );
    if with_metadata {
        write_json_line(writer, metadata)?;
    }

    let mut printed = 0u64;
    let mut skipped = 0u64;
    while scanner.next_frame()? {
        let record = scanner.decode_current()?;
        if record.is_unrecognized() {
            if skipped == 0 {
                warn!("Skipping records of unrecognized type {:#04x}", record.rtype());
            }
            skipped += 1;
            continue;
        }
        write_json_line(writer, &record)?;
        printed += 1;
    }
    if skipped > 0 {
        warn!("Skipped {} unrecognized records", skipped);
    }
    Ok(printed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbn_common::compressed::open_reader;
    use dbn_common::{DbnError, ErrorClass};
    use serde_json::Value;
    use std::fs::File;
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../dbn_common/tests/data")
            .join(name)
    }

    fn lines(out: &[u8]) -> Vec<Value> {
        std::str::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn metadata_line() {
        let mut out = Vec::new();
        print_metadata(File::open(fixture("test_data.ohlcv-1s.dbn")).unwrap(), &mut out).unwrap();
        let parsed = lines(&out);
        assert_eq!(parsed.len(), 1);
        let md = &parsed[0];
        assert_eq!(md["dataset"], "GLBX.MDP3");
        assert_eq!(md["schema"], "ohlcv-1s");
        assert_eq!(md["stype_in"], "raw_symbol");
        assert_eq!(md["limit"], 2);
        assert_eq!(md["symbols"][0], "ESH1");
        assert_eq!(md["mappings"][0]["intervals"][0]["symbol"], "5482");
    }

    #[test]
    fn record_lines_match_across_versions() {
        let mut v1 = Vec::new();
        let mut v2 = Vec::new();
        let n1 = print_records(
            open_reader(fixture("test_data.ohlcv-1s.v1.dbn"), false).unwrap(),
            &mut v1,
            false,
        )
        .unwrap();
        let n2 = print_records(
            open_reader(fixture("test_data.ohlcv-1s.dbn"), false).unwrap(),
            &mut v2,
            false,
        )
        .unwrap();
        assert_eq!((n1, n2), (2, 2));
        assert_eq!(v1, v2);

        let bars = lines(&v2);
        assert_eq!(bars[0]["hd"]["instrument_id"], 5482);
        assert_eq!(bars[0]["hd"]["ts_event"], 1_609_160_400_000_000_000u64);
        assert_eq!(bars[0]["open"], 372_025_000_000_000i64);
        assert_eq!(bars[1]["volume"], 13);
    }

    #[test]
    fn metadata_leads_when_asked() {
        let mut out = Vec::new();
        print_records(
            File::open(fixture("test_data.ohlcv-1s.dbn")).unwrap(),
            &mut out,
            true,
        )
        .unwrap();
        let parsed = lines(&out);
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0]["dataset"], "GLBX.MDP3");
    }

    #[test]
    fn truncated_input_reports_framing_error() {
        let bytes = std::fs::read(fixture("test_data.ohlcv-1s.dbn")).unwrap();
        let cut = &bytes[..bytes.len() - 10];
        let mut out = Vec::new();
        let err = print_records(cut, &mut out, false).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Framing);
        // the whole record before the cut was already printed
        assert_eq!(lines(&out).len(), 1);
    }

    #[test]
    fn not_dbn_is_format_error() {
        let mut out = Vec::new();
        let err = print_metadata(&b"PK\x03\x04 not a dbn file"[..], &mut out).unwrap_err();
        assert!(matches!(err, DbnError::InvalidMagic(_)));
        assert!(out.is_empty());
    }
}
