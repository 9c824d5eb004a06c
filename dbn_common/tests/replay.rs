use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

use dbn_common::compressed::{create_writer, open_reader};
use dbn_common::enums::rtype;
use dbn_common::metadata::{MappingInterval, SymbolMapping};
use dbn_common::{
    DbnError, DbnScanner, DbnVersion, ErrorClass, FixedPrice, JsonScanner, Metadata,
    MetadataCodec, Record, RecordCodec, SType, Schema, TsSymbolMap,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn expected_metadata(version: DbnVersion) -> Metadata {
    Metadata {
        version,
        dataset: "GLBX.MDP3".to_string(),
        schema: Some(Schema::Ohlcv1S),
        start: 1_609_160_400_000_000_000,
        end: 1_609_200_000_000_000_000,
        limit: 2,
        stype_in: Some(SType::RawSymbol),
        stype_out: SType::InstrumentId,
        ts_out: false,
        symbols: vec!["ESH1".to_string()],
        partial: vec![],
        not_found: vec![],
        mappings: vec![SymbolMapping {
            raw_symbol: "ESH1".to_string(),
            intervals: vec![MappingInterval {
                start_date: 20201228,
                end_date: 20201229,
                symbol: "5482".to_string(),
            }],
        }],
    }
}

fn check_replay<R: Read>(mut scanner: DbnScanner<R>, version: DbnVersion) {
    assert_eq!(scanner.metadata().unwrap(), &expected_metadata(version));
    let records = scanner.read_to_vec().unwrap();
    assert_eq!(records.len(), 2);

    let bars: Vec<_> = records
        .iter()
        .map(|record| match record {
            Record::Ohlcv(bar) => bar,
            other => panic!("expected OHLCV, got {:?}", other),
        })
        .collect();
    assert_eq!(bars[0].hd.rtype, rtype::OHLCV_1S);
    assert_eq!(bars[0].hd.length, 14);
    assert_eq!(bars[0].hd.publisher_id, 1);
    assert_eq!(bars[0].hd.instrument_id, 5482);
    assert_eq!(bars[0].hd.ts_event, 1_609_160_400_000_000_000);
    assert_eq!(bars[0].open, FixedPrice(372_025_000_000_000));
    assert_eq!(bars[0].high, FixedPrice(372_050_000_000_000));
    assert_eq!(bars[0].low, FixedPrice(372_025_000_000_000));
    assert_eq!(bars[0].close, FixedPrice(372_050_000_000_000));
    assert_eq!(bars[0].volume, 57);
    assert_eq!(bars[0].open.to_f64(), 372_025.0);

    assert_eq!(bars[1].hd.ts_event, 1_609_160_401_000_000_000);
    assert_eq!(bars[1].open, FixedPrice(372_050_000_000_000));
    assert_eq!(bars[1].volume, 13);
}

#[test]
fn replays_v1_fixture() {
    let file = fs::File::open(fixture("test_data.ohlcv-1s.v1.dbn")).unwrap();
    check_replay(DbnScanner::new(file), DbnVersion::V1);
}

#[test]
fn replays_v2_fixture() {
    let file = fs::File::open(fixture("test_data.ohlcv-1s.dbn")).unwrap();
    check_replay(DbnScanner::new(file), DbnVersion::V2);
}

#[test]
fn versions_describe_the_same_session() {
    let v1 = MetadataCodec::decode_bytes(&fs::read(fixture("test_data.ohlcv-1s.v1.dbn")).unwrap())
        .unwrap();
    let v2 = MetadataCodec::decode_bytes(&fs::read(fixture("test_data.ohlcv-1s.dbn")).unwrap())
        .unwrap();
    assert_ne!(v1, v2);
    assert_eq!(v1.with_version(DbnVersion::V2), v2);
}

#[test]
fn json_lines_match_binary_records() {
    let file = fs::File::open(fixture("test_data.ohlcv-1s.json")).unwrap();
    let mut json = JsonScanner::new(file);
    let from_json = json.read_to_vec().unwrap();

    let file = fs::File::open(fixture("test_data.ohlcv-1s.dbn")).unwrap();
    let from_dbn = DbnScanner::new(file).read_to_vec().unwrap();
    assert_eq!(from_json, from_dbn);
    assert_eq!(json.lines_read(), 2);
}

#[test]
fn replays_zstd_copy() {
    let plain = fs::read(fixture("test_data.ohlcv-1s.dbn")).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test_data.ohlcv-1s.dbn.zst");
    {
        let mut writer = create_writer(&path, false).unwrap();
        writer.write_all(&plain).unwrap();
    }
    assert_ne!(fs::read(&path).unwrap(), plain);
    let reader = open_reader(&path, false).unwrap();
    check_replay(DbnScanner::new(reader), DbnVersion::V2);
}

#[test]
fn symbol_map_from_fixture() {
    let mut scanner = DbnScanner::new(fs::File::open(fixture("test_data.ohlcv-1s.dbn")).unwrap());
    let map = TsSymbolMap::from_metadata(scanner.metadata().unwrap()).unwrap();
    for record in scanner.records() {
        assert_eq!(map.get_for_record(&record.unwrap()), Some("ESH1"));
    }
}

#[test]
fn reencoding_reproduces_record_bytes() {
    let bytes = fs::read(fixture("test_data.ohlcv-1s.v1.dbn")).unwrap();
    let mut scanner = DbnScanner::new(bytes.as_slice());
    let metadata = scanner.metadata().unwrap().clone();
    let codec = RecordCodec::for_metadata(&metadata);
    let mut records = Vec::new();
    while scanner.next_frame().unwrap() {
        let raw = scanner.current_bytes().to_vec();
        let record = scanner.decode_current().unwrap();
        assert_eq!(codec.encode(&record).unwrap(), raw);
        records.extend(raw);
    }
    assert_eq!(records, bytes[bytes.len() - 112..]);
}

#[test]
fn truncated_file_fails_after_last_whole_record() {
    let mut bytes = fs::read(fixture("test_data.ohlcv-1s.dbn")).unwrap();
    bytes.truncate(bytes.len() - 20);
    let mut scanner = DbnScanner::new(bytes.as_slice());
    assert!(scanner.next_record().unwrap().is_some());
    let err = scanner.next_record().unwrap_err();
    assert_eq!(err.class(), ErrorClass::Framing);
    assert!(matches!(scanner.next_record(), Err(DbnError::ScannerFailed)));
}

#[test]
fn truncated_metadata_is_framing_error() {
    let bytes = fs::read(fixture("test_data.ohlcv-1s.v1.dbn")).unwrap();
    let mut scanner = DbnScanner::new(&bytes[..60]);
    let err = scanner.metadata().unwrap_err();
    assert!(matches!(
        err,
        DbnError::Truncated {
            context: "metadata body",
            ..
        }
    ));
    assert_eq!(err.class(), ErrorClass::Framing);
}
