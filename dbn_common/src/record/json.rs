//! JSON record decoding.
//!
//! A DBN JSON stream carries one record per line. 64-bit integers and prices
//! may be quoted, character fields are one-character strings and the header
//! has no `length`: it is filled in from the codec's layout for the type tag,
//! so a JSON record compares equal to the same record decoded from binary.
use std::fmt;

use log::debug;
use serde::de::{self, Deserialize, Deserializer, Unexpected, Visitor};
use serde_json::Value;

use super::codec::Layout;
use super::{CODE_UNSET, Record, RecordCodec, RecordHeader, STYPE_UNSET};
use crate::result::Result;

impl RecordCodec {
    /// Decodes one JSON record line.
    ///
    /// Dispatches on `hd.rtype`. Unknown type tags become
    /// `Record::Unrecognized` holding the line itself.
    pub fn decode_json(&self, line: &str) -> Result<Record> {
        let mut value: Value = serde_json::from_str(line)?;
        let hd = value
            .get("hd")
            .ok_or_else(|| <serde_json::Error as de::Error>::missing_field("hd"))?;
        let mut header = RecordHeader::deserialize(hd)?;
        let Some(layout) = Layout::for_rtype(header.rtype) else {
            debug!(
                "Unrecognized rtype {:#04x} in JSON line, keeping the line",
                header.rtype
            );
            return Ok(Record::Unrecognized {
                header,
                bytes: line.trim_end().as_bytes().to_vec(),
            });
        };
        header.length = (self.layout_size(layout) / 4) as u8;
        if let Some(hd) = value.get_mut("hd").and_then(Value::as_object_mut) {
            hd.insert("length".to_string(), Value::from(header.length));
        }

        let record = match layout {
            Layout::Mbo => Record::Mbo(serde_json::from_value(value)?),
            Layout::Trade => Record::Trade(serde_json::from_value(value)?),
            Layout::Mbp1 => Record::Mbp1(serde_json::from_value(value)?),
            Layout::Mbp10 => Record::Mbp10(Box::new(serde_json::from_value(value)?)),
            Layout::Bbo => Record::Bbo(serde_json::from_value(value)?),
            Layout::Cmbp1 => Record::Cmbp1(serde_json::from_value(value)?),
            Layout::Cbbo => Record::Cbbo(serde_json::from_value(value)?),
            Layout::Ohlcv => Record::Ohlcv(serde_json::from_value(value)?),
            Layout::Status => Record::Status(serde_json::from_value(value)?),
            Layout::InstrumentDef => {
                Record::InstrumentDef(Box::new(serde_json::from_value(value)?))
            }
            Layout::Imbalance => Record::Imbalance(serde_json::from_value(value)?),
            Layout::Statistics => Record::Statistics(serde_json::from_value(value)?),
            Layout::Error => Record::Error(serde_json::from_value(value)?),
            Layout::System => Record::System(serde_json::from_value(value)?),
            Layout::SymbolMapping => Record::SymbolMapping(serde_json::from_value(value)?),
        };
        Ok(record)
    }
}

/// Character fields: written as a one-character string, read from a string
/// of at most one character or from the raw byte value.
pub(super) mod c_char {
    use super::*;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(c: &u8, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_char(*c as char)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<u8, D::Error> {
        deserializer.deserialize_any(CCharVisitor)
    }

    struct CCharVisitor;

    impl Visitor<'_> for CCharVisitor {
        type Value = u8;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a single-byte character")
        }

        fn visit_char<E: de::Error>(self, c: char) -> std::result::Result<u8, E> {
            u8::try_from(c).map_err(|_| E::invalid_value(Unexpected::Char(c), &self))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<u8, E> {
            let mut chars = v.chars();
            match (chars.next(), chars.next()) {
                (None, _) => Ok(0),
                (Some(c), None) => self.visit_char(c),
                _ => Err(E::invalid_value(Unexpected::Str(v), &self)),
            }
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<u8, E> {
            u8::try_from(v).map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<u8, E> {
            u8::try_from(v).map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
        }
    }
}

struct U64Visitor;

impl Visitor<'_> for U64Visitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an unsigned 64-bit integer or its decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<u64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<u64, E> {
        u64::try_from(v).map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<u64, E> {
        v.parse()
            .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }
}

/// 64-bit timestamps and counts, quoted or not.
pub(super) fn u64_or_str<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<u64, D::Error> {
    deserializer.deserialize_any(U64Visitor)
}

struct FlagVisitor;

impl Visitor<'_> for FlagVisitor {
    type Value = bool;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a boolean, 0 or 1")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<bool, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<bool, E> {
        match v {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(E::invalid_value(Unexpected::Unsigned(v), &self)),
        }
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<bool, E> {
        match v {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(E::invalid_value(Unexpected::Signed(v), &self)),
        }
    }
}

pub(super) fn bool_or_int<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<bool, D::Error> {
    deserializer.deserialize_any(FlagVisitor)
}

pub(super) fn code_unset() -> u8 {
    CODE_UNSET
}

pub(super) fn stype_unset() -> u8 {
    STYPE_UNSET
}

pub(super) fn last_by_default() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{Action, Side, rtype};
    use crate::error::{DbnError, ErrorClass};
    use crate::metadata::DbnVersion;
    use crate::price::FixedPrice;
    use crate::record::OhlcvMsg;

    const BAR: &str = r#"{"hd":{"ts_event":"1609160400000000000","rtype":32,"publisher_id":1,"instrument_id":5482},"open":"372025000000000","high":"372050000000000","low":"372025000000000","close":"372050000000000","volume":"57"}"#;

    fn v2() -> RecordCodec {
        RecordCodec::new(DbnVersion::V2, false)
    }

    #[test]
    fn quoted_integers_and_missing_length() {
        let record = v2().decode_json(BAR).unwrap();
        let expected = Record::Ohlcv(OhlcvMsg {
            hd: RecordHeader {
                length: 14,
                rtype: rtype::OHLCV_1S,
                publisher_id: 1,
                instrument_id: 5482,
                ts_event: 1_609_160_400_000_000_000,
            },
            open: FixedPrice(372_025_000_000_000),
            high: FixedPrice(372_050_000_000_000),
            low: FixedPrice(372_025_000_000_000),
            close: FixedPrice(372_050_000_000_000),
            volume: 57,
        });
        assert_eq!(record, expected);
        assert_eq!(record.header().record_size(), 56);
    }

    #[test]
    fn length_follows_codec_layout() {
        let with_ts_out = RecordCodec::new(DbnVersion::V2, true);
        let record = with_ts_out.decode_json(BAR).unwrap();
        assert_eq!(record.header().length, 16);
    }

    #[test]
    fn character_fields_from_strings() {
        let line = r#"{"hd":{"ts_event":"1704186000403918695","rtype":160,"publisher_id":2,"instrument_id":15144},"action":"C","side":"A","price":"4108500000000","size":7,"channel_id":0,"order_id":"6470215846215416823","flags":128,"ts_in_delta":-22,"sequence":1170352,"ts_recv":"1704186000404085841"}"#;
        let record = v2().decode_json(line).unwrap();
        assert_eq!(record.action(), Some(Action::Cancel));
        assert_eq!(record.side(), Some(Side::Ask));
        match record {
            Record::Mbo(mbo) => {
                assert_eq!(mbo.order_id, 6_470_215_846_215_416_823);
                assert_eq!(mbo.ts_in_delta, -22);
                assert_eq!(mbo.price, FixedPrice(4_108_500_000_000));
                assert_eq!(mbo.hd.length, 14);
            }
            other => panic!("expected Mbo, got {:?}", other),
        }
    }

    #[test]
    fn v1_gateway_messages_fill_unset_fields() {
        let line = r#"{"hd":{"ts_event":"1","rtype":21,"publisher_id":0,"instrument_id":0},"err":"Unknown symbol"}"#;
        match v2().decode_json(line).unwrap() {
            Record::Error(err) => {
                assert_eq!(err.err, "Unknown symbol");
                assert_eq!(err.code, CODE_UNSET);
                assert!(err.is_last);
            }
            other => panic!("expected Error, got {:?}", other),
        }
        let line = r#"{"hd":{"ts_event":"1","rtype":21,"publisher_id":0,"instrument_id":0},"err":"Partial","code":3,"is_last":0}"#;
        match v2().decode_json(line).unwrap() {
            Record::Error(err) => {
                assert_eq!(err.code, 3);
                assert!(!err.is_last);
            }
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[test]
    fn unknown_rtype_keeps_the_line() {
        let line = "{\"hd\":{\"ts_event\":\"5\",\"rtype\":238,\"publisher_id\":1,\"instrument_id\":9},\"x\":1}\n";
        match v2().decode_json(line).unwrap() {
            Record::Unrecognized { header, bytes } => {
                assert_eq!(header.rtype, 0xEE);
                assert_eq!(header.instrument_id, 9);
                assert_eq!(bytes, line.trim_end().as_bytes());
            }
            other => panic!("expected Unrecognized, got {:?}", other),
        }
    }

    #[test]
    fn malformed_lines_are_format_errors() {
        let missing_hd = v2().decode_json(r#"{"open":"1"}"#).unwrap_err();
        assert!(matches!(missing_hd, DbnError::SerdeJson(_)));
        assert_eq!(missing_hd.class(), ErrorClass::Format);

        let missing_field = BAR.replace(r#","volume":"57""#, "");
        let err = v2().decode_json(&missing_field).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Format);

        let bad_char = r#"{"hd":{"ts_event":"1","rtype":0,"publisher_id":1,"instrument_id":1},"price":"1","size":1,"action":"TT","side":"N","flags":0,"depth":0,"ts_recv":"1","ts_in_delta":0,"sequence":0}"#;
        assert_eq!(v2().decode_json(bad_char).unwrap_err().class(), ErrorClass::Format);

        let bad_price = BAR.replace("\"372025000000000\"", "\"37x\"");
        assert_eq!(v2().decode_json(&bad_price).unwrap_err().class(), ErrorClass::Format);

        let cut = &BAR[..BAR.len() - 10];
        assert_eq!(v2().decode_json(cut).unwrap_err().class(), ErrorClass::Framing);
    }
}
