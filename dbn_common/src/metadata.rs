//! Metadata frame: the header at the start of every DBN file and live session.
//!
//! Two on-wire layouts exist. Version 1 stores symbols in 22-byte fields and
//! version 2 in 71-byte fields, and their fixed headers place the symbology
//! and `ts_out` fields at different offsets. `MetadataCodec` hides this:
//! both versions decode into the same `Metadata` value.
//!
//! Frame layout:
//! - prefix: `"DBN"`, version byte, `u32` length of everything that follows;
//! - fixed header (100 bytes, layout keyed by version);
//! - schema definition: `u32` byte length and opaque bytes, skipped;
//! - symbols, partial, not-found: `u32` count then fixed-width strings;
//! - mappings: `u32` count, then per mapping the raw symbol, a `u32` interval
//!   count and the intervals (`u32` start date, `u32` end date, symbol).
use std::io::{Read, Write};

use log::debug;
use serde::Serialize;

use crate::enums::{SCHEMA_MIXED, SType, Schema};
use crate::error::DbnError;
use crate::primitives::{ByteReader, ByteWriter, read_exact_or_truncated};
use crate::result::Result;
use crate::timestamp::UNDEF_TIMESTAMP;

/// Width of the dataset field.
pub const DATASET_CSTR_LEN: usize = 16;
/// Symbol width in version 1 frames and records.
pub const SYMBOL_CSTR_LEN_V1: usize = 22;
/// Symbol width in version 2 frames and records.
pub const SYMBOL_CSTR_LEN_V2: usize = 71;
/// Size of the fixed header following the prefix, for both versions.
pub const METADATA_FIXED_LEN: usize = 100;
/// Size of the `"DBN"` + version + length prefix.
pub const METADATA_PREFIX_LEN: usize = 8;

const METADATA_RESERVED_LEN_V1: usize = 47;
const METADATA_RESERVED_LEN_V2: usize = 53;
const STYPE_MIXED: u8 = u8::MAX;

/// DBN format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u8")]
pub enum DbnVersion {
    /// 22-byte symbols.
    V1,
    /// 71-byte symbols, larger error and system messages.
    V2,
}

impl DbnVersion {
    /// Version byte as written after `"DBN"`.
    pub fn as_u8(self) -> u8 {
        match self {
            DbnVersion::V1 => 1,
            DbnVersion::V2 => 2,
        }
    }

    /// Width of every fixed-width symbol field for this version.
    pub fn symbol_cstr_len(self) -> usize {
        match self {
            DbnVersion::V1 => SYMBOL_CSTR_LEN_V1,
            DbnVersion::V2 => SYMBOL_CSTR_LEN_V2,
        }
    }
}

impl From<DbnVersion> for u8 {
    fn from(version: DbnVersion) -> Self {
        version.as_u8()
    }
}

impl TryFrom<u8> for DbnVersion {
    type Error = DbnError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(DbnVersion::V1),
            2 => Ok(DbnVersion::V2),
            other => Err(DbnError::UnsupportedVersion(other)),
        }
    }
}

/// One interval of a symbol mapping. Dates are `YYYYMMDD`, end exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingInterval {
    /// First date the mapping applies to.
    pub start_date: u32,
    /// Date the mapping stops applying.
    pub end_date: u32,
    /// Symbol resolved for the interval.
    pub symbol: String,
}

/// Resolution of one requested symbol over time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolMapping {
    /// Symbol as requested, in `stype_in` symbology.
    pub raw_symbol: String,
    /// Ordered resolution intervals.
    pub intervals: Vec<MappingInterval>,
}

/// Decoded metadata, identical in shape for every format version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// Format version the frame was decoded from or will be encoded as.
    pub version: DbnVersion,
    /// Dataset code, e.g. `GLBX.MDP3`.
    pub dataset: String,
    /// Record schema. `None` when the stream mixes schemas, as live data does.
    pub schema: Option<Schema>,
    /// Query start in UNIX nanoseconds.
    pub start: u64,
    /// Query end in UNIX nanoseconds. `UNDEF_TIMESTAMP` when unset.
    pub end: u64,
    /// Maximum number of records. 0 means unlimited.
    pub limit: u64,
    /// Input symbology. `None` when mixed.
    pub stype_in: Option<SType>,
    /// Output symbology.
    pub stype_out: SType,
    /// Whether every record carries a trailing gateway send timestamp.
    pub ts_out: bool,
    /// Requested symbols.
    pub symbols: Vec<String>,
    /// Symbols resolved for only part of the query range.
    pub partial: Vec<String>,
    /// Symbols that could not be resolved.
    pub not_found: Vec<String>,
    /// Symbol resolutions.
    pub mappings: Vec<SymbolMapping>,
}

impl Metadata {
    /// Symbol field width, derived from the version.
    pub fn symbol_cstr_len(&self) -> usize {
        self.version.symbol_cstr_len()
    }

    /// Query end, or `None` when unset.
    pub fn end(&self) -> Option<u64> {
        (self.end != UNDEF_TIMESTAMP).then_some(self.end)
    }

    /// Returns `true` if mappings go from instrument ID to another symbology.
    ///
    /// Errors when neither side of the mapping is `instrument_id`.
    pub fn is_inverse_mapping(&self) -> Result<bool> {
        if self.stype_in == Some(SType::InstrumentId) {
            return Ok(true);
        }
        if self.stype_out == SType::InstrumentId {
            return Ok(false);
        }
        Err(DbnError::SymbolMap(
            "either stype_in or stype_out must be instrument_id".to_string(),
        ))
    }

    /// Copy of this metadata targeting another on-wire layout.
    pub fn with_version(&self, version: DbnVersion) -> Metadata {
        Metadata {
            version,
            ..self.clone()
        }
    }
}

/// Decoder and encoder for metadata frames.
pub struct MetadataCodec;

impl MetadataCodec {
    /// Reads exactly one metadata frame from `reader`.
    ///
    /// Consumes the prefix and the number of bytes it declares, nothing more.
    pub fn decode<R: Read>(reader: &mut R) -> Result<Metadata> {
        let mut prefix = [0u8; METADATA_PREFIX_LEN];
        read_exact_or_truncated(reader, &mut prefix, "metadata prefix", 0)?;
        let (version, length) = Self::decode_prefix(&prefix)?;

        // the length is untrusted: grow the buffer only as bytes arrive
        let mut body = Vec::new();
        let got = reader.by_ref().take(length as u64).read_to_end(&mut body)?;
        if got < length {
            return Err(DbnError::Truncated {
                context: "metadata body",
                offset: METADATA_PREFIX_LEN,
                expected: length,
                got,
            });
        }
        debug!(
            "Decoding DBN v{} metadata of {} bytes",
            version.as_u8(),
            length
        );
        Self::decode_body(version, &body)
    }

    /// Decodes a complete frame held in memory. Bytes after the frame are ignored.
    pub fn decode_bytes(bytes: &[u8]) -> Result<Metadata> {
        let mut reader = ByteReader::new(bytes);
        let prefix: [u8; METADATA_PREFIX_LEN] = reader.array("metadata prefix")?;
        let (version, length) = Self::decode_prefix(&prefix)?;
        let body = reader.take(length, "metadata body")?;
        Self::decode_body(version, body)
    }

    fn decode_prefix(prefix: &[u8; METADATA_PREFIX_LEN]) -> Result<(DbnVersion, usize)> {
        if &prefix[..3] != b"DBN" {
            return Err(DbnError::InvalidMagic([prefix[0], prefix[1], prefix[2]]));
        }
        let version = DbnVersion::try_from(prefix[3])?;
        let length = u32::from_le_bytes([prefix[4], prefix[5], prefix[6], prefix[7]]) as usize;
        Ok((version, length))
    }

    fn decode_body(version: DbnVersion, body: &[u8]) -> Result<Metadata> {
        let mut r = ByteReader::with_base(body, METADATA_PREFIX_LEN);

        let dataset = r.c_str(DATASET_CSTR_LEN, "dataset")?;
        let schema = decode_schema(&mut r)?;
        let start = r.u64("start")?;
        let end = r.u64("end")?;
        let limit = r.u64("limit")?;

        let (stype_in, stype_out, ts_out) = match version {
            DbnVersion::V1 => {
                r.skip(8, "record_count")?;
                let fields = decode_stypes_and_ts_out(&mut r)?;
                r.skip(METADATA_RESERVED_LEN_V1, "reserved")?;
                fields
            }
            DbnVersion::V2 => {
                let fields = decode_stypes_and_ts_out(&mut r)?;
                let width = r.u16("symbol_cstr_len")? as usize;
                if width != SYMBOL_CSTR_LEN_V2 {
                    return Err(DbnError::UnexpectedSymbolWidth {
                        version: version.as_u8(),
                        expected: SYMBOL_CSTR_LEN_V2,
                        got: width,
                    });
                }
                r.skip(METADATA_RESERVED_LEN_V2, "reserved")?;
                fields
            }
        };

        let schema_def_len = r.u32("schema_definition length")? as usize;
        r.skip(schema_def_len, "schema_definition")?;

        let width = version.symbol_cstr_len();
        let symbols = decode_symbol_list(&mut r, width, "symbols")?;
        let partial = decode_symbol_list(&mut r, width, "partial")?;
        let not_found = decode_symbol_list(&mut r, width, "not_found")?;
        let mappings = decode_mappings(&mut r, width)?;

        Ok(Metadata {
            version,
            dataset,
            schema,
            start,
            end,
            limit,
            stype_in,
            stype_out,
            ts_out,
            symbols,
            partial,
            not_found,
            mappings,
        })
    }

    /// Serializes `metadata` in the layout of its `version`.
    pub fn encode(metadata: &Metadata) -> Result<Vec<u8>> {
        let version = metadata.version;
        let width = version.symbol_cstr_len();
        let mut w = ByteWriter::with_capacity(METADATA_PREFIX_LEN + METADATA_FIXED_LEN + 64);

        w.bytes(b"DBN");
        w.u8(version.as_u8());
        w.u32(0);

        w.c_str(&metadata.dataset, DATASET_CSTR_LEN, "dataset")?;
        w.u16(metadata.schema.map_or(SCHEMA_MIXED, |s| s as u16));
        w.u64(metadata.start);
        w.u64(metadata.end);
        w.u64(metadata.limit);
        match version {
            DbnVersion::V1 => {
                w.u64(0);
                encode_stypes_and_ts_out(&mut w, metadata);
                w.zeros(METADATA_RESERVED_LEN_V1);
            }
            DbnVersion::V2 => {
                encode_stypes_and_ts_out(&mut w, metadata);
                w.u16(width as u16);
                w.zeros(METADATA_RESERVED_LEN_V2);
            }
        }

        w.u32(0);
        encode_symbol_list(&mut w, &metadata.symbols, width, "symbols")?;
        encode_symbol_list(&mut w, &metadata.partial, width, "partial")?;
        encode_symbol_list(&mut w, &metadata.not_found, width, "not_found")?;

        w.u32(metadata.mappings.len() as u32);
        for mapping in &metadata.mappings {
            w.c_str(&mapping.raw_symbol, width, "mapping raw_symbol")?;
            w.u32(mapping.intervals.len() as u32);
            for interval in &mapping.intervals {
                w.u32(interval.start_date);
                w.u32(interval.end_date);
                w.c_str(&interval.symbol, width, "mapping symbol")?;
            }
        }

        let length = (w.len() - METADATA_PREFIX_LEN) as u32;
        w.patch_u32(4, length);
        Ok(w.into_inner())
    }

    /// Serializes `metadata` and writes it to `writer`.
    pub fn write<W: Write>(writer: &mut W, metadata: &Metadata) -> Result<()> {
        let bytes = Self::encode(metadata)?;
        writer.write_all(&bytes)?;
        Ok(())
    }
}

fn decode_schema(r: &mut ByteReader<'_>) -> Result<Option<Schema>> {
    let offset = r.offset();
    let raw = r.u16("schema")?;
    if raw == SCHEMA_MIXED {
        return Ok(None);
    }
    Schema::try_from(raw)
        .map(Some)
        .map_err(|value| DbnError::UnknownValue {
            field: "schema",
            value: value as u64,
            offset,
        })
}

fn decode_stype(r: &mut ByteReader<'_>, field: &'static str) -> Result<Option<SType>> {
    let offset = r.offset();
    let raw = r.u8(field)?;
    if raw == STYPE_MIXED {
        return Ok(None);
    }
    SType::try_from(raw)
        .map(Some)
        .map_err(|value| DbnError::UnknownValue {
            field,
            value: value as u64,
            offset,
        })
}

fn decode_stypes_and_ts_out(r: &mut ByteReader<'_>) -> Result<(Option<SType>, SType, bool)> {
    let stype_in = decode_stype(r, "stype_in")?;
    let offset = r.offset();
    let stype_out = decode_stype(r, "stype_out")?.ok_or(DbnError::UnknownValue {
        field: "stype_out",
        value: STYPE_MIXED as u64,
        offset,
    })?;
    let ts_out = r.u8("ts_out")? != 0;
    Ok((stype_in, stype_out, ts_out))
}

fn encode_stypes_and_ts_out(w: &mut ByteWriter, metadata: &Metadata) {
    w.u8(metadata.stype_in.map_or(STYPE_MIXED, |s| s as u8));
    w.u8(metadata.stype_out as u8);
    w.u8(metadata.ts_out as u8);
}

fn decode_symbol_list(
    r: &mut ByteReader<'_>,
    width: usize,
    field: &'static str,
) -> Result<Vec<String>> {
    let count = r.u32(field)? as usize;
    let mut out = Vec::with_capacity(count.min(r.remaining() / width));
    for _ in 0..count {
        out.push(r.c_str(width, field)?);
    }
    Ok(out)
}

fn encode_symbol_list(
    w: &mut ByteWriter,
    symbols: &[String],
    width: usize,
    field: &'static str,
) -> Result<()> {
    w.u32(symbols.len() as u32);
    for symbol in symbols {
        w.c_str(symbol, width, field)?;
    }
    Ok(())
}

fn decode_mappings(r: &mut ByteReader<'_>, width: usize) -> Result<Vec<SymbolMapping>> {
    let count = r.u32("mappings")? as usize;
    let mut mappings = Vec::with_capacity(count.min(r.remaining() / (width + 4)));
    for _ in 0..count {
        let raw_symbol = r.c_str(width, "mapping raw_symbol")?;
        let interval_count = r.u32("mapping intervals")? as usize;
        let mut intervals = Vec::with_capacity(interval_count.min(r.remaining() / (width + 8)));
        for _ in 0..interval_count {
            let start_date = r.u32("interval start_date")?;
            let end_date = r.u32("interval end_date")?;
            let symbol = r.c_str(width, "mapping symbol")?;
            intervals.push(MappingInterval {
                start_date,
                end_date,
                symbol,
            });
        }
        mappings.push(SymbolMapping {
            raw_symbol,
            intervals,
        });
    }
    Ok(mappings)
}
