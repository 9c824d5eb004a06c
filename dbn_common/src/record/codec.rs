//! Record header and body codec.
//!
//! A `RecordCodec` is parameterized once by the stream's DBN version and its
//! `ts_out` flag; everything it returns is version-independent. Decoding
//! dispatches on the header's type tag, and every size is checked against
//! the layout before any field is read: a header whose `length` disagrees
//! with its type is a framing error.
use log::debug;

use crate::enums::rtype;
use crate::error::DbnError;
use crate::metadata::{DbnVersion, Metadata};
use crate::price::FixedPrice;
use crate::primitives::{ByteReader, ByteWriter};
use crate::record::{
    BboMsg, BidAskPair, CODE_UNSET, CbboMsg, Cmbp1Msg, ConsolidatedBidAskPair, ErrorMsg,
    ImbalanceMsg, InstrumentDefMsg, Mbp1Msg, Mbp10Msg, MboMsg, OhlcvMsg, RECORD_HEADER_LEN,
    Record, RecordHeader, STYPE_UNSET, StatMsg, StatusMsg, SymbolMappingMsg, SystemMsg, TradeMsg,
};
use crate::result::Result;
use crate::timestamp::UNDEF_TIMESTAMP;

const ERROR_ERR_LEN_V1: usize = 64;
const ERROR_ERR_LEN_V2: usize = 302;
const SYSTEM_MSG_LEN_V1: usize = 64;
const SYSTEM_MSG_LEN_V2: usize = 303;
const TS_OUT_LEN: usize = 8;

/// Fixed body layouts, one per record struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Layout {
    Mbo,
    Trade,
    Mbp1,
    Mbp10,
    Bbo,
    Cmbp1,
    Cbbo,
    Ohlcv,
    Status,
    InstrumentDef,
    Imbalance,
    Statistics,
    Error,
    System,
    SymbolMapping,
}

impl Layout {
    pub(super) fn for_rtype(tag: u8) -> Option<Layout> {
        Some(match tag {
            rtype::MBO => Layout::Mbo,
            rtype::MBP_0 => Layout::Trade,
            rtype::MBP_1 => Layout::Mbp1,
            rtype::MBP_10 => Layout::Mbp10,
            rtype::BBO_1S | rtype::BBO_1M => Layout::Bbo,
            rtype::CMBP_1 | rtype::TCBBO => Layout::Cmbp1,
            rtype::CBBO_1S | rtype::CBBO_1M => Layout::Cbbo,
            rtype::OHLCV_DEPRECATED
            | rtype::OHLCV_1S
            | rtype::OHLCV_1M
            | rtype::OHLCV_1H
            | rtype::OHLCV_1D
            | rtype::OHLCV_EOD => Layout::Ohlcv,
            rtype::STATUS => Layout::Status,
            rtype::INSTRUMENT_DEF => Layout::InstrumentDef,
            rtype::IMBALANCE => Layout::Imbalance,
            rtype::STATISTICS => Layout::Statistics,
            rtype::ERROR => Layout::Error,
            rtype::SYSTEM => Layout::System,
            rtype::SYMBOL_MAPPING => Layout::SymbolMapping,
            _ => return None,
        })
    }

    fn of(record: &Record) -> Option<Layout> {
        Some(match record {
            Record::Mbo(_) => Layout::Mbo,
            Record::Trade(_) => Layout::Trade,
            Record::Mbp1(_) => Layout::Mbp1,
            Record::Mbp10(_) => Layout::Mbp10,
            Record::Bbo(_) => Layout::Bbo,
            Record::Cmbp1(_) => Layout::Cmbp1,
            Record::Cbbo(_) => Layout::Cbbo,
            Record::Ohlcv(_) => Layout::Ohlcv,
            Record::Status(_) => Layout::Status,
            Record::InstrumentDef(_) => Layout::InstrumentDef,
            Record::Imbalance(_) => Layout::Imbalance,
            Record::Statistics(_) => Layout::Statistics,
            Record::Error(_) => Layout::Error,
            Record::System(_) => Layout::System,
            Record::SymbolMapping(_) => Layout::SymbolMapping,
            Record::Unrecognized { .. } => return None,
        })
    }

    /// Record size in bytes, header included, without `ts_out`.
    fn size(self, version: DbnVersion) -> usize {
        let v1 = version == DbnVersion::V1;
        match self {
            Layout::Mbo => 56,
            Layout::Trade => 48,
            Layout::Mbp1 | Layout::Bbo | Layout::Cmbp1 | Layout::Cbbo => 80,
            Layout::Mbp10 => 368,
            Layout::Ohlcv => 56,
            Layout::Status => 40,
            Layout::InstrumentDef if v1 => 360,
            Layout::InstrumentDef => 400,
            Layout::Imbalance => 112,
            Layout::Statistics => 64,
            Layout::Error | Layout::System if v1 => 80,
            Layout::Error | Layout::System => 320,
            Layout::SymbolMapping if v1 => 80,
            Layout::SymbolMapping => 176,
        }
    }
}

/// Decoder and encoder for record frames of one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordCodec {
    version: DbnVersion,
    ts_out: bool,
}

impl RecordCodec {
    /// Codec for records of a `version` stream, with or without trailing `ts_out`.
    pub fn new(version: DbnVersion, ts_out: bool) -> Self {
        RecordCodec { version, ts_out }
    }

    /// Codec for the records following `metadata`.
    pub fn for_metadata(metadata: &Metadata) -> Self {
        Self::new(metadata.version, metadata.ts_out)
    }

    /// DBN version of the records.
    pub fn version(&self) -> DbnVersion {
        self.version
    }

    /// Whether records carry a trailing send timestamp.
    pub fn has_ts_out(&self) -> bool {
        self.ts_out
    }

    /// Total frame size for `rtype`, `ts_out` included. `None` for unknown tags.
    pub fn expected_size(&self, tag: u8) -> Option<usize> {
        let extra = if self.ts_out { TS_OUT_LEN } else { 0 };
        Layout::for_rtype(tag).map(|layout| layout.size(self.version) + extra)
    }

    /// Builds a header whose `length` matches this codec's layout for `rtype`.
    pub fn header(
        &self,
        tag: u8,
        publisher_id: u16,
        instrument_id: u32,
        ts_event: u64,
    ) -> Result<RecordHeader> {
        let size = self.expected_size(tag).ok_or(DbnError::UnknownValue {
            field: "rtype",
            value: tag as u64,
            offset: 1,
        })?;
        Ok(RecordHeader {
            length: (size / 4) as u8,
            rtype: tag,
            publisher_id,
            instrument_id,
            ts_event,
        })
    }

    /// Decodes the 16-byte header at the start of `bytes`.
    pub fn decode_header(bytes: &[u8]) -> Result<RecordHeader> {
        let mut r = ByteReader::new(bytes);
        let length = r.u8("record header")?;
        let header = RecordHeader {
            length,
            rtype: r.u8("record header")?,
            publisher_id: r.u16("record header")?,
            instrument_id: r.u32("record header")?,
            ts_event: r.u64("record header")?,
        };
        if header.record_size() < RECORD_HEADER_LEN {
            return Err(DbnError::RecordTooShort { length });
        }
        Ok(header)
    }

    /// Decodes a complete frame: header, body and optional `ts_out`.
    pub fn decode(&self, frame: &[u8]) -> Result<Record> {
        let header = Self::decode_header(frame)?;
        self.decode_body(&header, &frame[RECORD_HEADER_LEN..])
    }

    /// Decodes the bytes following `header`.
    ///
    /// `body` must hold exactly `header.length * 4 - 16` bytes. Unknown type
    /// tags become `Record::Unrecognized` holding the whole frame.
    pub fn decode_body(&self, header: &RecordHeader, body: &[u8]) -> Result<Record> {
        let declared = header.record_size();
        if body.len() + RECORD_HEADER_LEN != declared {
            return Err(DbnError::RecordLength {
                rtype: header.rtype,
                expected: declared,
                got: body.len() + RECORD_HEADER_LEN,
            });
        }
        let Some(layout) = Layout::for_rtype(header.rtype) else {
            debug!(
                "Unrecognized rtype {:#04x} ({} bytes), keeping raw bytes",
                header.rtype, declared
            );
            let mut bytes = Vec::with_capacity(declared);
            bytes.extend_from_slice(&encode_header(header));
            bytes.extend_from_slice(body);
            return Ok(Record::Unrecognized {
                header: *header,
                bytes,
            });
        };
        let expected = self.layout_size(layout);
        if declared != expected {
            return Err(DbnError::RecordLength {
                rtype: header.rtype,
                expected,
                got: declared,
            });
        }

        let hd = *header;
        let version = self.version;
        let r = &mut ByteReader::with_base(body, RECORD_HEADER_LEN);
        let record = match layout {
            Layout::Mbo => Record::Mbo(MboMsg::decode(hd, r)?),
            Layout::Trade => Record::Trade(TradeMsg::decode(hd, r)?),
            Layout::Mbp1 => Record::Mbp1(Mbp1Msg::decode(hd, r)?),
            Layout::Mbp10 => Record::Mbp10(Box::new(Mbp10Msg::decode(hd, r)?)),
            Layout::Bbo => Record::Bbo(BboMsg::decode(hd, r)?),
            Layout::Cmbp1 => Record::Cmbp1(Cmbp1Msg::decode(hd, r)?),
            Layout::Cbbo => Record::Cbbo(CbboMsg::decode(hd, r)?),
            Layout::Ohlcv => Record::Ohlcv(OhlcvMsg::decode(hd, r)?),
            Layout::Status => Record::Status(StatusMsg::decode(hd, r)?),
            Layout::InstrumentDef => {
                Record::InstrumentDef(Box::new(InstrumentDefMsg::decode(hd, r, version)?))
            }
            Layout::Imbalance => Record::Imbalance(ImbalanceMsg::decode(hd, r)?),
            Layout::Statistics => Record::Statistics(StatMsg::decode(hd, r)?),
            Layout::Error => Record::Error(ErrorMsg::decode(hd, r, version)?),
            Layout::System => Record::System(SystemMsg::decode(hd, r, version)?),
            Layout::SymbolMapping => {
                Record::SymbolMapping(SymbolMappingMsg::decode(hd, r, version)?)
            }
        };
        Ok(record)
    }

    /// Trailing send timestamp of a known-layout frame, when `ts_out` is on.
    pub fn ts_out(&self, frame: &[u8]) -> Option<u64> {
        if !self.ts_out || frame.len() < RECORD_HEADER_LEN + TS_OUT_LEN {
            return None;
        }
        let mut r = ByteReader::new(&frame[frame.len() - TS_OUT_LEN..]);
        r.u64("ts_out").ok()
    }

    /// Encodes `record`. With `ts_out` enabled the trailer is `UNDEF_TIMESTAMP`.
    pub fn encode(&self, record: &Record) -> Result<Vec<u8>> {
        self.encode_inner(record, UNDEF_TIMESTAMP)
    }

    /// Encodes `record` followed by the send timestamp `ts_out`.
    pub fn encode_with_ts_out(&self, record: &Record, ts_out: u64) -> Result<Vec<u8>> {
        if !self.ts_out {
            return Err(DbnError::Config(
                "codec was created without ts_out".to_string(),
            ));
        }
        self.encode_inner(record, ts_out)
    }

    pub(super) fn layout_size(&self, layout: Layout) -> usize {
        layout.size(self.version) + if self.ts_out { TS_OUT_LEN } else { 0 }
    }

    fn encode_inner(&self, record: &Record, ts_out: u64) -> Result<Vec<u8>> {
        let hd = record.header();
        let Some(layout) = Layout::of(record) else {
            if let Record::Unrecognized { header, bytes } = record {
                if bytes.len() != header.record_size() {
                    return Err(DbnError::RecordLength {
                        rtype: header.rtype,
                        expected: header.record_size(),
                        got: bytes.len(),
                    });
                }
                return Ok(bytes.clone());
            }
            return Err(DbnError::UnknownValue {
                field: "rtype",
                value: hd.rtype as u64,
                offset: 1,
            });
        };
        if Layout::for_rtype(hd.rtype) != Some(layout) {
            return Err(DbnError::UnknownValue {
                field: "rtype",
                value: hd.rtype as u64,
                offset: 1,
            });
        }
        let expected = self.layout_size(layout);
        if hd.record_size() != expected {
            return Err(DbnError::RecordLength {
                rtype: hd.rtype,
                expected,
                got: hd.record_size(),
            });
        }

        let version = self.version;
        let mut w = ByteWriter::with_capacity(expected);
        w.bytes(&encode_header(hd));
        match record {
            Record::Mbo(r) => r.encode(&mut w),
            Record::Trade(r) => r.encode(&mut w),
            Record::Mbp1(r) => r.encode(&mut w),
            Record::Mbp10(r) => r.encode(&mut w),
            Record::Bbo(r) => r.encode(&mut w),
            Record::Cmbp1(r) => r.encode(&mut w),
            Record::Cbbo(r) => r.encode(&mut w),
            Record::Ohlcv(r) => r.encode(&mut w),
            Record::Status(r) => r.encode(&mut w),
            Record::InstrumentDef(r) => r.encode(&mut w, version)?,
            Record::Imbalance(r) => r.encode(&mut w),
            Record::Statistics(r) => r.encode(&mut w),
            Record::Error(r) => r.encode(&mut w, version)?,
            Record::System(r) => r.encode(&mut w, version)?,
            Record::SymbolMapping(r) => r.encode(&mut w, version)?,
            Record::Unrecognized { .. } => {}
        }
        if self.ts_out {
            w.u64(ts_out);
        }
        debug_assert_eq!(w.len(), expected);
        Ok(w.into_inner())
    }
}

fn encode_header(hd: &RecordHeader) -> [u8; RECORD_HEADER_LEN] {
    let mut w = ByteWriter::with_capacity(RECORD_HEADER_LEN);
    w.u8(hd.length);
    w.u8(hd.rtype);
    w.u16(hd.publisher_id);
    w.u32(hd.instrument_id);
    w.u64(hd.ts_event);
    let mut out = [0u8; RECORD_HEADER_LEN];
    out.copy_from_slice(&w.into_inner());
    out
}

fn price(r: &mut ByteReader<'_>, field: &'static str) -> Result<FixedPrice> {
    Ok(FixedPrice(r.i64(field)?))
}

fn decode_pair(r: &mut ByteReader<'_>) -> Result<BidAskPair> {
    Ok(BidAskPair {
        bid_px: price(r, "bid_px")?,
        ask_px: price(r, "ask_px")?,
        bid_sz: r.u32("bid_sz")?,
        ask_sz: r.u32("ask_sz")?,
        bid_ct: r.u32("bid_ct")?,
        ask_ct: r.u32("ask_ct")?,
    })
}

fn encode_pair(w: &mut ByteWriter, pair: &BidAskPair) {
    w.i64(pair.bid_px.raw());
    w.i64(pair.ask_px.raw());
    w.u32(pair.bid_sz);
    w.u32(pair.ask_sz);
    w.u32(pair.bid_ct);
    w.u32(pair.ask_ct);
}

fn decode_consolidated_pair(r: &mut ByteReader<'_>) -> Result<ConsolidatedBidAskPair> {
    let bid_px = price(r, "bid_px")?;
    let ask_px = price(r, "ask_px")?;
    let bid_sz = r.u32("bid_sz")?;
    let ask_sz = r.u32("ask_sz")?;
    let bid_pb = r.u16("bid_pb")?;
    r.skip(2, "reserved")?;
    let ask_pb = r.u16("ask_pb")?;
    r.skip(2, "reserved")?;
    Ok(ConsolidatedBidAskPair {
        bid_px,
        ask_px,
        bid_sz,
        ask_sz,
        bid_pb,
        ask_pb,
    })
}

fn encode_consolidated_pair(w: &mut ByteWriter, pair: &ConsolidatedBidAskPair) {
    w.i64(pair.bid_px.raw());
    w.i64(pair.ask_px.raw());
    w.u32(pair.bid_sz);
    w.u32(pair.ask_sz);
    w.u16(pair.bid_pb);
    w.zeros(2);
    w.u16(pair.ask_pb);
    w.zeros(2);
}

impl MboMsg {
    fn decode(hd: RecordHeader, r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(MboMsg {
            hd,
            order_id: r.u64("order_id")?,
            price: price(r, "price")?,
            size: r.u32("size")?,
            flags: r.u8("flags")?,
            channel_id: r.u8("channel_id")?,
            action: r.u8("action")?,
            side: r.u8("side")?,
            ts_recv: r.u64("ts_recv")?,
            ts_in_delta: r.i32("ts_in_delta")?,
            sequence: r.u32("sequence")?,
        })
    }

    fn encode(&self, w: &mut ByteWriter) {
        w.u64(self.order_id);
        w.i64(self.price.raw());
        w.u32(self.size);
        w.u8(self.flags);
        w.u8(self.channel_id);
        w.u8(self.action);
        w.u8(self.side);
        w.u64(self.ts_recv);
        w.i32(self.ts_in_delta);
        w.u32(self.sequence);
    }
}

impl TradeMsg {
    fn decode(hd: RecordHeader, r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(TradeMsg {
            hd,
            price: price(r, "price")?,
            size: r.u32("size")?,
            action: r.u8("action")?,
            side: r.u8("side")?,
            flags: r.u8("flags")?,
            depth: r.u8("depth")?,
            ts_recv: r.u64("ts_recv")?,
            ts_in_delta: r.i32("ts_in_delta")?,
            sequence: r.u32("sequence")?,
        })
    }

    fn encode(&self, w: &mut ByteWriter) {
        w.i64(self.price.raw());
        w.u32(self.size);
        w.u8(self.action);
        w.u8(self.side);
        w.u8(self.flags);
        w.u8(self.depth);
        w.u64(self.ts_recv);
        w.i32(self.ts_in_delta);
        w.u32(self.sequence);
    }
}

impl Mbp1Msg {
    fn decode(hd: RecordHeader, r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Mbp1Msg {
            hd,
            price: price(r, "price")?,
            size: r.u32("size")?,
            action: r.u8("action")?,
            side: r.u8("side")?,
            flags: r.u8("flags")?,
            depth: r.u8("depth")?,
            ts_recv: r.u64("ts_recv")?,
            ts_in_delta: r.i32("ts_in_delta")?,
            sequence: r.u32("sequence")?,
            levels: [decode_pair(r)?],
        })
    }

    fn encode(&self, w: &mut ByteWriter) {
        w.i64(self.price.raw());
        w.u32(self.size);
        w.u8(self.action);
        w.u8(self.side);
        w.u8(self.flags);
        w.u8(self.depth);
        w.u64(self.ts_recv);
        w.i32(self.ts_in_delta);
        w.u32(self.sequence);
        encode_pair(w, &self.levels[0]);
    }
}

impl Mbp10Msg {
    fn decode(hd: RecordHeader, r: &mut ByteReader<'_>) -> Result<Self> {
        let price = price(r, "price")?;
        let size = r.u32("size")?;
        let action = r.u8("action")?;
        let side = r.u8("side")?;
        let flags = r.u8("flags")?;
        let depth = r.u8("depth")?;
        let ts_recv = r.u64("ts_recv")?;
        let ts_in_delta = r.i32("ts_in_delta")?;
        let sequence = r.u32("sequence")?;
        let mut levels = [BidAskPair::default(); 10];
        for level in levels.iter_mut() {
            *level = decode_pair(r)?;
        }
        Ok(Mbp10Msg {
            hd,
            price,
            size,
            action,
            side,
            flags,
            depth,
            ts_recv,
            ts_in_delta,
            sequence,
            levels,
        })
    }

    fn encode(&self, w: &mut ByteWriter) {
        w.i64(self.price.raw());
        w.u32(self.size);
        w.u8(self.action);
        w.u8(self.side);
        w.u8(self.flags);
        w.u8(self.depth);
        w.u64(self.ts_recv);
        w.i32(self.ts_in_delta);
        w.u32(self.sequence);
        for level in &self.levels {
            encode_pair(w, level);
        }
    }
}

impl BboMsg {
    fn decode(hd: RecordHeader, r: &mut ByteReader<'_>) -> Result<Self> {
        let price = price(r, "price")?;
        let size = r.u32("size")?;
        r.skip(1, "reserved")?;
        let side = r.u8("side")?;
        let flags = r.u8("flags")?;
        r.skip(1, "reserved")?;
        let ts_recv = r.u64("ts_recv")?;
        r.skip(4, "reserved")?;
        let sequence = r.u32("sequence")?;
        Ok(BboMsg {
            hd,
            price,
            size,
            side,
            flags,
            ts_recv,
            sequence,
            levels: [decode_pair(r)?],
        })
    }

    fn encode(&self, w: &mut ByteWriter) {
        w.i64(self.price.raw());
        w.u32(self.size);
        w.zeros(1);
        w.u8(self.side);
        w.u8(self.flags);
        w.zeros(1);
        w.u64(self.ts_recv);
        w.zeros(4);
        w.u32(self.sequence);
        encode_pair(w, &self.levels[0]);
    }
}

impl Cmbp1Msg {
    fn decode(hd: RecordHeader, r: &mut ByteReader<'_>) -> Result<Self> {
        let price = price(r, "price")?;
        let size = r.u32("size")?;
        let action = r.u8("action")?;
        let side = r.u8("side")?;
        let flags = r.u8("flags")?;
        r.skip(1, "reserved")?;
        let ts_recv = r.u64("ts_recv")?;
        let ts_in_delta = r.i32("ts_in_delta")?;
        r.skip(4, "reserved")?;
        Ok(Cmbp1Msg {
            hd,
            price,
            size,
            action,
            side,
            flags,
            ts_recv,
            ts_in_delta,
            levels: [decode_consolidated_pair(r)?],
        })
    }

    fn encode(&self, w: &mut ByteWriter) {
        w.i64(self.price.raw());
        w.u32(self.size);
        w.u8(self.action);
        w.u8(self.side);
        w.u8(self.flags);
        w.zeros(1);
        w.u64(self.ts_recv);
        w.i32(self.ts_in_delta);
        w.zeros(4);
        encode_consolidated_pair(w, &self.levels[0]);
    }
}

impl CbboMsg {
    fn decode(hd: RecordHeader, r: &mut ByteReader<'_>) -> Result<Self> {
        let price = price(r, "price")?;
        let size = r.u32("size")?;
        r.skip(1, "reserved")?;
        let side = r.u8("side")?;
        let flags = r.u8("flags")?;
        r.skip(1, "reserved")?;
        let ts_recv = r.u64("ts_recv")?;
        r.skip(8, "reserved")?;
        Ok(CbboMsg {
            hd,
            price,
            size,
            side,
            flags,
            ts_recv,
            levels: [decode_consolidated_pair(r)?],
        })
    }

    fn encode(&self, w: &mut ByteWriter) {
        w.i64(self.price.raw());
        w.u32(self.size);
        w.zeros(1);
        w.u8(self.side);
        w.u8(self.flags);
        w.zeros(1);
        w.u64(self.ts_recv);
        w.zeros(8);
        encode_consolidated_pair(w, &self.levels[0]);
    }
}

impl OhlcvMsg {
    fn decode(hd: RecordHeader, r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(OhlcvMsg {
            hd,
            open: price(r, "open")?,
            high: price(r, "high")?,
            low: price(r, "low")?,
            close: price(r, "close")?,
            volume: r.u64("volume")?,
        })
    }

    fn encode(&self, w: &mut ByteWriter) {
        w.i64(self.open.raw());
        w.i64(self.high.raw());
        w.i64(self.low.raw());
        w.i64(self.close.raw());
        w.u64(self.volume);
    }
}

impl StatusMsg {
    fn decode(hd: RecordHeader, r: &mut ByteReader<'_>) -> Result<Self> {
        let msg = StatusMsg {
            hd,
            ts_recv: r.u64("ts_recv")?,
            action: r.u16("action")?,
            reason: r.u16("reason")?,
            trading_event: r.u16("trading_event")?,
            is_trading: r.u8("is_trading")?,
            is_quoting: r.u8("is_quoting")?,
            is_short_sell_restricted: r.u8("is_short_sell_restricted")?,
        };
        r.skip(7, "reserved")?;
        Ok(msg)
    }

    fn encode(&self, w: &mut ByteWriter) {
        w.u64(self.ts_recv);
        w.u16(self.action);
        w.u16(self.reason);
        w.u16(self.trading_event);
        w.u8(self.is_trading);
        w.u8(self.is_quoting);
        w.u8(self.is_short_sell_restricted);
        w.zeros(7);
    }
}

impl InstrumentDefMsg {
    fn decode(hd: RecordHeader, r: &mut ByteReader<'_>, version: DbnVersion) -> Result<Self> {
        let v1 = version == DbnVersion::V1;
        let ts_recv = r.u64("ts_recv")?;
        let min_price_increment = price(r, "min_price_increment")?;
        let display_factor = price(r, "display_factor")?;
        let expiration = r.u64("expiration")?;
        let activation = r.u64("activation")?;
        let high_limit_price = price(r, "high_limit_price")?;
        let low_limit_price = price(r, "low_limit_price")?;
        let max_price_variation = price(r, "max_price_variation")?;
        let trading_reference_price = price(r, "trading_reference_price")?;
        let unit_of_measure_qty = price(r, "unit_of_measure_qty")?;
        let min_price_increment_amount = price(r, "min_price_increment_amount")?;
        let price_ratio = price(r, "price_ratio")?;
        let mut strike_price = if v1 {
            FixedPrice::UNDEF
        } else {
            price(r, "strike_price")?
        };
        let inst_attrib_value = r.i32("inst_attrib_value")?;
        let underlying_id = r.u32("underlying_id")?;
        let raw_instrument_id = r.u32("raw_instrument_id")?;
        let market_depth_implied = r.i32("market_depth_implied")?;
        let market_depth = r.i32("market_depth")?;
        let market_segment_id = r.u32("market_segment_id")?;
        let max_trade_vol = r.u32("max_trade_vol")?;
        let min_lot_size = r.i32("min_lot_size")?;
        let min_lot_size_block = r.i32("min_lot_size_block")?;
        let min_lot_size_round_lot = r.i32("min_lot_size_round_lot")?;
        let min_trade_vol = r.u32("min_trade_vol")?;
        if v1 {
            r.skip(4, "reserved")?;
        }
        let contract_multiplier = r.i32("contract_multiplier")?;
        let decay_quantity = r.i32("decay_quantity")?;
        let original_contract_size = r.i32("original_contract_size")?;
        if v1 {
            r.skip(4, "reserved")?;
        }
        let trading_reference_date = r.u16("trading_reference_date")?;
        let appl_id = r.i16("appl_id")?;
        let maturity_year = r.u16("maturity_year")?;
        let decay_start_date = r.u16("decay_start_date")?;
        let channel_id = r.u16("channel_id")?;
        let currency = r.c_str(4, "currency")?;
        let settl_currency = r.c_str(4, "settl_currency")?;
        let secsubtype = r.c_str(6, "secsubtype")?;
        let raw_symbol = r.c_str(version.symbol_cstr_len(), "raw_symbol")?;
        let group = r.c_str(21, "group")?;
        let exchange = r.c_str(5, "exchange")?;
        let asset = r.c_str(7, "asset")?;
        let cfi = r.c_str(7, "cfi")?;
        let security_type = r.c_str(7, "security_type")?;
        let unit_of_measure = r.c_str(31, "unit_of_measure")?;
        let underlying = r.c_str(21, "underlying")?;
        let strike_price_currency = r.c_str(4, "strike_price_currency")?;
        let instrument_class = r.u8("instrument_class")?;
        if v1 {
            r.skip(2, "reserved")?;
            strike_price = price(r, "strike_price")?;
            r.skip(6, "reserved")?;
        }
        let msg = InstrumentDefMsg {
            hd,
            ts_recv,
            min_price_increment,
            display_factor,
            expiration,
            activation,
            high_limit_price,
            low_limit_price,
            max_price_variation,
            trading_reference_price,
            unit_of_measure_qty,
            min_price_increment_amount,
            price_ratio,
            strike_price,
            inst_attrib_value,
            underlying_id,
            raw_instrument_id,
            market_depth_implied,
            market_depth,
            market_segment_id,
            max_trade_vol,
            min_lot_size,
            min_lot_size_block,
            min_lot_size_round_lot,
            min_trade_vol,
            contract_multiplier,
            decay_quantity,
            original_contract_size,
            trading_reference_date,
            appl_id,
            maturity_year,
            decay_start_date,
            channel_id,
            currency,
            settl_currency,
            secsubtype,
            raw_symbol,
            group,
            exchange,
            asset,
            cfi,
            security_type,
            unit_of_measure,
            underlying,
            strike_price_currency,
            instrument_class,
            match_algorithm: r.u8("match_algorithm")?,
            md_security_trading_status: r.u8("md_security_trading_status")?,
            main_fraction: r.u8("main_fraction")?,
            price_display_format: r.u8("price_display_format")?,
            settl_price_type: r.u8("settl_price_type")?,
            sub_fraction: r.u8("sub_fraction")?,
            underlying_product: r.u8("underlying_product")?,
            security_update_action: r.u8("security_update_action")?,
            maturity_month: r.u8("maturity_month")?,
            maturity_day: r.u8("maturity_day")?,
            maturity_week: r.u8("maturity_week")?,
            user_defined_instrument: r.u8("user_defined_instrument")?,
            contract_multiplier_unit: r.i8("contract_multiplier_unit")?,
            flow_schedule_type: r.i8("flow_schedule_type")?,
            tick_rule: r.u8("tick_rule")?,
        };
        r.skip(if v1 { 3 } else { 10 }, "reserved")?;
        Ok(msg)
    }

    fn encode(&self, w: &mut ByteWriter, version: DbnVersion) -> Result<()> {
        let v1 = version == DbnVersion::V1;
        w.u64(self.ts_recv);
        w.i64(self.min_price_increment.raw());
        w.i64(self.display_factor.raw());
        w.u64(self.expiration);
        w.u64(self.activation);
        w.i64(self.high_limit_price.raw());
        w.i64(self.low_limit_price.raw());
        w.i64(self.max_price_variation.raw());
        w.i64(self.trading_reference_price.raw());
        w.i64(self.unit_of_measure_qty.raw());
        w.i64(self.min_price_increment_amount.raw());
        w.i64(self.price_ratio.raw());
        if !v1 {
            w.i64(self.strike_price.raw());
        }
        w.i32(self.inst_attrib_value);
        w.u32(self.underlying_id);
        w.u32(self.raw_instrument_id);
        w.i32(self.market_depth_implied);
        w.i32(self.market_depth);
        w.u32(self.market_segment_id);
        w.u32(self.max_trade_vol);
        w.i32(self.min_lot_size);
        w.i32(self.min_lot_size_block);
        w.i32(self.min_lot_size_round_lot);
        w.u32(self.min_trade_vol);
        if v1 {
            w.zeros(4);
        }
        w.i32(self.contract_multiplier);
        w.i32(self.decay_quantity);
        w.i32(self.original_contract_size);
        if v1 {
            w.zeros(4);
        }
        w.u16(self.trading_reference_date);
        w.i16(self.appl_id);
        w.u16(self.maturity_year);
        w.u16(self.decay_start_date);
        w.u16(self.channel_id);
        w.c_str(&self.currency, 4, "currency")?;
        w.c_str(&self.settl_currency, 4, "settl_currency")?;
        w.c_str(&self.secsubtype, 6, "secsubtype")?;
        w.c_str(&self.raw_symbol, version.symbol_cstr_len(), "raw_symbol")?;
        w.c_str(&self.group, 21, "group")?;
        w.c_str(&self.exchange, 5, "exchange")?;
        w.c_str(&self.asset, 7, "asset")?;
        w.c_str(&self.cfi, 7, "cfi")?;
        w.c_str(&self.security_type, 7, "security_type")?;
        w.c_str(&self.unit_of_measure, 31, "unit_of_measure")?;
        w.c_str(&self.underlying, 21, "underlying")?;
        w.c_str(&self.strike_price_currency, 4, "strike_price_currency")?;
        w.u8(self.instrument_class);
        if v1 {
            w.zeros(2);
            w.i64(self.strike_price.raw());
            w.zeros(6);
        }
        w.u8(self.match_algorithm);
        w.u8(self.md_security_trading_status);
        w.u8(self.main_fraction);
        w.u8(self.price_display_format);
        w.u8(self.settl_price_type);
        w.u8(self.sub_fraction);
        w.u8(self.underlying_product);
        w.u8(self.security_update_action);
        w.u8(self.maturity_month);
        w.u8(self.maturity_day);
        w.u8(self.maturity_week);
        w.u8(self.user_defined_instrument);
        w.i8(self.contract_multiplier_unit);
        w.i8(self.flow_schedule_type);
        w.u8(self.tick_rule);
        w.zeros(if v1 { 3 } else { 10 });
        Ok(())
    }
}

impl ImbalanceMsg {
    fn decode(hd: RecordHeader, r: &mut ByteReader<'_>) -> Result<Self> {
        let msg = ImbalanceMsg {
            hd,
            ts_recv: r.u64("ts_recv")?,
            ref_price: price(r, "ref_price")?,
            auction_time: r.u64("auction_time")?,
            cont_book_clr_price: price(r, "cont_book_clr_price")?,
            auct_interest_clr_price: price(r, "auct_interest_clr_price")?,
            ssr_filling_price: price(r, "ssr_filling_price")?,
            ind_match_price: price(r, "ind_match_price")?,
            upper_collar: price(r, "upper_collar")?,
            lower_collar: price(r, "lower_collar")?,
            paired_qty: r.u32("paired_qty")?,
            total_imbalance_qty: r.u32("total_imbalance_qty")?,
            market_imbalance_qty: r.u32("market_imbalance_qty")?,
            unpaired_qty: r.u32("unpaired_qty")?,
            auction_type: r.u8("auction_type")?,
            side: r.u8("side")?,
            auction_status: r.u8("auction_status")?,
            freeze_status: r.u8("freeze_status")?,
            num_extensions: r.u8("num_extensions")?,
            unpaired_side: r.u8("unpaired_side")?,
            significant_imbalance: r.u8("significant_imbalance")?,
        };
        r.skip(1, "reserved")?;
        Ok(msg)
    }

    fn encode(&self, w: &mut ByteWriter) {
        w.u64(self.ts_recv);
        w.i64(self.ref_price.raw());
        w.u64(self.auction_time);
        w.i64(self.cont_book_clr_price.raw());
        w.i64(self.auct_interest_clr_price.raw());
        w.i64(self.ssr_filling_price.raw());
        w.i64(self.ind_match_price.raw());
        w.i64(self.upper_collar.raw());
        w.i64(self.lower_collar.raw());
        w.u32(self.paired_qty);
        w.u32(self.total_imbalance_qty);
        w.u32(self.market_imbalance_qty);
        w.u32(self.unpaired_qty);
        w.u8(self.auction_type);
        w.u8(self.side);
        w.u8(self.auction_status);
        w.u8(self.freeze_status);
        w.u8(self.num_extensions);
        w.u8(self.unpaired_side);
        w.u8(self.significant_imbalance);
        w.zeros(1);
    }
}

impl StatMsg {
    fn decode(hd: RecordHeader, r: &mut ByteReader<'_>) -> Result<Self> {
        let msg = StatMsg {
            hd,
            ts_recv: r.u64("ts_recv")?,
            ts_ref: r.u64("ts_ref")?,
            price: price(r, "price")?,
            quantity: r.i32("quantity")?,
            sequence: r.u32("sequence")?,
            ts_in_delta: r.i32("ts_in_delta")?,
            stat_type: r.u16("stat_type")?,
            channel_id: r.u16("channel_id")?,
            update_action: r.u8("update_action")?,
            stat_flags: r.u8("stat_flags")?,
        };
        r.skip(6, "reserved")?;
        Ok(msg)
    }

    fn encode(&self, w: &mut ByteWriter) {
        w.u64(self.ts_recv);
        w.u64(self.ts_ref);
        w.i64(self.price.raw());
        w.i32(self.quantity);
        w.u32(self.sequence);
        w.i32(self.ts_in_delta);
        w.u16(self.stat_type);
        w.u16(self.channel_id);
        w.u8(self.update_action);
        w.u8(self.stat_flags);
        w.zeros(6);
    }
}

impl ErrorMsg {
    fn decode(hd: RecordHeader, r: &mut ByteReader<'_>, version: DbnVersion) -> Result<Self> {
        match version {
            DbnVersion::V1 => Ok(ErrorMsg {
                hd,
                err: r.c_str(ERROR_ERR_LEN_V1, "err")?,
                code: CODE_UNSET,
                is_last: true,
            }),
            DbnVersion::V2 => Ok(ErrorMsg {
                hd,
                err: r.c_str(ERROR_ERR_LEN_V2, "err")?,
                code: r.u8("code")?,
                is_last: r.u8("is_last")? != 0,
            }),
        }
    }

    fn encode(&self, w: &mut ByteWriter, version: DbnVersion) -> Result<()> {
        match version {
            DbnVersion::V1 => w.c_str(&self.err, ERROR_ERR_LEN_V1, "err"),
            DbnVersion::V2 => {
                w.c_str(&self.err, ERROR_ERR_LEN_V2, "err")?;
                w.u8(self.code);
                w.u8(self.is_last as u8);
                Ok(())
            }
        }
    }
}

impl SystemMsg {
    fn decode(hd: RecordHeader, r: &mut ByteReader<'_>, version: DbnVersion) -> Result<Self> {
        match version {
            DbnVersion::V1 => Ok(SystemMsg {
                hd,
                msg: r.c_str(SYSTEM_MSG_LEN_V1, "msg")?,
                code: CODE_UNSET,
            }),
            DbnVersion::V2 => Ok(SystemMsg {
                hd,
                msg: r.c_str(SYSTEM_MSG_LEN_V2, "msg")?,
                code: r.u8("code")?,
            }),
        }
    }

    fn encode(&self, w: &mut ByteWriter, version: DbnVersion) -> Result<()> {
        match version {
            DbnVersion::V1 => w.c_str(&self.msg, SYSTEM_MSG_LEN_V1, "msg"),
            DbnVersion::V2 => {
                w.c_str(&self.msg, SYSTEM_MSG_LEN_V2, "msg")?;
                w.u8(self.code);
                Ok(())
            }
        }
    }
}

impl SymbolMappingMsg {
    fn decode(hd: RecordHeader, r: &mut ByteReader<'_>, version: DbnVersion) -> Result<Self> {
        let width = version.symbol_cstr_len();
        match version {
            DbnVersion::V1 => {
                let stype_in_symbol = r.c_str(width, "stype_in_symbol")?;
                let stype_out_symbol = r.c_str(width, "stype_out_symbol")?;
                r.skip(4, "reserved")?;
                Ok(SymbolMappingMsg {
                    hd,
                    stype_in: STYPE_UNSET,
                    stype_in_symbol,
                    stype_out: STYPE_UNSET,
                    stype_out_symbol,
                    start_ts: r.u64("start_ts")?,
                    end_ts: r.u64("end_ts")?,
                })
            }
            DbnVersion::V2 => Ok(SymbolMappingMsg {
                hd,
                stype_in: r.u8("stype_in")?,
                stype_in_symbol: r.c_str(width, "stype_in_symbol")?,
                stype_out: r.u8("stype_out")?,
                stype_out_symbol: r.c_str(width, "stype_out_symbol")?,
                start_ts: r.u64("start_ts")?,
                end_ts: r.u64("end_ts")?,
            }),
        }
    }

    fn encode(&self, w: &mut ByteWriter, version: DbnVersion) -> Result<()> {
        let width = version.symbol_cstr_len();
        match version {
            DbnVersion::V1 => {
                w.c_str(&self.stype_in_symbol, width, "stype_in_symbol")?;
                w.c_str(&self.stype_out_symbol, width, "stype_out_symbol")?;
                w.zeros(4);
            }
            DbnVersion::V2 => {
                w.u8(self.stype_in);
                w.c_str(&self.stype_in_symbol, width, "stype_in_symbol")?;
                w.u8(self.stype_out);
                w.c_str(&self.stype_out_symbol, width, "stype_out_symbol")?;
            }
        }
        w.u64(self.start_ts);
        w.u64(self.end_ts);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::SType;

    const TS: u64 = 1_704_186_000_403_918_695;

    fn v2() -> RecordCodec {
        RecordCodec::new(DbnVersion::V2, false)
    }

    fn hd(codec: &RecordCodec, tag: u8) -> RecordHeader {
        codec.header(tag, 2, 15144, TS).unwrap()
    }

    fn pair(n: i64) -> BidAskPair {
        BidAskPair {
            bid_px: FixedPrice(4_108_250_000_000 - n),
            ask_px: FixedPrice(4_108_500_000_000 + n),
            bid_sz: 10 + n as u32,
            ask_sz: 20 + n as u32,
            bid_ct: 3,
            ask_ct: 4,
        }
    }

    fn consolidated() -> ConsolidatedBidAskPair {
        ConsolidatedBidAskPair {
            bid_px: FixedPrice(187_360_000_000),
            ask_px: FixedPrice(187_370_000_000),
            bid_sz: 300,
            ask_sz: 200,
            bid_pb: 9,
            ask_pb: 40,
        }
    }

    fn instrument_def(codec: &RecordCodec) -> InstrumentDefMsg {
        InstrumentDefMsg {
            hd: hd(codec, rtype::INSTRUMENT_DEF),
            ts_recv: TS + 10,
            min_price_increment: FixedPrice(250_000_000),
            display_factor: FixedPrice(1_000_000_000),
            expiration: 1_710_509_400_000_000_000,
            activation: 1_694_725_200_000_000_000,
            high_limit_price: FixedPrice(4_300_000_000_000),
            low_limit_price: FixedPrice(3_900_000_000_000),
            max_price_variation: FixedPrice(60_000_000_000),
            trading_reference_price: FixedPrice(4_100_000_000_000),
            unit_of_measure_qty: FixedPrice(50_000_000_000),
            min_price_increment_amount: FixedPrice(12_500_000_000),
            price_ratio: FixedPrice::UNDEF,
            strike_price: FixedPrice(-5),
            inst_attrib_value: 4,
            underlying_id: 0,
            raw_instrument_id: 15144,
            market_depth_implied: 2,
            market_depth: 10,
            market_segment_id: 64,
            max_trade_vol: 3000,
            min_lot_size: 1,
            min_lot_size_block: 2,
            min_lot_size_round_lot: 3,
            min_trade_vol: 1,
            contract_multiplier: 50,
            decay_quantity: -1,
            original_contract_size: 7,
            trading_reference_date: 19723,
            appl_id: -3,
            maturity_year: 2024,
            decay_start_date: 0,
            channel_id: 11,
            currency: "USD".to_string(),
            settl_currency: "USD".to_string(),
            secsubtype: "".to_string(),
            raw_symbol: "ESH4".to_string(),
            group: "ES".to_string(),
            exchange: "XCME".to_string(),
            asset: "ES".to_string(),
            cfi: "FFIXSX".to_string(),
            security_type: "FUT".to_string(),
            unit_of_measure: "IPNT".to_string(),
            underlying: "".to_string(),
            strike_price_currency: "".to_string(),
            instrument_class: b'F',
            match_algorithm: b'F',
            md_security_trading_status: 17,
            main_fraction: 1,
            price_display_format: 2,
            settl_price_type: 3,
            sub_fraction: 4,
            underlying_product: 5,
            security_update_action: b'A',
            maturity_month: 3,
            maturity_day: 15,
            maturity_week: 0,
            user_defined_instrument: b'N',
            contract_multiplier_unit: 1,
            flow_schedule_type: -2,
            tick_rule: 6,
        }
    }

    fn all_variants(codec: &RecordCodec) -> Vec<Record> {
        vec![
            Record::Mbo(MboMsg {
                hd: hd(codec, rtype::MBO),
                order_id: 6_470_215_846_215_416_823,
                price: FixedPrice(4_108_500_000_000),
                size: 7,
                flags: 130,
                channel_id: 1,
                action: b'A',
                side: b'B',
                ts_recv: TS + 1,
                ts_in_delta: -22,
                sequence: 1_170_352,
            }),
            Record::Trade(TradeMsg {
                hd: hd(codec, rtype::MBP_0),
                price: FixedPrice(-1),
                size: 2,
                action: b'T',
                side: b'A',
                flags: 0,
                depth: 0,
                ts_recv: TS + 2,
                ts_in_delta: 18_000,
                sequence: u32::MAX,
            }),
            Record::Mbp1(Mbp1Msg {
                hd: hd(codec, rtype::MBP_1),
                price: FixedPrice(4_108_250_000_000),
                size: 1,
                action: b'C',
                side: b'N',
                flags: 128,
                depth: 0,
                ts_recv: TS + 3,
                ts_in_delta: 9,
                sequence: 5,
                levels: [pair(0)],
            }),
            Record::Mbp10(Box::new(Mbp10Msg {
                hd: hd(codec, rtype::MBP_10),
                price: FixedPrice(4_108_250_000_000),
                size: 9,
                action: b'M',
                side: b'A',
                flags: 0,
                depth: 9,
                ts_recv: TS + 4,
                ts_in_delta: 1,
                sequence: 6,
                levels: std::array::from_fn(|i| pair(i as i64)),
            })),
            Record::Bbo(BboMsg {
                hd: hd(codec, rtype::BBO_1S),
                price: FixedPrice::UNDEF,
                size: 0,
                side: b'N',
                flags: 0,
                ts_recv: TS + 5,
                sequence: 77,
                levels: [pair(1)],
            }),
            Record::Cmbp1(Cmbp1Msg {
                hd: hd(codec, rtype::TCBBO),
                price: FixedPrice(187_365_000_000),
                size: 100,
                action: b'T',
                side: b'B',
                flags: 0,
                ts_recv: TS + 6,
                ts_in_delta: 3,
                levels: [consolidated()],
            }),
            Record::Cbbo(CbboMsg {
                hd: hd(codec, rtype::CBBO_1M),
                price: FixedPrice(187_365_000_000),
                size: 100,
                side: b'A',
                flags: 0,
                ts_recv: TS + 7,
                levels: [consolidated()],
            }),
            Record::Ohlcv(OhlcvMsg {
                hd: hd(codec, rtype::OHLCV_1D),
                open: FixedPrice(372_025_000_000_000),
                high: FixedPrice(372_050_000_000_000),
                low: FixedPrice(i64::MIN),
                close: FixedPrice(i64::MAX - 1),
                volume: u64::MAX,
            }),
            Record::Status(StatusMsg {
                hd: hd(codec, rtype::STATUS),
                ts_recv: TS + 8,
                action: 7,
                reason: 1,
                trading_event: 0,
                is_trading: b'Y',
                is_quoting: b'Y',
                is_short_sell_restricted: b'~',
            }),
            Record::InstrumentDef(Box::new(instrument_def(codec))),
            Record::Imbalance(ImbalanceMsg {
                hd: hd(codec, rtype::IMBALANCE),
                ts_recv: TS + 9,
                ref_price: FixedPrice(229_430_000_000),
                auction_time: 0,
                cont_book_clr_price: FixedPrice(1),
                auct_interest_clr_price: FixedPrice(2),
                ssr_filling_price: FixedPrice(3),
                ind_match_price: FixedPrice(4),
                upper_collar: FixedPrice(5),
                lower_collar: FixedPrice(6),
                paired_qty: 1000,
                total_imbalance_qty: 200,
                market_imbalance_qty: 30,
                unpaired_qty: 4,
                auction_type: b'O',
                side: b'B',
                auction_status: 1,
                freeze_status: 2,
                num_extensions: 3,
                unpaired_side: b'N',
                significant_imbalance: b'~',
            }),
            Record::Statistics(StatMsg {
                hd: hd(codec, rtype::STATISTICS),
                ts_recv: TS + 11,
                ts_ref: TS,
                price: FixedPrice(4_100_000_000_000),
                quantity: i32::MAX,
                sequence: 12,
                ts_in_delta: 0,
                stat_type: 3,
                channel_id: 2,
                update_action: 1,
                stat_flags: 0,
            }),
            Record::Error(ErrorMsg {
                hd: hd(codec, rtype::ERROR),
                err: "Unknown symbol: FOO".to_string(),
                code: if codec.version() == DbnVersion::V1 { CODE_UNSET } else { 3 },
                is_last: true,
            }),
            Record::System(SystemMsg {
                hd: hd(codec, rtype::SYSTEM),
                msg: "Heartbeat".to_string(),
                code: if codec.version() == DbnVersion::V1 { CODE_UNSET } else { 0 },
            }),
            Record::SymbolMapping(SymbolMappingMsg {
                hd: hd(codec, rtype::SYMBOL_MAPPING),
                stype_in: if codec.version() == DbnVersion::V1 {
                    STYPE_UNSET
                } else {
                    SType::RawSymbol as u8
                },
                stype_in_symbol: "ESH4".to_string(),
                stype_out: if codec.version() == DbnVersion::V1 {
                    STYPE_UNSET
                } else {
                    SType::InstrumentId as u8
                },
                stype_out_symbol: "15144".to_string(),
                start_ts: TS,
                end_ts: UNDEF_TIMESTAMP,
            }),
        ]
    }

    #[test]
    fn every_variant_round_trips_in_both_versions() {
        for version in [DbnVersion::V1, DbnVersion::V2] {
            let codec = RecordCodec::new(version, false);
            for record in all_variants(&codec) {
                let bytes = codec.encode(&record).unwrap();
                assert_eq!(bytes.len(), record.header().record_size(), "{:?}", record);
                assert_eq!(Some(bytes.len()), codec.expected_size(record.rtype()));
                assert_eq!(codec.decode(&bytes).unwrap(), record);
                assert_eq!(codec.encode(&codec.decode(&bytes).unwrap()).unwrap(), bytes);
            }
        }
    }

    #[test]
    fn every_variant_reads_back_from_its_json() {
        for version in [DbnVersion::V1, DbnVersion::V2] {
            let codec = RecordCodec::new(version, false);
            for record in all_variants(&codec) {
                let line = serde_json::to_string(&record).unwrap();
                assert_eq!(codec.decode_json(&line).unwrap(), record, "{}", line);
            }
        }
    }

    #[test]
    fn version_dependent_sizes() {
        let v1 = RecordCodec::new(DbnVersion::V1, false);
        assert_eq!(v1.expected_size(rtype::INSTRUMENT_DEF), Some(360));
        assert_eq!(v2().expected_size(rtype::INSTRUMENT_DEF), Some(400));
        assert_eq!(v1.expected_size(rtype::SYMBOL_MAPPING), Some(80));
        assert_eq!(v2().expected_size(rtype::SYMBOL_MAPPING), Some(176));
        assert_eq!(v2().expected_size(rtype::SYSTEM), Some(320));
        assert_eq!(v2().expected_size(0x7F), None);
    }

    #[test]
    fn v1_instrument_def_places_strike_price_late() {
        let codec = RecordCodec::new(DbnVersion::V1, false);
        let def = instrument_def(&codec);
        let bytes = codec
            .encode(&Record::InstrumentDef(Box::new(def)))
            .unwrap();
        let strike = i64::from_le_bytes(bytes[328..336].try_into().unwrap());
        assert_eq!(strike, -5);
        assert_eq!(&bytes[200..204], b"ESH4");
    }

    #[test]
    fn ts_out_is_appended_and_readable() {
        let codec = RecordCodec::new(DbnVersion::V2, true);
        let record = Record::Ohlcv(OhlcvMsg {
            hd: codec.header(rtype::OHLCV_1S, 1, 5482, TS).unwrap(),
            open: FixedPrice(1),
            high: FixedPrice(2),
            low: FixedPrice(0),
            close: FixedPrice(1),
            volume: 3,
        });
        assert_eq!(record.header().record_size(), 64);
        let bytes = codec.encode_with_ts_out(&record, TS + 99).unwrap();
        assert_eq!(bytes.len(), 64);
        assert_eq!(codec.ts_out(&bytes), Some(TS + 99));
        assert_eq!(codec.decode(&bytes).unwrap(), record);
        assert!(v2().encode_with_ts_out(&record, 0).is_err());
    }

    #[test]
    fn unknown_rtype_keeps_bytes() {
        let mut frame = vec![0u8; 24];
        frame[0] = 6;
        frame[1] = 0xEE;
        frame[2] = 1;
        frame[16..].copy_from_slice(b"payload!");
        let record = v2().decode(&frame).unwrap();
        match &record {
            Record::Unrecognized { header, bytes } => {
                assert_eq!(header.rtype, 0xEE);
                assert_eq!(header.publisher_id, 1);
                assert_eq!(bytes, &frame);
            }
            other => panic!("expected Unrecognized, got {:?}", other),
        }
        assert!(record.is_unrecognized());
        assert_eq!(v2().encode(&record).unwrap(), frame);
    }

    #[test]
    fn mismatched_length_is_framing_error() {
        let codec = v2();
        let record = Record::Ohlcv(OhlcvMsg {
            hd: hd(&codec, rtype::OHLCV_1S),
            open: FixedPrice(1),
            high: FixedPrice(1),
            low: FixedPrice(1),
            close: FixedPrice(1),
            volume: 1,
        });
        let mut bytes = codec.encode(&record).unwrap();
        // claim 60 bytes instead of 56 and supply them
        bytes[0] = 15;
        bytes.extend_from_slice(&[0; 4]);
        let err = codec.decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            DbnError::RecordLength {
                rtype: rtype::OHLCV_1S,
                expected: 56,
                got: 60
            }
        ));
        assert_eq!(err.class(), crate::error::ErrorClass::Framing);

        let mut bad = record.clone();
        if let Record::Ohlcv(msg) = &mut bad {
            msg.hd.length = 13;
        }
        assert!(matches!(
            codec.encode(&bad),
            Err(DbnError::RecordLength { .. })
        ));
    }

    #[test]
    fn header_shorter_than_itself_is_rejected() {
        let mut frame = [0u8; 16];
        frame[0] = 3;
        assert!(matches!(
            RecordCodec::decode_header(&frame),
            Err(DbnError::RecordTooShort { length: 3 })
        ));
        assert!(matches!(
            RecordCodec::decode_header(&frame[..10]),
            Err(DbnError::Truncated { .. })
        ));
    }

    #[test]
    fn variant_must_match_rtype() {
        let codec = v2();
        let mut header = hd(&codec, rtype::MBO);
        header.length = 14;
        let record = Record::Ohlcv(OhlcvMsg {
            hd: header,
            open: FixedPrice(1),
            high: FixedPrice(1),
            low: FixedPrice(1),
            close: FixedPrice(1),
            volume: 1,
        });
        assert!(matches!(
            codec.encode(&record),
            Err(DbnError::UnknownValue { field: "rtype", .. })
        ));
    }

    #[test]
    fn typed_accessors() {
        let codec = v2();
        let records = all_variants(&codec);
        assert_eq!(records[0].side(), Some(crate::enums::Side::Bid));
        assert_eq!(records[0].action(), Some(crate::enums::Action::Add));
        assert_eq!(records[7].side(), None);
        if let Record::System(msg) = &records[13] {
            assert!(msg.is_heartbeat());
        }
    }
}
