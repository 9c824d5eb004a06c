//! Record types.
//!
//! Every record starts with a 16-byte `RecordHeader` followed by a body whose
//! layout is fixed per record type tag. `Record` is the closed set of known
//! layouts plus `Record::Unrecognized`, which keeps the raw bytes of tags this
//! crate does not know so that newer streams still decode.
//!
//! Records are version-agnostic: the few layouts that differ between DBN v1
//! and v2 (instrument definitions, errors, system messages and symbol
//! mappings) decode into the same structs. See `codec` for the wire layouts.
//! The same structs also deserialize from DBN JSON lines, see
//! `RecordCodec::decode_json`.
pub mod codec;
mod json;

use serde::{Deserialize, Serialize};

use crate::enums::{Action, InstrumentClass, Side, StatType, StatUpdateAction, rtype};
use crate::price::FixedPrice;

pub use codec::RecordCodec;

/// Length of `RecordHeader` on the wire.
pub const RECORD_HEADER_LEN: usize = 16;

/// Unset value for `code` fields that only exist in DBN v2.
pub const CODE_UNSET: u8 = u8::MAX;

/// Unset value for the symbology fields of v1 symbol mapping records.
pub const STYPE_UNSET: u8 = u8::MAX;

/// Common header of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordHeader {
    /// Record size in 32-bit words, header included.
    #[serde(default)]
    pub length: u8,
    /// Record type tag.
    pub rtype: u8,
    /// Publisher (venue and dataset) identifier.
    pub publisher_id: u16,
    /// Numeric instrument identifier.
    pub instrument_id: u32,
    /// Matching-engine event timestamp in UNIX nanoseconds.
    #[serde(deserialize_with = "json::u64_or_str")]
    pub ts_event: u64,
}

impl RecordHeader {
    /// Total record size in bytes as declared by `length`.
    pub fn record_size(&self) -> usize {
        self.length as usize * 4
    }
}

/// One price level of a book snapshot.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidAskPair {
    pub bid_px: FixedPrice,
    pub ask_px: FixedPrice,
    pub bid_sz: u32,
    pub ask_sz: u32,
    pub bid_ct: u32,
    pub ask_ct: u32,
}

/// Top of a consolidated book, with the publisher of each side.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedBidAskPair {
    pub bid_px: FixedPrice,
    pub ask_px: FixedPrice,
    pub bid_sz: u32,
    pub ask_sz: u32,
    pub bid_pb: u16,
    pub ask_pb: u16,
}

/// Market-by-order event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MboMsg {
    /// Common header.
    pub hd: RecordHeader,
    /// Venue order ID.
    #[serde(deserialize_with = "json::u64_or_str")]
    pub order_id: u64,
    /// Order price.
    pub price: FixedPrice,
    /// Order quantity.
    pub size: u32,
    /// Bit field, see `enums::flags`.
    pub flags: u8,
    /// Channel ID assigned by the publisher.
    pub channel_id: u8,
    /// Event action.
    #[serde(with = "json::c_char")]
    pub action: u8,
    /// Side of the book.
    #[serde(with = "json::c_char")]
    pub side: u8,
    /// Capture-server receive timestamp.
    #[serde(deserialize_with = "json::u64_or_str")]
    pub ts_recv: u64,
    /// `ts_recv` minus the venue send timestamp.
    pub ts_in_delta: i32,
    /// Venue message sequence number.
    pub sequence: u32,
}

/// Trade or top-of-book event with no book levels (MBP-0, trades schema).
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeMsg {
    pub hd: RecordHeader,
    pub price: FixedPrice,
    pub size: u32,
    #[serde(with = "json::c_char")]
    pub action: u8,
    #[serde(with = "json::c_char")]
    pub side: u8,
    pub flags: u8,
    /// Book level where the update occurred.
    pub depth: u8,
    #[serde(deserialize_with = "json::u64_or_str")]
    pub ts_recv: u64,
    pub ts_in_delta: i32,
    pub sequence: u32,
}

/// Market-by-price event with one book level (MBP-1 and TBBO schemas).
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mbp1Msg {
    pub hd: RecordHeader,
    pub price: FixedPrice,
    pub size: u32,
    #[serde(with = "json::c_char")]
    pub action: u8,
    #[serde(with = "json::c_char")]
    pub side: u8,
    pub flags: u8,
    pub depth: u8,
    #[serde(deserialize_with = "json::u64_or_str")]
    pub ts_recv: u64,
    pub ts_in_delta: i32,
    pub sequence: u32,
    /// Top of book after the event.
    pub levels: [BidAskPair; 1],
}

/// Market-by-price event with ten book levels.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mbp10Msg {
    pub hd: RecordHeader,
    pub price: FixedPrice,
    pub size: u32,
    #[serde(with = "json::c_char")]
    pub action: u8,
    #[serde(with = "json::c_char")]
    pub side: u8,
    pub flags: u8,
    pub depth: u8,
    #[serde(deserialize_with = "json::u64_or_str")]
    pub ts_recv: u64,
    pub ts_in_delta: i32,
    pub sequence: u32,
    /// Ten levels, best first.
    pub levels: [BidAskPair; 10],
}

/// Subsampled best bid and offer (BBO-1s, BBO-1m).
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BboMsg {
    pub hd: RecordHeader,
    /// Price of the last trade.
    pub price: FixedPrice,
    pub size: u32,
    #[serde(with = "json::c_char")]
    pub side: u8,
    pub flags: u8,
    #[serde(deserialize_with = "json::u64_or_str")]
    pub ts_recv: u64,
    pub sequence: u32,
    pub levels: [BidAskPair; 1],
}

/// Consolidated market-by-price with one level (CMBP-1 and TCBBO schemas).
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cmbp1Msg {
    pub hd: RecordHeader,
    pub price: FixedPrice,
    pub size: u32,
    #[serde(with = "json::c_char")]
    pub action: u8,
    #[serde(with = "json::c_char")]
    pub side: u8,
    pub flags: u8,
    #[serde(deserialize_with = "json::u64_or_str")]
    pub ts_recv: u64,
    pub ts_in_delta: i32,
    pub levels: [ConsolidatedBidAskPair; 1],
}

/// Subsampled consolidated best bid and offer (CBBO-1s, CBBO-1m).
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CbboMsg {
    pub hd: RecordHeader,
    pub price: FixedPrice,
    pub size: u32,
    #[serde(with = "json::c_char")]
    pub side: u8,
    pub flags: u8,
    #[serde(deserialize_with = "json::u64_or_str")]
    pub ts_recv: u64,
    pub levels: [ConsolidatedBidAskPair; 1],
}

/// Open, high, low, close and volume bar.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OhlcvMsg {
    pub hd: RecordHeader,
    pub open: FixedPrice,
    pub high: FixedPrice,
    pub low: FixedPrice,
    pub close: FixedPrice,
    #[serde(deserialize_with = "json::u64_or_str")]
    pub volume: u64,
}

/// Trading status change of an instrument.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMsg {
    pub hd: RecordHeader,
    #[serde(deserialize_with = "json::u64_or_str")]
    pub ts_recv: u64,
    pub action: u16,
    pub reason: u16,
    pub trading_event: u16,
    /// `Y`, `N` or `~` when not available.
    #[serde(with = "json::c_char")]
    pub is_trading: u8,
    #[serde(with = "json::c_char")]
    pub is_quoting: u8,
    #[serde(with = "json::c_char")]
    pub is_short_sell_restricted: u8,
}

/// Instrument definition.
///
/// The v1 and v2 layouts carry the same fields in a different order; v1
/// stores `raw_symbol` in 22 bytes, v2 in 71.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentDefMsg {
    pub hd: RecordHeader,
    #[serde(deserialize_with = "json::u64_or_str")]
    pub ts_recv: u64,
    pub min_price_increment: FixedPrice,
    pub display_factor: FixedPrice,
    #[serde(deserialize_with = "json::u64_or_str")]
    pub expiration: u64,
    #[serde(deserialize_with = "json::u64_or_str")]
    pub activation: u64,
    pub high_limit_price: FixedPrice,
    pub low_limit_price: FixedPrice,
    pub max_price_variation: FixedPrice,
    pub trading_reference_price: FixedPrice,
    pub unit_of_measure_qty: FixedPrice,
    pub min_price_increment_amount: FixedPrice,
    pub price_ratio: FixedPrice,
    pub strike_price: FixedPrice,
    pub inst_attrib_value: i32,
    pub underlying_id: u32,
    pub raw_instrument_id: u32,
    pub market_depth_implied: i32,
    pub market_depth: i32,
    pub market_segment_id: u32,
    pub max_trade_vol: u32,
    pub min_lot_size: i32,
    pub min_lot_size_block: i32,
    pub min_lot_size_round_lot: i32,
    pub min_trade_vol: u32,
    pub contract_multiplier: i32,
    pub decay_quantity: i32,
    pub original_contract_size: i32,
    pub trading_reference_date: u16,
    pub appl_id: i16,
    pub maturity_year: u16,
    pub decay_start_date: u16,
    pub channel_id: u16,
    pub currency: String,
    pub settl_currency: String,
    pub secsubtype: String,
    pub raw_symbol: String,
    pub group: String,
    pub exchange: String,
    pub asset: String,
    pub cfi: String,
    pub security_type: String,
    pub unit_of_measure: String,
    pub underlying: String,
    pub strike_price_currency: String,
    #[serde(with = "json::c_char")]
    pub instrument_class: u8,
    #[serde(with = "json::c_char")]
    pub match_algorithm: u8,
    pub md_security_trading_status: u8,
    pub main_fraction: u8,
    pub price_display_format: u8,
    pub settl_price_type: u8,
    pub sub_fraction: u8,
    pub underlying_product: u8,
    #[serde(with = "json::c_char")]
    pub security_update_action: u8,
    pub maturity_month: u8,
    pub maturity_day: u8,
    pub maturity_week: u8,
    #[serde(with = "json::c_char")]
    pub user_defined_instrument: u8,
    pub contract_multiplier_unit: i8,
    pub flow_schedule_type: i8,
    pub tick_rule: u8,
}

/// Auction imbalance.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImbalanceMsg {
    pub hd: RecordHeader,
    #[serde(deserialize_with = "json::u64_or_str")]
    pub ts_recv: u64,
    pub ref_price: FixedPrice,
    #[serde(deserialize_with = "json::u64_or_str")]
    pub auction_time: u64,
    pub cont_book_clr_price: FixedPrice,
    pub auct_interest_clr_price: FixedPrice,
    pub ssr_filling_price: FixedPrice,
    pub ind_match_price: FixedPrice,
    pub upper_collar: FixedPrice,
    pub lower_collar: FixedPrice,
    pub paired_qty: u32,
    pub total_imbalance_qty: u32,
    pub market_imbalance_qty: u32,
    pub unpaired_qty: u32,
    #[serde(with = "json::c_char")]
    pub auction_type: u8,
    #[serde(with = "json::c_char")]
    pub side: u8,
    pub auction_status: u8,
    pub freeze_status: u8,
    pub num_extensions: u8,
    #[serde(with = "json::c_char")]
    pub unpaired_side: u8,
    #[serde(with = "json::c_char")]
    pub significant_imbalance: u8,
}

/// Statistic published by the venue.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatMsg {
    pub hd: RecordHeader,
    #[serde(deserialize_with = "json::u64_or_str")]
    pub ts_recv: u64,
    /// Reference timestamp of the statistic, when the venue provides one.
    #[serde(deserialize_with = "json::u64_or_str")]
    pub ts_ref: u64,
    pub price: FixedPrice,
    pub quantity: i32,
    pub sequence: u32,
    pub ts_in_delta: i32,
    pub stat_type: u16,
    pub channel_id: u16,
    pub update_action: u8,
    pub stat_flags: u8,
}

/// Error reported by the live gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMsg {
    /// Common header.
    pub hd: RecordHeader,
    /// Error text.
    pub err: String,
    /// Error code. `CODE_UNSET` in v1 streams.
    #[serde(default = "json::code_unset")]
    pub code: u8,
    /// Whether this is the last record of a multi-record error. Always set in v1.
    #[serde(default = "json::last_by_default", deserialize_with = "json::bool_or_int")]
    pub is_last: bool,
}

/// Non-error gateway message, including heartbeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemMsg {
    /// Common header.
    pub hd: RecordHeader,
    /// Message text.
    pub msg: String,
    /// Message code. `CODE_UNSET` in v1 streams.
    #[serde(default = "json::code_unset")]
    pub code: u8,
}

impl SystemMsg {
    /// Returns `true` for gateway heartbeats.
    pub fn is_heartbeat(&self) -> bool {
        if self.code == CODE_UNSET {
            self.msg.starts_with("Heartbeat")
        } else {
            self.code == 0
        }
    }
}

/// Live symbol resolution for the instrument in the header.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMappingMsg {
    pub hd: RecordHeader,
    /// Input symbology. `STYPE_UNSET` in v1 streams.
    #[serde(default = "json::stype_unset")]
    pub stype_in: u8,
    pub stype_in_symbol: String,
    /// Output symbology. `STYPE_UNSET` in v1 streams.
    #[serde(default = "json::stype_unset")]
    pub stype_out: u8,
    pub stype_out_symbol: String,
    #[serde(deserialize_with = "json::u64_or_str")]
    pub start_ts: u64,
    #[serde(deserialize_with = "json::u64_or_str")]
    pub end_ts: u64,
}

/// A decoded record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Record {
    /// Market by order.
    Mbo(MboMsg),
    /// Trades (MBP-0).
    Trade(TradeMsg),
    /// MBP-1 and TBBO.
    Mbp1(Mbp1Msg),
    /// MBP-10.
    Mbp10(Box<Mbp10Msg>),
    /// BBO-1s and BBO-1m.
    Bbo(BboMsg),
    /// CMBP-1 and TCBBO.
    Cmbp1(Cmbp1Msg),
    /// CBBO-1s and CBBO-1m.
    Cbbo(CbboMsg),
    /// OHLCV at any cadence.
    Ohlcv(OhlcvMsg),
    /// Trading status.
    Status(StatusMsg),
    /// Instrument definition.
    InstrumentDef(Box<InstrumentDefMsg>),
    /// Auction imbalance.
    Imbalance(ImbalanceMsg),
    /// Venue statistics.
    Statistics(StatMsg),
    /// Gateway error.
    Error(ErrorMsg),
    /// Gateway system message or heartbeat.
    System(SystemMsg),
    /// Live symbol mapping.
    SymbolMapping(SymbolMappingMsg),
    /// Well-framed record with a type tag this crate does not know.
    Unrecognized {
        /// Decoded header.
        header: RecordHeader,
        /// The complete binary frame, header included, or the JSON line
        /// when decoded by `RecordCodec::decode_json`.
        bytes: Vec<u8>,
    },
}

impl Record {
    /// Header common to every variant.
    pub fn header(&self) -> &RecordHeader {
        match self {
            Record::Mbo(r) => &r.hd,
            Record::Trade(r) => &r.hd,
            Record::Mbp1(r) => &r.hd,
            Record::Mbp10(r) => &r.hd,
            Record::Bbo(r) => &r.hd,
            Record::Cmbp1(r) => &r.hd,
            Record::Cbbo(r) => &r.hd,
            Record::Ohlcv(r) => &r.hd,
            Record::Status(r) => &r.hd,
            Record::InstrumentDef(r) => &r.hd,
            Record::Imbalance(r) => &r.hd,
            Record::Statistics(r) => &r.hd,
            Record::Error(r) => &r.hd,
            Record::System(r) => &r.hd,
            Record::SymbolMapping(r) => &r.hd,
            Record::Unrecognized { header, .. } => header,
        }
    }

    /// Record type tag.
    pub fn rtype(&self) -> u8 {
        self.header().rtype
    }

    /// Returns `true` for the catch-all variant.
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Record::Unrecognized { .. })
    }

    /// Side of the book, for variants that carry one.
    pub fn side(&self) -> Option<Side> {
        let raw = match self {
            Record::Mbo(r) => r.side,
            Record::Trade(r) => r.side,
            Record::Mbp1(r) => r.side,
            Record::Mbp10(r) => r.side,
            Record::Bbo(r) => r.side,
            Record::Cmbp1(r) => r.side,
            Record::Cbbo(r) => r.side,
            Record::Imbalance(r) => r.side,
            _ => return None,
        };
        Side::try_from(raw).ok()
    }

    /// Book action, for variants that carry one.
    pub fn action(&self) -> Option<Action> {
        let raw = match self {
            Record::Mbo(r) => r.action,
            Record::Trade(r) => r.action,
            Record::Mbp1(r) => r.action,
            Record::Mbp10(r) => r.action,
            Record::Cmbp1(r) => r.action,
            _ => return None,
        };
        Action::try_from(raw).ok()
    }
}

impl InstrumentDefMsg {
    /// Typed instrument class, when the byte is a known class.
    pub fn class(&self) -> Option<InstrumentClass> {
        InstrumentClass::try_from(self.instrument_class).ok()
    }
}

impl StatMsg {
    /// Typed statistic kind.
    pub fn stat_type(&self) -> Option<StatType> {
        StatType::try_from(self.stat_type).ok()
    }

    /// Typed update action.
    pub fn update_action(&self) -> Option<StatUpdateAction> {
        StatUpdateAction::try_from(self.update_action).ok()
    }
}

/// Human-readable name of a record type tag.
pub fn rtype_name(tag: u8) -> &'static str {
    match tag {
        rtype::MBP_0 => "mbp-0",
        rtype::MBP_1 => "mbp-1",
        rtype::MBP_10 => "mbp-10",
        rtype::OHLCV_DEPRECATED => "ohlcv-deprecated",
        rtype::OHLCV_1S => "ohlcv-1s",
        rtype::OHLCV_1M => "ohlcv-1m",
        rtype::OHLCV_1H => "ohlcv-1h",
        rtype::OHLCV_1D => "ohlcv-1d",
        rtype::OHLCV_EOD => "ohlcv-eod",
        rtype::STATUS => "status",
        rtype::INSTRUMENT_DEF => "instrument-def",
        rtype::IMBALANCE => "imbalance",
        rtype::ERROR => "error",
        rtype::SYMBOL_MAPPING => "symbol-mapping",
        rtype::SYSTEM => "system",
        rtype::STATISTICS => "statistics",
        rtype::MBO => "mbo",
        rtype::CMBP_1 => "cmbp-1",
        rtype::CBBO_1S => "cbbo-1s",
        rtype::CBBO_1M => "cbbo-1m",
        rtype::TCBBO => "tcbbo",
        rtype::BBO_1S => "bbo-1s",
        rtype::BBO_1M => "bbo-1m",
        _ => "unknown",
    }
}
