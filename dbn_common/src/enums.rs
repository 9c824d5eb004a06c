//! Enumerations carried in metadata frames, record bodies and control messages.
//!
//! Wire values follow the DBN encoding. Text forms (used on the live control
//! channel, by the CLI and in JSON output) follow the vendor spellings such as
//! `ohlcv-1s` and `raw_symbol`.
use clap::ValueEnum;
use serde::Serialize;
use strum_macros::{Display, EnumString, IntoStaticStr};

/// Data record schema.
///
/// `Schema` values are stored as `u16` in metadata; `u16::MAX` means the
/// stream mixes schemas and is decoded to `None`.
#[allow(missing_docs)]
#[derive(
    Debug, Clone, Copy, Serialize, Display, EnumString, IntoStaticStr, Hash, Eq, PartialEq,
)]
#[serde(into = "&'static str")]
#[strum(ascii_case_insensitive)]
#[repr(u16)]
pub enum Schema {
    #[strum(serialize = "mbo")]
    Mbo = 0,
    #[strum(serialize = "mbp-1")]
    Mbp1 = 1,
    #[strum(serialize = "mbp-10")]
    Mbp10 = 2,
    #[strum(serialize = "tbbo")]
    Tbbo = 3,
    #[strum(serialize = "trades")]
    Trades = 4,
    #[strum(serialize = "ohlcv-1s")]
    Ohlcv1S = 5,
    #[strum(serialize = "ohlcv-1m")]
    Ohlcv1M = 6,
    #[strum(serialize = "ohlcv-1h")]
    Ohlcv1H = 7,
    #[strum(serialize = "ohlcv-1d")]
    Ohlcv1D = 8,
    #[strum(serialize = "definition")]
    Definition = 9,
    #[strum(serialize = "statistics")]
    Statistics = 10,
    #[strum(serialize = "status")]
    Status = 11,
    #[strum(serialize = "imbalance")]
    Imbalance = 12,
    #[strum(serialize = "ohlcv-eod")]
    OhlcvEod = 13,
    #[strum(serialize = "cmbp-1")]
    Cmbp1 = 14,
    #[strum(serialize = "cbbo-1s")]
    Cbbo1S = 15,
    #[strum(serialize = "cbbo-1m")]
    Cbbo1M = 16,
    #[strum(serialize = "tcbbo")]
    Tcbbo = 17,
    #[strum(serialize = "bbo-1s")]
    Bbo1S = 18,
    #[strum(serialize = "bbo-1m")]
    Bbo1M = 19,
}

/// Wire value of a metadata frame whose records mix several schemas.
pub const SCHEMA_MIXED: u16 = u16::MAX;

impl TryFrom<u16> for Schema {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Schema::Mbo,
            1 => Schema::Mbp1,
            2 => Schema::Mbp10,
            3 => Schema::Tbbo,
            4 => Schema::Trades,
            5 => Schema::Ohlcv1S,
            6 => Schema::Ohlcv1M,
            7 => Schema::Ohlcv1H,
            8 => Schema::Ohlcv1D,
            9 => Schema::Definition,
            10 => Schema::Statistics,
            11 => Schema::Status,
            12 => Schema::Imbalance,
            13 => Schema::OhlcvEod,
            14 => Schema::Cmbp1,
            15 => Schema::Cbbo1S,
            16 => Schema::Cbbo1M,
            17 => Schema::Tcbbo,
            18 => Schema::Bbo1S,
            19 => Schema::Bbo1M,
            other => return Err(other),
        })
    }
}

impl Schema {
    /// Record type tag used by records of this schema.
    pub fn rtype(self) -> u8 {
        match self {
            Schema::Mbo => rtype::MBO,
            Schema::Mbp1 | Schema::Tbbo => rtype::MBP_1,
            Schema::Mbp10 => rtype::MBP_10,
            Schema::Trades => rtype::MBP_0,
            Schema::Ohlcv1S => rtype::OHLCV_1S,
            Schema::Ohlcv1M => rtype::OHLCV_1M,
            Schema::Ohlcv1H => rtype::OHLCV_1H,
            Schema::Ohlcv1D => rtype::OHLCV_1D,
            Schema::OhlcvEod => rtype::OHLCV_EOD,
            Schema::Definition => rtype::INSTRUMENT_DEF,
            Schema::Statistics => rtype::STATISTICS,
            Schema::Status => rtype::STATUS,
            Schema::Imbalance => rtype::IMBALANCE,
            Schema::Cmbp1 => rtype::CMBP_1,
            Schema::Cbbo1S => rtype::CBBO_1S,
            Schema::Cbbo1M => rtype::CBBO_1M,
            Schema::Tcbbo => rtype::TCBBO,
            Schema::Bbo1S => rtype::BBO_1S,
            Schema::Bbo1M => rtype::BBO_1M,
        }
    }
}

/// Symbology type used to interpret symbols in requests and mappings.
#[allow(missing_docs)]
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    ValueEnum,
    Display,
    EnumString,
    IntoStaticStr,
    Hash,
    Eq,
    PartialEq,
)]
#[serde(into = "&'static str")]
#[clap(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[repr(u8)]
pub enum SType {
    InstrumentId = 0,
    RawSymbol = 1,
    Smart = 2,
    Continuous = 3,
    Parent = 4,
    Nasdaq = 5,
    Cms = 6,
}

impl TryFrom<u8> for SType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => SType::InstrumentId,
            1 => SType::RawSymbol,
            2 => SType::Smart,
            3 => SType::Continuous,
            4 => SType::Parent,
            5 => SType::Nasdaq,
            6 => SType::Cms,
            other => return Err(other),
        })
    }
}

/// Output encoding negotiated with the live gateway.
#[allow(missing_docs)]
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Serialize,
    ValueEnum,
    Display,
    EnumString,
    IntoStaticStr,
    Hash,
    Eq,
    PartialEq,
)]
#[serde(into = "&'static str")]
#[clap(rename_all = "lower")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Encoding {
    #[default]
    Dbn,
    Csv,
    Json,
}

/// Compression applied to a byte stream.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, ValueEnum, Display, EnumString, Eq, PartialEq)]
#[clap(rename_all = "lower")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Compression {
    #[default]
    None,
    Zstd,
}

/// Side of the book an event refers to.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Serialize, Display, Eq, PartialEq)]
pub enum Side {
    Ask,
    Bid,
    None,
}

impl TryFrom<u8> for Side {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            b'A' => Ok(Side::Ask),
            b'B' => Ok(Side::Bid),
            b'N' => Ok(Side::None),
            other => Err(other),
        }
    }
}

/// Order book event kind.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Serialize, Display, Eq, PartialEq)]
pub enum Action {
    Modify,
    Trade,
    Fill,
    Cancel,
    Add,
    Clear,
    None,
}

impl TryFrom<u8> for Action {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            b'M' => Ok(Action::Modify),
            b'T' => Ok(Action::Trade),
            b'F' => Ok(Action::Fill),
            b'C' => Ok(Action::Cancel),
            b'A' => Ok(Action::Add),
            b'R' => Ok(Action::Clear),
            b'N' => Ok(Action::None),
            other => Err(other),
        }
    }
}

/// Broad class of an instrument definition.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Serialize, Display, Eq, PartialEq)]
pub enum InstrumentClass {
    Bond,
    Call,
    Future,
    Stock,
    MixedSpread,
    Put,
    FutureSpread,
    OptionSpread,
    FxSpot,
}

impl TryFrom<u8> for InstrumentClass {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            b'B' => Ok(InstrumentClass::Bond),
            b'C' => Ok(InstrumentClass::Call),
            b'F' => Ok(InstrumentClass::Future),
            b'K' => Ok(InstrumentClass::Stock),
            b'M' => Ok(InstrumentClass::MixedSpread),
            b'P' => Ok(InstrumentClass::Put),
            b'S' => Ok(InstrumentClass::FutureSpread),
            b'T' => Ok(InstrumentClass::OptionSpread),
            b'X' => Ok(InstrumentClass::FxSpot),
            other => Err(other),
        }
    }
}

/// Kind of value carried by a statistics record.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Serialize, Display, Eq, PartialEq)]
#[repr(u16)]
pub enum StatType {
    OpeningPrice = 1,
    IndicativeOpeningPrice = 2,
    SettlementPrice = 3,
    TradingSessionLowPrice = 4,
    TradingSessionHighPrice = 5,
    ClearedVolume = 6,
    LowestOffer = 7,
    HighestBid = 8,
    OpenInterest = 9,
    FixingPrice = 10,
    ClosePrice = 11,
    NetChange = 12,
    Vwap = 13,
}

impl TryFrom<u16> for StatType {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => StatType::OpeningPrice,
            2 => StatType::IndicativeOpeningPrice,
            3 => StatType::SettlementPrice,
            4 => StatType::TradingSessionLowPrice,
            5 => StatType::TradingSessionHighPrice,
            6 => StatType::ClearedVolume,
            7 => StatType::LowestOffer,
            8 => StatType::HighestBid,
            9 => StatType::OpenInterest,
            10 => StatType::FixingPrice,
            11 => StatType::ClosePrice,
            12 => StatType::NetChange,
            13 => StatType::Vwap,
            other => return Err(other),
        })
    }
}

/// Whether a statistic is new or deletes an earlier one.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Serialize, Display, Eq, PartialEq)]
#[repr(u8)]
pub enum StatUpdateAction {
    New = 1,
    Delete = 2,
}

impl TryFrom<u8> for StatUpdateAction {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(StatUpdateAction::New),
            2 => Ok(StatUpdateAction::Delete),
            other => Err(other),
        }
    }
}

/// Record type tags.
pub mod rtype {
    /// Market-by-price with a book depth of 0 (trades).
    pub const MBP_0: u8 = 0x00;
    /// Market-by-price with a book depth of 1 (also TBBO).
    pub const MBP_1: u8 = 0x01;
    /// Market-by-price with a book depth of 10.
    pub const MBP_10: u8 = 0x0A;
    /// Deprecated OHLCV at an unspecified cadence.
    pub const OHLCV_DEPRECATED: u8 = 0x11;
    /// Exchange status.
    pub const STATUS: u8 = 0x12;
    /// Instrument definition.
    pub const INSTRUMENT_DEF: u8 = 0x13;
    /// Order imbalance.
    pub const IMBALANCE: u8 = 0x14;
    /// Error from the gateway.
    pub const ERROR: u8 = 0x15;
    /// Symbol mapping.
    pub const SYMBOL_MAPPING: u8 = 0x16;
    /// Non-error gateway message, also used for heartbeats.
    pub const SYSTEM: u8 = 0x17;
    /// Publisher statistics.
    pub const STATISTICS: u8 = 0x18;
    /// OHLCV at a 1-second cadence.
    pub const OHLCV_1S: u8 = 0x20;
    /// OHLCV at a 1-minute cadence.
    pub const OHLCV_1M: u8 = 0x21;
    /// OHLCV at an hourly cadence.
    pub const OHLCV_1H: u8 = 0x22;
    /// OHLCV at a daily cadence based on the UTC date.
    pub const OHLCV_1D: u8 = 0x23;
    /// OHLCV at a daily cadence based on the end of the trading session.
    pub const OHLCV_EOD: u8 = 0x24;
    /// Market by order.
    pub const MBO: u8 = 0xA0;
    /// Consolidated market-by-price with a book depth of 1.
    pub const CMBP_1: u8 = 0xB1;
    /// Consolidated BBO at a 1-second interval.
    pub const CBBO_1S: u8 = 0xC0;
    /// Consolidated BBO at a 1-minute interval.
    pub const CBBO_1M: u8 = 0xC1;
    /// Consolidated BBO with trades only.
    pub const TCBBO: u8 = 0xC2;
    /// BBO at a 1-second interval.
    pub const BBO_1S: u8 = 0xC3;
    /// BBO at a 1-minute interval.
    pub const BBO_1M: u8 = 0xC4;
}

/// Bit flags carried in the `flags` field of book records.
pub mod flags {
    /// Last record in the event for this instrument.
    pub const LAST: u8 = 1 << 7;
    /// Top-of-book message, not an individual order.
    pub const TOB: u8 = 1 << 6;
    /// Sourced from a replay, such as a snapshot server.
    pub const SNAPSHOT: u8 = 1 << 5;
    /// Aggregated price level message, not an individual order.
    pub const MBP: u8 = 1 << 4;
    /// `ts_recv` is inaccurate due to clock issues or reordering.
    pub const BAD_TS_RECV: u8 = 1 << 3;
    /// An unrecoverable gap was detected in the channel.
    pub const MAYBE_BAD_BOOK: u8 = 1 << 2;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_text_and_wire_forms() {
        assert_eq!(Schema::Ohlcv1S.to_string(), "ohlcv-1s");
        assert_eq!("mbp-10".parse::<Schema>().ok(), Some(Schema::Mbp10));
        assert_eq!(Schema::try_from(5), Ok(Schema::Ohlcv1S));
        assert_eq!(Schema::try_from(SCHEMA_MIXED), Err(SCHEMA_MIXED));
        assert_eq!(Schema::Tbbo.rtype(), rtype::MBP_1);
    }

    #[test]
    fn stype_spellings() {
        assert_eq!(SType::RawSymbol.to_string(), "raw_symbol");
        assert_eq!("instrument_id".parse::<SType>().ok(), Some(SType::InstrumentId));
        assert_eq!("Raw_Symbol".parse::<SType>().ok(), Some(SType::RawSymbol));
        assert!("isin".parse::<SType>().is_err());
        assert_eq!(SType::try_from(7), Err(7));
    }

    #[test]
    fn side_and_action_from_chars() {
        assert_eq!(Side::try_from(b'B'), Ok(Side::Bid));
        assert_eq!(Action::try_from(b'R'), Ok(Action::Clear));
        assert_eq!(Side::try_from(b'x'), Err(b'x'));
    }
}
