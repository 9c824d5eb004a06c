//! Instrument ID to symbol resolution.
//!
//! `TsSymbolMap` answers "what was instrument X called on day D" for
//! historical data and is built from the mappings in `Metadata`.
//! `PitSymbolMap` holds the current name of each instrument and is kept up to
//! date from live `SymbolMappingMsg` records.
use std::collections::HashMap;

use chrono::{Days, NaiveDate};

use crate::error::DbnError;
use crate::metadata::Metadata;
use crate::record::{Record, SymbolMappingMsg};
use crate::result::Result;
use crate::timestamp::{date_to_ymd, ts_to_ymd, ymd_to_date};

fn parse_instrument_id(value: &str) -> Result<u32> {
    value
        .parse()
        .map_err(|_| DbnError::SymbolMap(format!("'{}' is not an instrument ID", value)))
}

fn parse_ymd(ymd: u32) -> Result<NaiveDate> {
    ymd_to_date(ymd).ok_or_else(|| DbnError::SymbolMap(format!("invalid date {}", ymd)))
}

/// Symbol map keyed by date and instrument ID.
#[derive(Debug, Clone, Default)]
pub struct TsSymbolMap {
    map: HashMap<(u32, u32), String>,
}

impl TsSymbolMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map built from the symbol mappings of `metadata`.
    pub fn from_metadata(metadata: &Metadata) -> Result<Self> {
        let mut map = Self::new();
        map.fill_from_metadata(metadata)?;
        Ok(map)
    }

    /// Returns `true` if there are no mappings.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of (date, instrument) entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Symbol of `instrument_id` on `date`.
    pub fn get(&self, date: NaiveDate, instrument_id: u32) -> Option<&str> {
        self.map
            .get(&(date_to_ymd(date), instrument_id))
            .map(String::as_str)
    }

    /// Symbol of `instrument_id` on the UTC date of the nanosecond timestamp `ts`.
    pub fn get_for_ts(&self, ts: u64, instrument_id: u32) -> Option<&str> {
        self.map
            .get(&(ts_to_ymd(ts), instrument_id))
            .map(String::as_str)
    }

    /// Symbol for a record, resolved by its instrument ID and `ts_event`.
    pub fn get_for_record(&self, record: &Record) -> Option<&str> {
        let header = record.header();
        self.get_for_ts(header.ts_event, header.instrument_id)
    }

    /// Maps `instrument_id` to `symbol` for every date in `[start_date, end_date)`.
    pub fn insert(
        &mut self,
        instrument_id: u32,
        start_date: u32,
        end_date: u32,
        symbol: &str,
    ) -> Result<()> {
        let start = parse_ymd(start_date)?;
        let end = parse_ymd(end_date)?;
        if start > end {
            return Err(DbnError::SymbolMap(format!(
                "start date {} is after end date {}",
                start_date, end_date
            )));
        }
        let mut day = start;
        while day < end {
            self.map
                .insert((date_to_ymd(day), instrument_id), symbol.to_string());
            day = day
                .checked_add_days(Days::new(1))
                .ok_or_else(|| DbnError::SymbolMap(format!("date overflow after {}", day)))?;
        }
        Ok(())
    }

    /// Replaces the contents with the mappings of `metadata`.
    ///
    /// Intervals with an empty symbol are skipped.
    pub fn fill_from_metadata(&mut self, metadata: &Metadata) -> Result<()> {
        self.map.clear();
        let inverse = metadata.is_inverse_mapping()?;
        for mapping in &metadata.mappings {
            for interval in &mapping.intervals {
                if interval.symbol.is_empty() {
                    continue;
                }
                if inverse {
                    let id = parse_instrument_id(&mapping.raw_symbol)?;
                    self.insert(id, interval.start_date, interval.end_date, &interval.symbol)?;
                } else {
                    let id = parse_instrument_id(&interval.symbol)?;
                    self.insert(
                        id,
                        interval.start_date,
                        interval.end_date,
                        &mapping.raw_symbol,
                    )?;
                }
            }
        }
        Ok(())
    }
}

/// Point-in-time symbol map.
#[derive(Debug, Clone, Default)]
pub struct PitSymbolMap {
    by_id: HashMap<u32, String>,
    by_symbol: HashMap<String, u32>,
}

impl PitSymbolMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if there are no mappings.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Number of instruments mapped.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Current symbol of `instrument_id`.
    pub fn get(&self, instrument_id: u32) -> Option<&str> {
        self.by_id.get(&instrument_id).map(String::as_str)
    }

    /// Instrument currently named `symbol`.
    pub fn instrument_id(&self, symbol: &str) -> Option<u32> {
        self.by_symbol.get(symbol).copied()
    }

    /// Applies a live symbol mapping: the header's instrument now resolves to
    /// the output symbol.
    pub fn on_symbol_mapping(&mut self, msg: &SymbolMappingMsg) {
        self.set(msg.hd.instrument_id, msg.stype_out_symbol.clone());
    }

    /// Applies `record` if it is a symbol mapping. Returns whether it was.
    pub fn on_record(&mut self, record: &Record) -> bool {
        match record {
            Record::SymbolMapping(msg) => {
                self.on_symbol_mapping(msg);
                true
            }
            _ => false,
        }
    }

    /// Replaces the contents with the mappings of `metadata` in effect at the
    /// nanosecond timestamp `ts`, which must lie in the query range.
    pub fn fill_from_metadata(&mut self, metadata: &Metadata, ts: u64) -> Result<()> {
        let inverse = metadata.is_inverse_mapping()?;
        if ts < metadata.start || metadata.end().is_some_and(|end| ts >= end) {
            return Err(DbnError::SymbolMap(format!(
                "timestamp {} is outside the query range",
                ts
            )));
        }
        let ymd = ts_to_ymd(ts);
        self.by_id.clear();
        self.by_symbol.clear();
        for mapping in &metadata.mappings {
            for interval in &mapping.intervals {
                if ymd < interval.start_date || ymd >= interval.end_date {
                    continue;
                }
                if interval.symbol.is_empty() {
                    continue;
                }
                if inverse {
                    let id = parse_instrument_id(&mapping.raw_symbol)?;
                    self.set(id, interval.symbol.clone());
                } else {
                    let id = parse_instrument_id(&interval.symbol)?;
                    self.set(id, mapping.raw_symbol.clone());
                }
            }
        }
        Ok(())
    }

    fn set(&mut self, instrument_id: u32, symbol: String) {
        if let Some(old) = self.by_id.insert(instrument_id, symbol.clone()) {
            if self.by_symbol.get(&old) == Some(&instrument_id) {
                self.by_symbol.remove(&old);
            }
        }
        self.by_symbol.insert(symbol, instrument_id);
    }
}
