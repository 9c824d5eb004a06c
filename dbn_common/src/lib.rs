//!
//! DBN binary market-data codec shared by the file tools and the live client.
//!
//! This crate aggregates:
//! - `error` — unified error type `DbnError` and its `ErrorClass` taxonomy.
//! - `result` — handy `Result<T, DbnError>` alias.
//! - `enums` — schemas, symbologies, record type tags and character codes.
//! - `price` — fixed-point prices at 1e-9 scale.
//! - `timestamp` — nanosecond timestamp and `YYYYMMDD` conversions.
//! - `primitives` — little-endian readers and writers for fixed layouts.
//! - `metadata` — the version-keyed metadata frame.
//! - `record` — record types and the record codec.
//! - `scanner` — forward-only stream scanner over any byte source.
//! - `json_scanner` — the same over DBN JSON lines.
//! - `compressed` — plain and zstd file sources and sinks.
//! - `symbol_map` — historical and point-in-time symbol resolution.
//! - `net` — live gateway addressing.
#![warn(missing_docs)]
pub mod error;
pub mod result;
pub mod enums;
pub mod price;
pub mod timestamp;
pub mod primitives;
pub mod metadata;
pub mod record;
pub mod scanner;
pub mod json_scanner;
pub mod compressed;
pub mod symbol_map;
pub mod net;

pub use error::{DbnError, ErrorClass};
pub use result::Result;
pub use enums::{SType, Schema};
pub use price::FixedPrice;
pub use metadata::{DbnVersion, Metadata, MetadataCodec};
pub use record::{Record, RecordCodec, RecordHeader};
pub use scanner::DbnScanner;
pub use json_scanner::JsonScanner;
pub use symbol_map::{PitSymbolMap, TsSymbolMap};
