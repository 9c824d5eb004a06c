//! Fixed-point prices.
//!
//! Every price-bearing field in a DBN record is an `i64` where one unit is
//! 1e-9 of the quote currency. `FixedPrice` keeps the raw integer so exact
//! comparisons stay exact, and offers a scaled `f64` view for display and
//! analytics. JSON input may carry a price as a number, a raw integer string
//! or a decimal string such as `"372025.000000000"`.
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DbnError;

/// Number of raw units in one whole currency unit.
pub const FIXED_PRICE_SCALE: i64 = 1_000_000_000;

/// Sentinel for a price that is not set.
pub const UNDEF_PRICE: i64 = i64::MAX;

/// A price scaled by 1e9.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FixedPrice(pub i64);

impl FixedPrice {
    /// The undefined price sentinel.
    pub const UNDEF: FixedPrice = FixedPrice(UNDEF_PRICE);

    /// Raw integer value in units of 1e-9.
    pub fn raw(self) -> i64 {
        self.0
    }

    /// Scaled value. Lossy for magnitudes beyond 2^53 raw units.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / FIXED_PRICE_SCALE as f64
    }

    /// Returns `true` if this is the `UNDEF_PRICE` sentinel.
    pub fn is_undefined(self) -> bool {
        self.0 == UNDEF_PRICE
    }
}

impl From<i64> for FixedPrice {
    fn from(raw: i64) -> Self {
        FixedPrice(raw)
    }
}

impl From<FixedPrice> for i64 {
    fn from(price: FixedPrice) -> Self {
        price.0
    }
}

impl fmt::Display for FixedPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_undefined() {
            return f.write_str("UNDEF_PRICE");
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = FIXED_PRICE_SCALE as u64;
        write!(f, "{}{}.{:09}", sign, abs / scale, abs % scale)
    }
}

impl FromStr for FixedPrice {
    type Err = DbnError;

    /// Parses a raw integer (`"372025000000000"`) or a decimal with at most
    /// nine fractional digits (`"372025.0"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DbnError::InvalidPrice(s.to_string());
        let Some((whole, frac)) = s.split_once('.') else {
            return s.parse::<i64>().map(FixedPrice).map_err(|_| invalid());
        };
        let (negative, whole) = match whole.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, whole),
        };
        if frac.len() > 9
            || (whole.is_empty() && frac.is_empty())
            || !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let digits = |part: &str| -> Result<i128, DbnError> {
            if part.is_empty() {
                return Ok(0);
            }
            part.parse().map_err(|_| invalid())
        };
        let frac_units = digits(frac)? * 10i128.pow(9 - frac.len() as u32);
        let whole = digits(whole)?;
        let magnitude = whole * FIXED_PRICE_SCALE as i128 + frac_units;
        let raw = if negative { -magnitude } else { magnitude };
        i64::try_from(raw).map(FixedPrice).map_err(|_| invalid())
    }
}

struct FixedPriceVisitor;

impl Visitor<'_> for FixedPriceVisitor {
    type Value = FixedPrice;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a fixed-point price as an integer or a string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<FixedPrice, E> {
        Ok(FixedPrice(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<FixedPrice, E> {
        i64::try_from(v)
            .map(FixedPrice)
            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<FixedPrice, E> {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for FixedPrice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FixedPriceVisitor)
    }
}

/// Converts a raw fixed-point integer to `f64`.
pub fn fixed_to_f64(raw: i64) -> f64 {
    FixedPrice(raw).to_f64()
}
