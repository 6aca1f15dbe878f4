use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// A parsed resource amount, kept internally as milli-units so that both
/// decimal suffixes (`m` = 1/1000) and binary-SI byte suffixes (`Ki`,
/// `Mi`, `Gi`, `Ti`) round-trip exactly for the magnitudes this crate
/// cares about (bytes, inode counts).
///
/// The empty string parses to zero, matching the operator-facing
/// threshold syntax accepted by the eviction manager's config parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(i128);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QuantityParseError {
    #[error("empty numeric component in quantity {0:?}")]
    EmptyNumber(String),
    #[error("invalid numeric component in quantity {0:?}")]
    InvalidNumber(String),
    #[error("unknown suffix {1:?} in quantity {0:?}")]
    UnknownSuffix(String, String),
}

const MILLI: i128 = 1000;

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    pub fn from_milli(milli: i128) -> Self {
        Quantity(milli)
    }

    pub fn milli_value(&self) -> i128 {
        self.0
    }

    /// Truncate to a non-negative integer in the quantity's base unit
    /// (bytes for byte-valued signals, whole items for inode/count
    /// signals).
    pub fn as_u64(&self) -> u64 {
        (self.0 / MILLI).max(0) as u64
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / MILLI as f64
    }

    pub fn saturating_sub(&self, other: Quantity) -> Quantity {
        Quantity((self.0 - other.0).max(0))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn parse(s: &str) -> Result<Quantity, QuantityParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Quantity::ZERO);
        }

        let split_at = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
            .unwrap_or(s.len());
        let (number, suffix) = s.split_at(split_at);

        if number.is_empty() {
            return Err(QuantityParseError::EmptyNumber(s.to_string()));
        }
        let value: f64 = number
            .parse()
            .map_err(|_| QuantityParseError::InvalidNumber(s.to_string()))?;

        let multiplier: f64 = match suffix {
            "" => 1.0,
            "m" => 1.0 / 1000.0,
            "k" | "K" => 1_000.0,
            "M" => 1_000_000.0,
            "G" => 1_000_000_000.0,
            "T" => 1_000_000_000_000.0,
            "Ki" => 1024.0,
            "Mi" => 1024.0 * 1024.0,
            "Gi" => 1024.0 * 1024.0 * 1024.0,
            "Ti" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
            other => {
                return Err(QuantityParseError::UnknownSuffix(
                    s.to_string(),
                    other.to_string(),
                ))
            }
        };

        let milli = (value * multiplier * MILLI as f64).round() as i128;
        Ok(Quantity(milli))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity::ZERO
    }
}

impl From<u64> for Quantity {
    fn from(bytes: u64) -> Self {
        Quantity(i128::from(bytes) * MILLI)
    }
}

impl FromStr for Quantity {
    type Err = QuantityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quantity::parse(s)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % MILLI == 0 {
            write!(f, "{}", self.0 / MILLI)
        } else {
            write!(f, "{:.3}", self.as_f64())
        }
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Quantity::parse(&raw).map_err(de::Error::custom)
    }
}
