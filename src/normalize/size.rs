//! Memory-size parsing.
//!
//! Sizes are either raw byte counts or strings such as `"1000"`, `"1234b"`,
//! `"123k"`, `"44m"` or `"2g"`. Suffixes are binary multiples and the whole
//! computation stays in checked integer arithmetic.

use crate::normalize::{NormalizeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

const KIB: i64 = 1024;
const MIB: i64 = 1024 * KIB;
const GIB: i64 = 1024 * MIB;

/// A user-supplied size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SizeSpec {
    /// Already a byte count
    Bytes(i64),
    /// Numeric string, optionally suffixed with `b`, `k`, `m` or `g`
    Text(String),
}

impl From<i64> for SizeSpec {
    fn from(value: i64) -> Self {
        SizeSpec::Bytes(value)
    }
}

impl From<&str> for SizeSpec {
    fn from(value: &str) -> Self {
        SizeSpec::Text(value.to_string())
    }
}

impl From<String> for SizeSpec {
    fn from(value: String) -> Self {
        SizeSpec::Text(value)
    }
}

impl fmt::Display for SizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeSpec::Bytes(bytes) => write!(f, "{}", bytes),
            SizeSpec::Text(text) => write!(f, "{}", text),
        }
    }
}

impl SizeSpec {
    /// Resolve to a byte count.
    pub fn to_bytes(&self) -> Result<i64> {
        parse_size(self)
    }
}

/// Parse a size into an exact byte count.
///
/// # Errors
///
/// Returns [`NormalizeError::InvalidSize`] for negative integers, empty or
/// non-numeric strings, unknown suffixes and values that overflow `i64`.
pub fn parse_size(spec: &SizeSpec) -> Result<i64> {
    match spec {
        SizeSpec::Bytes(bytes) if *bytes < 0 => Err(NormalizeError::InvalidSize(format!(
            "size must not be negative: {}",
            bytes
        ))),
        SizeSpec::Bytes(bytes) => Ok(*bytes),
        SizeSpec::Text(text) => parse_size_str(text),
    }
}

fn parse_size_str(text: &str) -> Result<i64> {
    let last = text
        .chars()
        .last()
        .ok_or_else(|| NormalizeError::InvalidSize("empty size string".to_string()))?;

    let (digits, multiplier) = if last.is_ascii_digit() {
        (text, 1)
    } else {
        let multiplier = match last.to_ascii_lowercase() {
            'b' => 1,
            'k' => KIB,
            'm' => MIB,
            'g' => GIB,
            _ => {
                return Err(NormalizeError::InvalidSize(format!(
                    "unknown size suffix '{}' in {:?}",
                    last, text
                )));
            }
        };
        (&text[..text.len() - last.len_utf8()], multiplier)
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(NormalizeError::InvalidSize(format!(
            "expected an integer with optional b/k/m/g suffix, got {:?}",
            text
        )));
    }

    digits
        .parse::<i64>()
        .ok()
        .and_then(|value| value.checked_mul(multiplier))
        .ok_or_else(|| NormalizeError::InvalidSize(format!("size out of range: {:?}", text)))
}
