// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsed cpu/memory quantities.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

// A decimal number with an optional single-letter unit suffix.
#[allow(clippy::expect_used)]
static QUANTITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)([A-Za-z]?)$").expect("constant regex pattern is valid")
});

/// Error parsing a quantity string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid quantity {0:?}")]
pub struct QuantityError(pub String);

/// A resource amount such as `"2"`, `"0.5"` or `"4G"`.
///
/// Quantities round-trip through serde as their canonical string and keep
/// the numeric value available for comparisons.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    value: f64,
    suffix: Option<char>,
}

impl Quantity {
    /// Numeric part of the quantity.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Unit suffix, if any.
    pub fn suffix(&self) -> Option<char> {
        self.suffix
    }

    /// True for the zero default.
    pub fn is_zero(&self) -> bool {
        self.value == 0.0
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity {
            value: 0.0,
            suffix: None,
        }
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = QUANTITY_PATTERN
            .captures(s)
            .ok_or_else(|| QuantityError(s.to_string()))?;
        let value = caps[1]
            .parse::<f64>()
            .map_err(|_| QuantityError(s.to_string()))?;
        let suffix = caps[2].chars().next();
        Ok(Quantity { value, suffix })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)?;
        if let Some(suffix) = self.suffix {
            write!(f, "{suffix}")?;
        }
        Ok(())
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        if text.is_empty() {
            return Ok(Quantity::default());
        }
        text.parse().map_err(serde::de::Error::custom)
    }
}
