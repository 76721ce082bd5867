//! OHLCV field contract: the boundary between raw provider tables and
//! everything downstream.
//!
//! Defines the five fields a canonical table carries and how a raw column label
//! is matched against them. Providers disagree on casing and spacing, so
//! matching is done on a folded form of the label.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the five fields of a canonical OHLCV table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OhlcvField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

/// The canonical fields, in canonical column order.
pub const OHLCV_FIELDS: [OhlcvField; 5] = [
    OhlcvField::Open,
    OhlcvField::High,
    OhlcvField::Low,
    OhlcvField::Close,
    OhlcvField::Volume,
];

impl OhlcvField {
    /// Canonical column label ("Open", "High", ...).
    pub fn label(self) -> &'static str {
        match self {
            OhlcvField::Open => "Open",
            OhlcvField::High => "High",
            OhlcvField::Low => "Low",
            OhlcvField::Close => "Close",
            OhlcvField::Volume => "Volume",
        }
    }

    /// Match a raw column label against the canonical fields.
    ///
    /// Case and non-alphanumeric characters are ignored, so `" close "` and
    /// `"CLOSE"` both map to `Close`. `"Adj Close"` folds to `adjclose` and
    /// matches nothing.
    pub fn from_label(label: &str) -> Option<Self> {
        match fold_label(label).as_str() {
            "open" => Some(OhlcvField::Open),
            "high" => Some(OhlcvField::High),
            "low" => Some(OhlcvField::Low),
            "close" => Some(OhlcvField::Close),
            "volume" => Some(OhlcvField::Volume),
            _ => None,
        }
    }
}

impl fmt::Display for OhlcvField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn fold_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Result of checking a set of column labels against the field contract.
#[derive(Debug, Clone)]
pub struct FieldCoverage {
    pub missing: Vec<OhlcvField>,
}

impl FieldCoverage {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Report which canonical fields have no matching label.
pub fn field_coverage<'a, I>(labels: I) -> FieldCoverage
where
    I: IntoIterator<Item = &'a str>,
{
    let present: Vec<OhlcvField> = labels
        .into_iter()
        .filter_map(OhlcvField::from_label)
        .collect();
    FieldCoverage {
        missing: OHLCV_FIELDS
            .iter()
            .copied()
            .filter(|f| !present.contains(f))
            .collect(),
    }
}
