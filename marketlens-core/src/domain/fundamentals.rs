//! Company attributes: profile fields and headline metrics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::format::format_compact_currency;

/// A scalar attribute value as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Number(v) => write!(f, "{v}"),
            AttributeValue::Text(s) => f.write_str(s),
        }
    }
}

/// Profile fields shown for a company: (attribute key, display label).
pub const PROFILE_FIELDS: &[(&str, &str)] = &[
    ("longName", "Name"),
    ("industry", "Industry"),
    ("sector", "Sector"),
    ("country", "Country"),
    ("exchange", "Exchange"),
    ("fullTimeEmployees", "Employees"),
    ("website", "Website"),
    ("city", "City"),
    ("state", "State"),
];

/// Headline financial metrics: (attribute key, display label).
pub const KEY_METRICS: &[(&str, &str)] = &[
    ("marketCap", "Market Cap"),
    ("totalAssets", "Total Assets"),
    ("totalDebt", "Total Debt"),
    ("trailingPE", "P/E Ratio"),
    ("priceToBook", "P/B Ratio"),
    ("debtToEquity", "Debt/Equity"),
    ("returnOnEquity", "ROE"),
    ("returnOnAssets", "ROA"),
    ("dividendYield", "Dividend Yield"),
    ("beta", "Beta"),
];

/// Named scalar attributes for one ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyAttributes {
    values: BTreeMap<String, AttributeValue>,
}

impl CompanyAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.values.get(key)
    }

    /// Numeric attribute. Non-finite numbers count as absent.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.values.get(key)? {
            AttributeValue::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            AttributeValue::Text(s) => Some(s.as_str()),
            AttributeValue::Number(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Last traded price, if the provider reports one.
    pub fn current_price(&self) -> Option<f64> {
        self.number("currentPrice")
            .or_else(|| self.number("regularMarketPrice"))
            .filter(|p| *p > 0.0)
    }

    pub fn fifty_two_week_high(&self) -> Option<f64> {
        self.number("fiftyTwoWeekHigh")
    }

    pub fn fifty_two_week_low(&self) -> Option<f64> {
        self.number("fiftyTwoWeekLow")
    }

    pub fn business_summary(&self) -> Option<&str> {
        self.text("longBusinessSummary")
            .filter(|s| !s.is_empty() && *s != "N/A")
    }

    /// Profile fields as display strings ("N/A" when absent).
    pub fn profile(&self) -> Vec<(&'static str, String)> {
        PROFILE_FIELDS
            .iter()
            .map(|(key, label)| {
                let value = match self.values.get(*key) {
                    Some(AttributeValue::Number(v)) if *key == "fullTimeEmployees" => {
                        format_thousands(*v as i64)
                    }
                    Some(v) => v.to_string(),
                    None => "N/A".to_string(),
                };
                (*label, value)
            })
            .collect()
    }

    /// Key metrics as display strings. Numbers use compact currency formatting.
    pub fn key_metrics(&self) -> Vec<(&'static str, String)> {
        KEY_METRICS
            .iter()
            .map(|(key, label)| {
                let value = match self.values.get(*key) {
                    Some(AttributeValue::Number(v)) => format_compact_currency(*v),
                    Some(AttributeValue::Text(s)) => s.clone(),
                    None => "N/A".to_string(),
                };
                (*label, value)
            })
            .collect()
    }
}

fn format_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 {
        out.insert(0, '-');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CompanyAttributes {
        let mut attrs = CompanyAttributes::new();
        attrs.insert("longName", AttributeValue::Text("Apple Inc.".into()));
        attrs.insert("fullTimeEmployees", AttributeValue::Number(161_000.0));
        attrs.insert("marketCap", AttributeValue::Number(3.2e12));
        attrs.insert("beta", AttributeValue::Number(1.24));
        attrs.insert("currentPrice", AttributeValue::Number(189.5));
        attrs.insert("fiftyTwoWeekHigh", AttributeValue::Number(199.62));
        attrs.insert("fiftyTwoWeekLow", AttributeValue::Number(164.08));
        attrs
    }

    #[test]
    fn typed_accessors() {
        let attrs = sample();
        assert_eq!(attrs.number("beta"), Some(1.24));
        assert_eq!(attrs.text("longName"), Some("Apple Inc."));
        assert_eq!(attrs.text("beta"), None);
        assert_eq!(attrs.current_price(), Some(189.5));
        assert_eq!(attrs.fifty_two_week_high(), Some(199.62));
        assert_eq!(attrs.fifty_two_week_low(), Some(164.08));
        assert_eq!(CompanyAttributes::new().fifty_two_week_high(), None);
    }

    #[test]
    fn profile_formats_employees_and_fills_gaps() {
        let profile = sample().profile();
        assert!(profile.contains(&("Employees", "161,000".to_string())));
        assert!(profile.contains(&("Sector", "N/A".to_string())));
    }

    #[test]
    fn key_metrics_use_compact_currency() {
        let metrics = sample().key_metrics();
        assert!(metrics.contains(&("Market Cap", "$3200.00B".to_string())));
        assert!(metrics.contains(&("Beta", "$1.24".to_string())));
        assert!(metrics.contains(&("ROE", "N/A".to_string())));
    }

    #[test]
    fn thousands_separator() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1_234_567), "1,234,567");
        assert_eq!(format_thousands(-4_500), "-4,500");
    }
}
