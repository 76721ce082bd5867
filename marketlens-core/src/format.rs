//! Display helpers shared by the CLI and attribute rendering.

/// Format a dollar amount compactly: `$1.23B`, `$4.56M`, `$7.89K`,
/// `$0.1234` for small non-zero values, otherwise `$12.34`.
pub fn format_compact_currency(value: f64) -> String {
    if !value.is_finite() {
        return "N/A".to_string();
    }
    let abs = value.abs();
    if abs >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("${:.2}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("${:.2}K", value / 1e3)
    } else if abs < 1.0 && value != 0.0 {
        format!("${value:.4}")
    } else {
        format!("${value:.2}")
    }
}

/// Format a percentage with two decimals: `12.34%`.
pub fn format_percent(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2}%")
    } else {
        "N/A".to_string()
    }
}
