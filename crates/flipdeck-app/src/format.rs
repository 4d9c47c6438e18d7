// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

/// Placeholder for any value that is missing or unparseable. Formatting
/// never fails; degraded values always render as this.
pub const MISSING: &str = "—";

/// Parse a metric value out of a source string: trims, drops a leading `$`
/// and thousands separators, and rejects empty or non-finite results.
pub fn parse_metric(value: Option<&str>) -> Option<f64> {
    let raw = value?.trim();
    if raw.is_empty() {
        return None;
    }
    let cleaned = raw.trim_start_matches('$').replace(',', "");
    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
}

pub fn format_currency(value: Option<&str>) -> String {
    match parse_metric(value) {
        Some(amount) => format!("${amount:.2}"),
        None => MISSING.to_owned(),
    }
}

/// ROI arrives either as a fraction (0.38) or a pre-multiplied percentage
/// (38). Values within [-1, 1] are treated as fractions and scaled by 100;
/// anything outside is rendered as-is. The threshold branch is load-bearing:
/// report producers disagree on the scale and both must display the same.
pub fn format_roi(value: Option<&str>) -> String {
    match parse_metric(value) {
        Some(roi) if (-1.0..=1.0).contains(&roi) => format!("{:.1}%", roi * 100.0),
        Some(roi) => format!("{roi:.1}%"),
        None => MISSING.to_owned(),
    }
}

/// Minimal decimal form: no forced decimals, so "12" stays "12" and "3.50"
/// becomes "3.5".
pub fn format_number(value: Option<&str>) -> String {
    match parse_metric(value) {
        Some(count) => format!("{count}"),
        None => MISSING.to_owned(),
    }
}
