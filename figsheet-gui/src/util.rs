//! Numeric conversion and formatting helpers for figsheet-gui.
//!
//! Conversions between numeric types are explicit about precision loss and
//! bounds.

/// Convert usize to f32 with allowed precision loss.
#[allow(clippy::cast_precision_loss)]
pub fn usize_to_f32(value: usize) -> f32 {
    value as f32
}

/// Convert usize to f64 with allowed precision loss.
#[allow(clippy::cast_precision_loss)]
pub fn usize_to_f64(value: usize) -> f64 {
    value as f64
}

/// Convert u64 to f64 with allowed precision loss.
#[allow(clippy::cast_precision_loss)]
pub fn u64_to_f64(value: u64) -> f64 {
    value as f64
}

/// Parse a user-entered number; blank or non-finite input yields `None`.
#[must_use]
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Format a count with comma separators, e.g. `12,345`.
#[must_use]
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Format an optional fraction for table cells.
#[must_use]
pub fn format_fraction(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.4}"),
        _ => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(12_345_678), "12,345,678");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(42), "42");
    }

    #[test]
    fn test_parse_number_rejects_blank_and_nan() {
        assert_eq!(parse_number(" 12.5 "), Some(12.5));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("abc"), None);
    }

    #[test]
    fn test_format_fraction() {
        assert_eq!(format_fraction(Some(0.25)), "0.2500");
        assert_eq!(format_fraction(Some(f64::NAN)), "-");
        assert_eq!(format_fraction(None), "-");
    }
}
