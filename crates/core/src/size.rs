//! Human-readable byte sizes
//!
//! Sizes are rendered in powers of 1024 with two-decimal rounding and the
//! short unit names used throughout the CLI output (`"1.5 KB"`).

const UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Format a byte count as `"<value> <unit>"`.
///
/// Zero is rendered as `"0B"`. Otherwise the largest unit not exceeding the
/// size is chosen and the value keeps at least one decimal digit, so
/// `1024` becomes `"1.0 KB"` and `1536` becomes `"1.5 KB"`.
pub fn format_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "0B".to_string();
    }

    let mut index = 0;
    let mut next_unit: u128 = 1024;
    while index < UNITS.len() - 1 && u128::from(size_bytes) >= next_unit {
        index += 1;
        next_unit *= 1024;
    }

    let value = size_bytes as f64 / 1024f64.powi(index as i32);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", render_decimal(rounded), UNITS[index])
}

/// Two decimals at most, trailing zeros dropped, one decimal at least.
fn render_decimal(value: f64) -> String {
    let fixed = format!("{value:.2}");
    let trimmed = fixed.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{trimmed}0")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_literal() {
        assert_eq!(format_size(0), "0B");
    }

    #[test]
    fn test_exact_units() {
        assert_eq!(format_size(1), "1.0 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5.0 GB");
    }

    #[test]
    fn test_fractional_values() {
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1300), "1.27 KB");
        assert_eq!(format_size(1000), "1000.0 B");
    }

    #[test]
    fn test_rounding_up_stays_in_unit() {
        // 1023.999 KB rounds to 1024.0 but stays in KB
        assert_eq!(format_size(1024 * 1024 - 1), "1024.0 KB");
    }

    #[test]
    fn test_largest_input() {
        assert_eq!(format_size(u64::MAX), "16.0 EB");
    }
}
