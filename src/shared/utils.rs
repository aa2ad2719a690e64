//! Small shared helpers

/// Round to two decimal places (prices, trends).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to three decimal places (volatility).
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Strip everything except digits and the decimal point, then parse.
/// Returns None for strings with no usable digits.
pub fn parse_price_text(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(123.456), 123.46);
        assert_eq!(round2(123.454), 123.45);
    }

    #[test]
    fn test_parse_price_text() {
        assert_eq!(parse_price_text("1,299.00"), Some(1299.0));
        assert_eq!(parse_price_text("12 990 ₽"), Some(12990.0));
        assert_eq!(parse_price_text("n/a"), None);
    }
}
