//! Conversions between human-readable prices and token units.
//!
//! Integer-only in both directions; no `f64` anywhere in the pipeline.

use alloy::primitives::U256;

use crate::X402Error;

/// Parse a price string like `"$0.01"` into atomic token units.
///
/// Fractional digits beyond `decimals` are truncated.
pub fn parse_price(price: &str, decimals: u32) -> Result<U256, X402Error> {
    // Strip non-numeric characters (except '.') -- handles "$0.001", "0.01", "$1", etc.
    let cleaned: String = price
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if cleaned.is_empty() {
        return Err(X402Error::InvalidPayment(format!(
            "invalid price '{price}': no numeric content"
        )));
    }

    let (integer_part, fractional_part) = cleaned.split_once('.').unwrap_or((&cleaned, ""));
    if fractional_part.contains('.') {
        return Err(X402Error::InvalidPayment(format!(
            "invalid price '{price}': more than one decimal point"
        )));
    }

    let decimals = decimals as usize;
    let frac = &fractional_part[..fractional_part.len().min(decimals)];
    let digits = format!("{integer_part}{frac:0<decimals$}");

    U256::from_str_radix(&digits, 10)
        .map_err(|e| X402Error::InvalidPayment(format!("invalid price '{price}': {e}")))
}

/// Render atomic token units as a decimal string, e.g. `1000` at 6 decimals -> `"0.001"`.
///
/// Trailing fractional zeros are dropped; whole amounts have no decimal point.
pub fn format_units(amount: U256, decimals: u32) -> String {
    let digits = amount.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = format!("{digits:0>width$}", width = decimals + 1);
    let (integer, fractional) = padded.split_at(padded.len() - decimals);
    let fractional = fractional.trim_end_matches('0');
    if fractional.is_empty() {
        integer.to_string()
    } else {
        format!("{integer}.{fractional}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dollar_price() {
        assert_eq!(parse_price("$0.001", 6).unwrap(), U256::from(1000));
    }

    #[test]
    fn test_parse_numeric_price() {
        assert_eq!(parse_price("0.01", 6).unwrap(), U256::from(10_000));
    }

    #[test]
    fn test_parse_whole_dollar() {
        assert_eq!(parse_price("$1", 6).unwrap(), U256::from(1_000_000));
    }

    #[test]
    fn test_parse_large_amount() {
        assert_eq!(parse_price("$100.50", 6).unwrap(), U256::from(100_500_000));
    }

    #[test]
    fn test_parse_truncates_beyond_decimals() {
        assert_eq!(parse_price("0.0000019", 6).unwrap(), U256::from(1));
    }

    #[test]
    fn test_parse_empty_fails() {
        assert!(parse_price("$", 6).is_err());
    }

    #[test]
    fn test_parse_two_points_fails() {
        assert!(parse_price("1.2.3", 6).is_err());
    }

    #[test]
    fn test_format_mint_fee() {
        assert_eq!(format_units(U256::from(1000), 6), "0.001");
    }

    #[test]
    fn test_format_whole_and_mixed() {
        assert_eq!(format_units(U256::from(2_000_000), 6), "2");
        assert_eq!(format_units(U256::from(1_250_000), 6), "1.25");
        assert_eq!(format_units(U256::ZERO, 6), "0");
    }

    #[test]
    fn test_format_then_parse_preserves_amount() {
        let amount = U256::from(123_456_789u64);
        let s = format_units(amount, 6);
        assert_eq!(s, "123.456789");
        assert_eq!(parse_price(&s, 6).unwrap(), amount);
    }
}
