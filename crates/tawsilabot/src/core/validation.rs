//! Order-input validation utilities
//!
//! Pure predicates over the two free-form wizard fields that have a
//! format: the customer phone number and the order amount.

use once_cell::sync::Lazy;
use regex::Regex;

/// Cached regex for the accepted national mobile pattern:
/// `05/06/07` followed by 8 digits, or the `+213` international form.
static PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0[5-7]\d{8}|\+213[5-7]\d{8})$").expect("Failed to compile phone regex"));

/// Validates a customer phone number.
///
/// Leading/trailing whitespace is ignored; the digits themselves must
/// match the national mobile pattern exactly.
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_REGEX.is_match(phone.trim())
}

/// Parses an order amount.
///
/// Whitespace anywhere in the input is stripped (people type `12 500`),
/// then the remainder must parse as a finite number strictly greater
/// than zero.
///
/// # Returns
/// * `Some(amount)` for a valid amount
/// * `None` for anything else
pub fn parse_amount(input: &str) -> Option<f64> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== is_valid_phone Tests ====================

    #[test]
    fn test_valid_phones() {
        let valid = vec![
            "0591234567",
            "0612345678",
            "0712345678",
            "+213512345678",
            "+213712345678",
            "  0612345678  ", // surrounding whitespace trimmed
        ];

        for phone in valid {
            assert!(is_valid_phone(phone), "Should accept: {}", phone);
        }
    }

    #[test]
    fn test_invalid_phones() {
        let invalid = vec![
            "notaphone",
            "",
            "061234567",    // too short
            "06123456789",  // too long
            "0812345678",   // 08 is not a mobile prefix
            "213612345678", // missing +
            "+21361234567", // too short after prefix
            "06 12 34 56 78", // inner whitespace is not tolerated
        ];

        for phone in invalid {
            assert!(!is_valid_phone(phone), "Should reject: {}", phone);
        }
    }

    // ==================== parse_amount Tests ====================

    #[test]
    fn test_valid_amounts() {
        assert_eq!(parse_amount("2500"), Some(2500.0));
        assert_eq!(parse_amount("12 500"), Some(12500.0));
        assert_eq!(parse_amount(" 99.5 "), Some(99.5));
        assert_eq!(parse_amount("0.5"), Some(0.5));
    }

    #[test]
    fn test_invalid_amounts() {
        let invalid = vec!["", "   ", "abc", "12a", "-500", "0", "0.0", "NaN", "inf"];

        for amount in invalid {
            assert_eq!(parse_amount(amount), None, "Should reject: {:?}", amount);
        }
    }
}
