//! Utility functions for charge handling.
//!
//! Amount parsing, card-number checks and currency normalization used by
//! validation and the processors.

use crate::errors::{GatewayError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+\.[0-9]{2}$").expect("valid regex"));

/// Currencies accepted by `charge`. All of them use two minor-unit digits.
pub const SUPPORTED_CURRENCIES: &[&str] = &["USD", "CAD", "EUR", "GBP", "AUD", "NZD", "CHF", "MXN"];

/// Parses a `0.00` amount into minor units without floating point.
///
/// # Arguments
///
/// * `amount` - Decimal string with exactly two fractional digits
///
/// # Examples
///
/// ```
/// use card_charge::utils::parse_minor_units;
///
/// assert_eq!(parse_minor_units("49.99").unwrap(), 4999);
/// assert!(parse_minor_units("49.9").is_err());
/// assert!(parse_minor_units("0.00").is_err());
/// ```
pub fn parse_minor_units(amount: &str) -> Result<u64> {
    if !AMOUNT_RE.is_match(amount) {
        return Err(GatewayError::InvalidAmount(format!(
            "'{}' is not in 0.00 format",
            amount
        )));
    }

    let decimal = Decimal::from_str(amount)
        .map_err(|e| GatewayError::InvalidAmount(format!("'{}': {}", amount, e)))?;

    // The regex pins the scale to 2, so the mantissa is the minor-unit count.
    let minor_units = u64::try_from(decimal.mantissa())
        .map_err(|_| GatewayError::InvalidAmount(format!("'{}' is out of range", amount)))?;

    if minor_units == 0 {
        return Err(GatewayError::InvalidAmount(
            "amount must be greater than zero".to_string(),
        ));
    }

    Ok(minor_units)
}

/// Runs the Luhn checksum over a string of ASCII digits.
///
/// Returns false for empty input or any non-digit character.
///
/// # Examples
///
/// ```
/// use card_charge::utils::luhn_valid;
///
/// assert!(luhn_valid("4007000000027"));
/// assert!(!luhn_valid("4007000000028"));
/// ```
pub fn luhn_valid(number: &str) -> bool {
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let sum: u32 = number
        .bytes()
        .rev()
        .map(|b| u32::from(b - b'0'))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

/// Returns true if `value` is non-empty and made only of ASCII digits.
pub fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Uppercases a currency code and checks it against the allow-list.
///
/// # Examples
///
/// ```
/// use card_charge::utils::normalize_currency;
///
/// assert_eq!(normalize_currency(" usd ").unwrap(), "USD");
/// assert!(normalize_currency("XYZ").is_none());
/// ```
pub fn normalize_currency(currency: &str) -> Option<String> {
    let code = currency.trim().to_ascii_uppercase();
    SUPPORTED_CURRENCIES
        .iter()
        .any(|c| *c == code)
        .then_some(code)
}
