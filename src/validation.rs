//! Pre-flight checks run by `charge` before anything goes on the wire.
//!
//! Every violated rule produces its own `invalid_request` error so the caller
//! can fix all of them at once.

use crate::types::{Amount, CardholderProfile, ChargeError, ChargeRequest};
use crate::utils::{is_digits, luhn_valid, normalize_currency};
use chrono::{Datelike, NaiveDate};

const MIN_CARD_DIGITS: usize = 12;
const MAX_CARD_DIGITS: usize = 19;

/// Validates a profile, amount and currency as of `today`.
///
/// # Arguments
///
/// * `profile` - Cardholder fields accumulated so far
/// * `amount` - Raw `0.00` amount string
/// * `currency` - ISO 4217 code in any case
/// * `today` - Calendar date used for the expiration check
///
/// # Returns
///
/// The request snapshot to send, or every violation found.
pub fn validate_charge(
    profile: &CardholderProfile,
    amount: &str,
    currency: &str,
    today: NaiveDate,
) -> Result<ChargeRequest, Vec<ChargeError>> {
    let mut errors = Vec::new();

    let parsed_amount = match amount.trim().parse::<Amount>() {
        Ok(a) => Some(a),
        Err(e) => {
            errors.push(ChargeError::invalid_request(e.to_string()));
            None
        }
    };

    let normalized_currency = normalize_currency(currency);
    if normalized_currency.is_none() {
        errors.push(ChargeError::invalid_request(format!(
            "currency '{}' is not supported",
            currency.trim()
        )));
    }

    errors.extend(validate_profile(profile, today));

    match (parsed_amount, normalized_currency) {
        (Some(amount), Some(currency)) if errors.is_empty() => Ok(ChargeRequest {
            profile: profile.clone(),
            amount,
            currency,
        }),
        _ => Err(errors),
    }
}

/// Checks required fields and card data. Returns an empty list when valid.
pub fn validate_profile(profile: &CardholderProfile, today: NaiveDate) -> Vec<ChargeError> {
    let mut errors = Vec::new();

    let required = [
        ("first name", &profile.first_name),
        ("last name", &profile.last_name),
        ("address line 1", &profile.address1),
        ("city", &profile.city),
        ("province", &profile.province),
        ("postal code", &profile.postal),
        ("country", &profile.country),
    ];
    for (field, value) in required {
        if value.is_empty() {
            errors.push(ChargeError::invalid_request(format!("{} is required", field)));
        }
    }

    errors.extend(validate_card_number(&profile.card_number));
    errors.extend(validate_expiration(
        &profile.expiration_month,
        &profile.expiration_year,
        today,
    ));
    errors.extend(validate_cvv(&profile.cvv));

    errors
}

fn validate_card_number(number: &str) -> Option<ChargeError> {
    if number.is_empty() {
        return Some(ChargeError::invalid_request("card number is required"));
    }
    if !is_digits(number) {
        return Some(ChargeError::invalid_request(
            "card number must contain digits only",
        ));
    }
    if !(MIN_CARD_DIGITS..=MAX_CARD_DIGITS).contains(&number.len()) {
        return Some(ChargeError::invalid_request(format!(
            "card number must be {} to {} digits",
            MIN_CARD_DIGITS, MAX_CARD_DIGITS
        )));
    }
    if !luhn_valid(number) {
        return Some(ChargeError::invalid_request(
            "card number failed checksum",
        ));
    }
    None
}

fn validate_expiration(month: &str, year: &str, today: NaiveDate) -> Vec<ChargeError> {
    let mut errors = Vec::new();

    let month_num = match month {
        "" => {
            errors.push(ChargeError::invalid_request("expiration month is required"));
            None
        }
        m if m.len() == 2 && is_digits(m) => match m.parse::<u32>() {
            Ok(n) if (1..=12).contains(&n) => Some(n),
            _ => {
                errors.push(ChargeError::invalid_request(
                    "expiration month must be between 01 and 12",
                ));
                None
            }
        },
        _ => {
            errors.push(ChargeError::invalid_request(
                "expiration month must be in MM format",
            ));
            None
        }
    };

    let year_num = match year {
        "" => {
            errors.push(ChargeError::invalid_request("expiration year is required"));
            None
        }
        y if y.len() == 4 && is_digits(y) => y.parse::<i32>().ok(),
        _ => {
            errors.push(ChargeError::invalid_request(
                "expiration year must be in YYYY format",
            ));
            None
        }
    };

    // A card stays valid through the last day of its expiration month.
    if let (Some(month), Some(year)) = (month_num, year_num) {
        if (year, month) < (today.year(), today.month()) {
            errors.push(ChargeError::invalid_request("card has expired"));
        }
    }

    errors
}

fn validate_cvv(cvv: &str) -> Option<ChargeError> {
    if cvv.is_empty() {
        Some(ChargeError::invalid_request("cvv is required"))
    } else if !is_digits(cvv) || !(3..=4).contains(&cvv.len()) {
        Some(ChargeError::invalid_request("cvv must be 3 or 4 digits"))
    } else {
        None
    }
}
