//! Core type definitions for card charges.
//!
//! This module contains the cardholder profile accumulated by the gateway,
//! the amount and request snapshot handed to processors, and the outcome
//! recorded after every charge attempt.

use crate::errors::{GatewayError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error code for input rejected before any network call.
pub const INVALID_REQUEST: &str = "invalid_request";

/// Fallback error code for a decline the processor did not classify.
pub const CARD_DECLINED: &str = "card_declined";

/// Error code for credentials the processor refused.
pub const AUTHENTICATION_FAILED: &str = "authentication_failed";

/// Error code for transport failures, timeouts and processor outages.
///
/// This is the only code a caller may reasonably retry on.
pub const GATEWAY_UNAVAILABLE: &str = "gateway_unavailable";

/// A single structured error attached to a failed charge.
///
/// # Examples
///
/// ```
/// use card_charge::types::ChargeError;
///
/// let err = ChargeError::invalid_request("city is required");
/// assert_eq!(err.code, "invalid_request");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChargeError {
    /// Machine-readable code (`invalid_request`, `gateway_unavailable`, or the processor's own)
    pub code: String,

    /// Human-readable description
    pub message: String,
}

impl ChargeError {
    /// Creates an error with an arbitrary code.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates an `invalid_request` error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(INVALID_REQUEST, message)
    }

    /// Creates a `gateway_unavailable` error.
    pub fn gateway_unavailable(message: impl Into<String>) -> Self {
        Self::new(GATEWAY_UNAVAILABLE, message)
    }

    /// Returns true if the caller may retry the charge with a fresh request.
    pub fn is_retryable(&self) -> bool {
        self.code == GATEWAY_UNAVAILABLE
    }
}

impl fmt::Display for ChargeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Result of one `charge` call.
///
/// A transaction id is present exactly when the charge succeeded, and the
/// error list is empty exactly when it succeeded. The constructors are the
/// only way to build one, so both hold for every value.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ChargeOutcome {
    success: bool,
    #[serde(rename = "transactionId", skip_serializing_if = "Option::is_none")]
    transaction_id: Option<String>,
    errors: Vec<ChargeError>,
}

impl ChargeOutcome {
    /// Outcome of an approved charge.
    pub fn succeeded(transaction_id: impl Into<String>) -> Self {
        Self {
            success: true,
            transaction_id: Some(transaction_id.into()),
            errors: Vec::new(),
        }
    }

    /// Outcome of a rejected, declined or undeliverable charge.
    ///
    /// An empty list is replaced by a generic `card_declined` entry so a
    /// failure always carries at least one error.
    pub fn failed(errors: Vec<ChargeError>) -> Self {
        let errors = if errors.is_empty() {
            vec![ChargeError::new(CARD_DECLINED, "charge was not approved")]
        } else {
            errors
        };
        Self {
            success: false,
            transaction_id: None,
            errors,
        }
    }

    /// Whether the charge was approved.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The processor's charge identifier, if approved.
    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    /// Errors in the order they were detected.
    pub fn errors(&self) -> &[ChargeError] {
        &self.errors
    }
}

/// Billing and card details accumulated by a gateway.
///
/// Every field is stored trimmed. Nothing is validated here; see
/// [`crate::validation`].
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CardholderProfile {
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) address1: String,
    pub(crate) address2: Option<String>,
    pub(crate) city: String,
    pub(crate) province: String,
    pub(crate) postal: String,
    pub(crate) country: String,
    pub(crate) card_number: String,
    pub(crate) expiration_month: String,
    pub(crate) expiration_year: String,
    pub(crate) cvv: String,
}

impl CardholderProfile {
    /// First name on card.
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    /// Last name on card.
    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// Billing address, line 1.
    pub fn address1(&self) -> &str {
        &self.address1
    }

    /// Billing address, line 2.
    pub fn address2(&self) -> Option<&str> {
        self.address2.as_deref()
    }

    /// Billing city.
    pub fn city(&self) -> &str {
        &self.city
    }

    /// Billing state or province.
    pub fn province(&self) -> &str {
        &self.province
    }

    /// Billing zip or postal code.
    pub fn postal(&self) -> &str {
        &self.postal
    }

    /// Billing country.
    pub fn country(&self) -> &str {
        &self.country
    }

    /// Card number exactly as set.
    pub fn card_number(&self) -> &str {
        &self.card_number
    }

    /// Expiration month in `MM` format.
    pub fn expiration_month(&self) -> &str {
        &self.expiration_month
    }

    /// Expiration year in `YYYY` format.
    pub fn expiration_year(&self) -> &str {
        &self.expiration_year
    }

    /// Card security code.
    pub fn cvv(&self) -> &str {
        &self.cvv
    }

    /// Last four digits of the card number, for logs.
    pub fn card_last4(&self) -> &str {
        let len = self.card_number.len();
        if len > 4 && self.card_number.is_ascii() {
            &self.card_number[len - 4..]
        } else {
            ""
        }
    }
}

// Card data must never end up in logs through `{:?}`.
impl fmt::Debug for CardholderProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardholderProfile")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("address1", &self.address1)
            .field("address2", &self.address2)
            .field("city", &self.city)
            .field("province", &self.province)
            .field("postal", &self.postal)
            .field("country", &self.country)
            .field("card_last4", &self.card_last4())
            .finish_non_exhaustive()
    }
}

/// A charge amount held as an integer count of minor units.
///
/// Parsed from the `0.00` decimal format without going through binary
/// floating point, so `"49.99"` is always exactly 4999.
///
/// # Examples
///
/// ```
/// use card_charge::types::Amount;
///
/// let amount: Amount = "49.99".parse().unwrap();
/// assert_eq!(amount.minor_units(), 4999);
/// assert_eq!(amount.to_string(), "49.99");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount {
    minor_units: u64,
}

impl Amount {
    /// Creates an amount from minor units (cents for USD).
    pub fn from_minor_units(minor_units: u64) -> Self {
        Self { minor_units }
    }

    /// Amount in minor units.
    pub fn minor_units(&self) -> u64 {
        self.minor_units
    }

    /// Amount as a two-decimal number.
    pub fn as_decimal(&self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.minor_units), 2)
    }
}

impl FromStr for Amount {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        let minor_units = crate::utils::parse_minor_units(s)?;
        Ok(Self { minor_units })
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_decimal())
    }
}

/// Validated snapshot of everything a processor needs for one charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    /// Cardholder details at the moment `charge` was called
    pub profile: CardholderProfile,

    /// Amount to capture
    pub amount: Amount,

    /// Uppercase ISO 4217 code
    pub currency: String,
}

/// A credential that never prints itself.
///
/// # Examples
///
/// ```
/// use card_charge::types::Secret;
///
/// let key = Secret::new("sk_test_123");
/// assert_eq!(format!("{:?}", key), "Secret([REDACTED])");
/// assert_eq!(key.expose(), "sk_test_123");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wraps a credential.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw credential, for building the authenticated request only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_invariants() {
        let ok = ChargeOutcome::succeeded("ch_123");
        assert!(ok.is_success());
        assert_eq!(ok.transaction_id(), Some("ch_123"));
        assert!(ok.errors().is_empty());

        let failed = ChargeOutcome::failed(vec![ChargeError::invalid_request("city is required")]);
        assert!(!failed.is_success());
        assert_eq!(failed.transaction_id(), None);
        assert_eq!(failed.errors().len(), 1);
    }

    #[test]
    fn test_failed_outcome_never_has_empty_errors() {
        let failed = ChargeOutcome::failed(Vec::new());
        assert_eq!(failed.errors()[0].code, CARD_DECLINED);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(ChargeOutcome::succeeded("ch_1")).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["transactionId"], "ch_1");
        assert_eq!(json["errors"].as_array().unwrap().len(), 0);

        let json = serde_json::to_value(ChargeOutcome::failed(vec![
            ChargeError::gateway_unavailable("timed out"),
        ]))
        .unwrap();
        assert!(json.get("transactionId").is_none());
        assert_eq!(json["errors"][0]["code"], "gateway_unavailable");
    }

    #[test]
    fn test_retryable_only_for_transport_errors() {
        assert!(ChargeError::gateway_unavailable("reset").is_retryable());
        assert!(!ChargeError::invalid_request("bad").is_retryable());
        assert!(!ChargeError::new(CARD_DECLINED, "no").is_retryable());
    }

    #[test]
    fn test_amount_display() {
        assert_eq!(Amount::from_minor_units(4999).to_string(), "49.99");
        assert_eq!(Amount::from_minor_units(5).to_string(), "0.05");
        assert_eq!(Amount::from_minor_units(1000).to_string(), "10.00");
    }

    #[test]
    fn test_profile_debug_masks_card() {
        let profile = CardholderProfile {
            card_number: "4007000000027".to_string(),
            cvv: "123".to_string(),
            ..Default::default()
        };
        let debug = format!("{:?}", profile);
        assert!(debug.contains("0027"));
        assert!(!debug.contains("4007000000027"));
        assert!(!debug.contains("123\""));
    }

    #[test]
    fn test_secret_is_redacted() {
        let secret = Secret::new("sk_test_lBzwJ4lQzQvEPZwgl3s59Mal");
        assert!(!format!("{:?}", secret).contains("sk_test"));
        assert!(!secret.to_string().contains("sk_test"));
    }
}
