//! # card-charge
//!
//! A fluent client for charging a payment card through a processor's REST API.
//!
//! Billing and card details are collected with chainable setters on a
//! [`PaymentGateway`](client::PaymentGateway). A single `charge` call then
//! validates everything, sends one request to the processor, and records the
//! outcome. The caller gets back a plain `bool`; the transaction id or the
//! list of errors stays on the gateway until the next charge.
//!
//! ## Features
//!
//! - **Stripe**: `POST /v1/charges` with a secret key
//! - **Authorize.Net**: `createTransactionRequest` with an API login and transaction key
//! - **Exact amounts**: `0.00` strings become integer minor units, never floats
//! - **Pre-flight validation**: missing fields, Luhn, expiry and CVV checks before any network call
//! - **Bounded calls**: one request per charge, capped by a configurable timeout
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use card_charge::client::PaymentGateway;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut gw = PaymentGateway::stripe("sk_test_lBzwJ4lQzQvEPZwgl3s59Mal")?;
//! gw.set_first_name("Bob")
//!     .set_last_name("Smith")
//!     .set_address1("123 Test Street")
//!     .set_address2("Suite #4")
//!     .set_city("Morristown")
//!     .set_province("TN")
//!     .set_postal("37814")
//!     .set_country("US")
//!     .set_card_number("4007000000027")
//!     .set_expiration_date("10", "2030")
//!     .set_cvv("123");
//!
//! if gw.charge("49.99", "USD").await {
//!     println!("Charge successful! Transaction ID: {}", gw.transaction_id().unwrap_or_default());
//! } else {
//!     for err in gw.errors() {
//!         println!("Charge failed: {}", err);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error codes
//!
//! | code                    | meaning                                              | retry? |
//! |-------------------------|------------------------------------------------------|--------|
//! | `invalid_request`       | input rejected before any network call               | after fixing input |
//! | processor code          | decline or card problem reported by the processor    | no |
//! | `authentication_failed` | processor refused the configured credentials         | no |
//! | `gateway_unavailable`   | timeout, connection failure, 5xx, unreadable reply   | yes, by the caller |

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod errors;
pub mod processors;
pub mod types;
pub mod utils;
pub mod validation;

// Re-export commonly used items
pub use client::{Credentials, GatewayConfig, PaymentGateway, DEFAULT_TIMEOUT};
pub use errors::{GatewayError, Result};
pub use processors::{Processor, ProcessorReply};
pub use types::{
    Amount, CardholderProfile, ChargeError, ChargeOutcome, ChargeRequest, Secret,
    AUTHENTICATION_FAILED, CARD_DECLINED, GATEWAY_UNAVAILABLE, INVALID_REQUEST,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(INVALID_REQUEST, "invalid_request");
        assert_eq!(GATEWAY_UNAVAILABLE, "gateway_unavailable");
    }

    #[test]
    fn test_module_accessibility() {
        // Ensure all modules are accessible
        let _ = GatewayConfig::stripe("sk_test_key");
        let _ = GatewayConfig::authorize_net("login", "key");
        let _ = ChargeError::invalid_request("x");
        let _ = utils::SUPPORTED_CURRENCIES;
    }
}
