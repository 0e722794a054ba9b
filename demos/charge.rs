//! Example test charge.
//!
//! Builds a gateway from the environment, fills in a sandbox cardholder and
//! charges 49.99 USD.
//!
//! Run with:
//! ```bash
//! cargo run --example charge
//! ```
//!
//! Environment variables (a `.env` file is loaded if present):
//! - PAYMENT_PROCESSOR: `stripe` (default) or `authorize_net`
//! - STRIPE_SECRET_KEY: Stripe test secret key
//! - AUTHNET_LOGIN_ID / AUTHNET_TRANSACTION_KEY: Authorize.Net sandbox credentials
//! - AUTHNET_ENVIRONMENT: `sandbox` (default) or `production`
//! - PAYMENT_API_BASE: optional API root override
//! - PAYMENT_TIMEOUT_SECS: optional request timeout

use card_charge::client::{GatewayConfig, PaymentGateway};
use chrono::{Datelike, Utc};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = GatewayConfig::from_env()?;
    let mut gw = PaymentGateway::new(config)?;

    println!("Charging through {}", gw.processor_name());

    // Sandbox cards only need an expiry in the future.
    let expiry_year = (Utc::now().year() + 3).to_string();

    gw.set_first_name("Bob")
        .set_last_name("Smith")
        .set_address1("123 Test Street")
        .set_address2("Suite #4")
        .set_city("Morristown")
        .set_province("TN")
        .set_postal("37814")
        .set_country("US")
        .set_card_number("4007000000027")
        .set_expiration_date("10", &expiry_year)
        .set_cvv("123");

    if gw.charge("49.99", "USD").await {
        println!(
            "Charge successful! Transaction ID: {}",
            gw.transaction_id().unwrap_or_default()
        );
    } else {
        println!("Charge failed. Errors:");
        for err in gw.errors() {
            println!("  {}", err);
        }
        if let Some(outcome) = gw.last_outcome() {
            println!("{}", serde_json::to_string_pretty(outcome)?);
        }
    }

    Ok(())
}
