//! The charge gateway: fluent cardholder setters plus a single `charge` call.
//!
//! A [`PaymentGateway`] owns one [`CardholderProfile`] and the outcome of its
//! latest charge. Setters never fail; everything is checked when `charge`
//! runs, and every failure mode ends up in the recorded [`ChargeOutcome`].

use crate::errors::{GatewayError, Result};
use crate::processors::authorize_net::{
    AuthorizeNet, AUTHORIZE_NET_PRODUCTION_BASE, AUTHORIZE_NET_SANDBOX_BASE,
};
use crate::processors::stripe::{Stripe, STRIPE_API_BASE};
use crate::processors::{Processor, ProcessorReply};
use crate::types::{CardholderProfile, ChargeError, ChargeOutcome, Secret};
use crate::validation::validate_charge;
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Timeout applied to the processor call unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Currency used by [`PaymentGateway::charge_usd`].
pub const DEFAULT_CURRENCY: &str = "USD";

/// Credentials for one of the supported processors.
#[derive(Clone, Debug)]
pub enum Credentials {
    /// Stripe secret (or restricted) key
    Stripe {
        /// `sk_...` or `rk_...`
        secret_key: Secret,
    },

    /// Authorize.Net API login
    AuthorizeNet {
        /// API login id
        login_id: String,
        /// API transaction key
        transaction_key: Secret,
    },
}

/// Configuration for a [`PaymentGateway`].
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Processor credentials
    pub credentials: Credentials,

    /// API root override (e.g. a sandbox or a local stub); processor default when `None`
    pub api_base: Option<String>,

    /// Upper bound on one processor call
    pub timeout: Duration,
}

impl GatewayConfig {
    /// Creates a Stripe configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use card_charge::client::GatewayConfig;
    /// use std::time::Duration;
    ///
    /// let config = GatewayConfig::stripe("sk_test_lBzwJ4lQzQvEPZwgl3s59Mal")
    ///     .with_timeout(Duration::from_secs(10));
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn stripe(secret_key: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::Stripe {
                secret_key: Secret::new(secret_key),
            },
            api_base: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Creates an Authorize.Net configuration (sandbox unless `api_base` is set).
    pub fn authorize_net(login_id: impl Into<String>, transaction_key: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::AuthorizeNet {
                login_id: login_id.into(),
                transaction_key: Secret::new(transaction_key),
            },
            api_base: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the processor's API root.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Sets the processor call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// * `PAYMENT_PROCESSOR` - `stripe` (default) or `authorize_net`
    /// * `STRIPE_SECRET_KEY`
    /// * `AUTHNET_LOGIN_ID`, `AUTHNET_TRANSACTION_KEY`
    /// * `AUTHNET_ENVIRONMENT` - `sandbox` (default) or `production`
    /// * `PAYMENT_API_BASE` - optional API root override
    /// * `PAYMENT_TIMEOUT_SECS` - optional timeout in seconds
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| GatewayError::ConfigError(format!("{} is not set", key)))
        };

        let processor = lookup("PAYMENT_PROCESSOR").unwrap_or_else(|| "stripe".to_string());
        let mut config = match processor.trim().to_ascii_lowercase().as_str() {
            "stripe" => Self::stripe(require("STRIPE_SECRET_KEY")?),
            "authorize_net" | "authorizenet" => {
                let config = Self::authorize_net(
                    require("AUTHNET_LOGIN_ID")?,
                    require("AUTHNET_TRANSACTION_KEY")?,
                );
                let environment = lookup("AUTHNET_ENVIRONMENT").unwrap_or_default();
                match environment.trim().to_ascii_lowercase().as_str() {
                    "" | "sandbox" => config,
                    "production" => config.with_api_base(AUTHORIZE_NET_PRODUCTION_BASE),
                    other => {
                        return Err(GatewayError::ConfigError(format!(
                            "unknown AUTHNET_ENVIRONMENT '{}'",
                            other
                        )))
                    }
                }
            }
            other => {
                return Err(GatewayError::ConfigError(format!(
                    "unknown PAYMENT_PROCESSOR '{}'",
                    other
                )))
            }
        };

        if let Some(base) = lookup("PAYMENT_API_BASE").filter(|v| !v.trim().is_empty()) {
            config = config.with_api_base(base);
        }

        if let Some(secs) = lookup("PAYMENT_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                GatewayError::ConfigError(format!("PAYMENT_TIMEOUT_SECS '{}' is not a number", secs))
            })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks credentials, base URL and timeout without building a client.
    pub fn validate(&self) -> Result<()> {
        match &self.credentials {
            Credentials::Stripe { secret_key } => {
                let key = secret_key.expose();
                if !(key.starts_with("sk_") || key.starts_with("rk_")) || key.len() <= 3 {
                    return Err(GatewayError::ConfigError(
                        "Stripe secret key must start with sk_ or rk_".to_string(),
                    ));
                }
            }
            Credentials::AuthorizeNet {
                login_id,
                transaction_key,
            } => {
                if login_id.trim().is_empty() {
                    return Err(GatewayError::ConfigError(
                        "Authorize.Net login id is empty".to_string(),
                    ));
                }
                if transaction_key.expose().trim().is_empty() {
                    return Err(GatewayError::ConfigError(
                        "Authorize.Net transaction key is empty".to_string(),
                    ));
                }
            }
        }

        if self.timeout.is_zero() {
            return Err(GatewayError::ConfigError(
                "timeout must be greater than zero".to_string(),
            ));
        }

        self.api_base_url().map(|_| ())
    }

    /// Resolves the API root, always ending in `/` so paths join beneath it.
    fn api_base_url(&self) -> Result<Url> {
        let raw = match (&self.api_base, &self.credentials) {
            (Some(base), _) => base.as_str(),
            (None, Credentials::Stripe { .. }) => STRIPE_API_BASE,
            (None, Credentials::AuthorizeNet { .. }) => AUTHORIZE_NET_SANDBOX_BASE,
        };

        let mut url = Url::parse(raw)
            .map_err(|e| GatewayError::ConfigError(format!("invalid API base '{}': {}", raw, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(GatewayError::ConfigError(format!(
                "API base '{}' must be http or https",
                raw
            )));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}

/// Collects cardholder details and charges them through one processor.
///
/// Setters return `&mut Self` so they chain; `charge` is called last and
/// always snapshots the current field values.
///
/// # Examples
///
/// ```no_run
/// use card_charge::client::PaymentGateway;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut gw = PaymentGateway::stripe("sk_test_lBzwJ4lQzQvEPZwgl3s59Mal")?;
/// gw.set_first_name("Bob")
///     .set_last_name("Smith")
///     .set_address1("123 Test Street")
///     .set_address2("Suite #4")
///     .set_city("Morristown")
///     .set_province("TN")
///     .set_postal("37814")
///     .set_country("US")
///     .set_card_number("4007000000027")
///     .set_expiration_date("10", "2030")
///     .set_cvv("123");
///
/// if gw.charge("49.99", "USD").await {
///     println!("Charge successful! Transaction ID: {}", gw.transaction_id().unwrap_or_default());
/// } else {
///     println!("Charge failed. Errors: {:?}", gw.errors());
/// }
/// # Ok(())
/// # }
/// ```
pub struct PaymentGateway {
    processor: Arc<dyn Processor>,
    timeout: Duration,
    profile: CardholderProfile,
    outcome: Option<ChargeOutcome>,
}

impl PaymentGateway {
    /// Builds a gateway from configuration.
    ///
    /// Fails with [`GatewayError::ConfigError`] on bad credentials or base
    /// URL, so no charge can ever be attempted with them.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        config.validate()?;
        let api_base = config.api_base_url()?;
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::ConfigError(format!("HTTP client: {}", e)))?;

        let processor: Arc<dyn Processor> = match config.credentials {
            Credentials::Stripe { secret_key } => Arc::new(Stripe::new(
                secret_key,
                &api_base,
                http_client,
                config.timeout,
            )?),
            Credentials::AuthorizeNet {
                login_id,
                transaction_key,
            } => Arc::new(AuthorizeNet::new(
                login_id,
                transaction_key,
                &api_base,
                http_client,
                config.timeout,
            )?),
        };

        Ok(Self::with_processor(processor, config.timeout))
    }

    /// Shorthand for a Stripe gateway with default settings.
    pub fn stripe(secret_key: impl Into<String>) -> Result<Self> {
        Self::new(GatewayConfig::stripe(secret_key))
    }

    /// Shorthand for an Authorize.Net sandbox gateway with default settings.
    pub fn authorize_net(
        login_id: impl Into<String>,
        transaction_key: impl Into<String>,
    ) -> Result<Self> {
        Self::new(GatewayConfig::authorize_net(login_id, transaction_key))
    }

    /// Builds a gateway around any processor implementation.
    pub fn with_processor(processor: Arc<dyn Processor>, timeout: Duration) -> Self {
        Self {
            processor,
            timeout,
            profile: CardholderProfile::default(),
            outcome: None,
        }
    }

    /// First name on card.
    pub fn set_first_name(&mut self, name: &str) -> &mut Self {
        self.profile.first_name = name.trim().to_string();
        self
    }

    /// Last name on card.
    pub fn set_last_name(&mut self, name: &str) -> &mut Self {
        self.profile.last_name = name.trim().to_string();
        self
    }

    /// Billing address, line 1.
    pub fn set_address1(&mut self, address: &str) -> &mut Self {
        self.profile.address1 = address.trim().to_string();
        self
    }

    /// Billing address, line 2. A blank value clears it.
    pub fn set_address2(&mut self, address: &str) -> &mut Self {
        let address = address.trim();
        self.profile.address2 = (!address.is_empty()).then(|| address.to_string());
        self
    }

    /// Billing city.
    pub fn set_city(&mut self, city: &str) -> &mut Self {
        self.profile.city = city.trim().to_string();
        self
    }

    /// Billing state/province.
    pub fn set_province(&mut self, province: &str) -> &mut Self {
        self.profile.province = province.trim().to_string();
        self
    }

    /// Billing zip/postal code.
    pub fn set_postal(&mut self, postal: &str) -> &mut Self {
        self.profile.postal = postal.trim().to_string();
        self
    }

    /// Billing country.
    pub fn set_country(&mut self, country: &str) -> &mut Self {
        self.profile.country = country.trim().to_string();
        self
    }

    /// Card number.
    pub fn set_card_number(&mut self, number: &str) -> &mut Self {
        self.profile.card_number = number.trim().to_string();
        self
    }

    /// Card expiration, month in `MM` and year in `YYYY` format.
    pub fn set_expiration_date(&mut self, month: &str, year: &str) -> &mut Self {
        self.profile.expiration_month = month.trim().to_string();
        self.profile.expiration_year = year.trim().to_string();
        self
    }

    /// Card security code (CVV, CVV2, etc.).
    pub fn set_cvv(&mut self, cvv: &str) -> &mut Self {
        self.profile.cvv = cvv.trim().to_string();
        self
    }

    /// Charges the accumulated card.
    ///
    /// # Arguments
    ///
    /// * `amount` - Amount in `0.00` format
    /// * `currency` - ISO 4217 code, any case
    ///
    /// # Returns
    ///
    /// `true` if the processor approved the charge. Details of either result
    /// are available from [`errors`](Self::errors) and
    /// [`transaction_id`](Self::transaction_id) until the next call.
    pub async fn charge(&mut self, amount: &str, currency: &str) -> bool {
        let today = Utc::now().date_naive();
        self.charge_as_of(amount, currency, today).await
    }

    /// Charges in [`DEFAULT_CURRENCY`].
    pub async fn charge_usd(&mut self, amount: &str) -> bool {
        self.charge(amount, DEFAULT_CURRENCY).await
    }

    async fn charge_as_of(&mut self, amount: &str, currency: &str, today: NaiveDate) -> bool {
        let request = match validate_charge(&self.profile, amount, currency, today) {
            Ok(request) => request,
            Err(errors) => {
                tracing::warn!(
                    processor = self.processor.name(),
                    violations = errors.len(),
                    "charge rejected before submission"
                );
                return self.record(ChargeOutcome::failed(errors));
            }
        };

        tracing::info!(
            processor = self.processor.name(),
            amount_minor = request.amount.minor_units(),
            currency = %request.currency,
            card_last4 = request.profile.card_last4(),
            "submitting charge"
        );

        // Stays in place if this future is dropped before the processor answers.
        self.outcome = Some(ChargeOutcome::failed(vec![ChargeError::gateway_unavailable(
            "charge cancelled before the processor replied",
        )]));

        let reply = match tokio::time::timeout(self.timeout, self.processor.submit(&request)).await
        {
            Ok(reply) => reply,
            Err(_) => Err(GatewayError::TimeoutExceeded(self.timeout.as_millis())),
        };

        let outcome = match reply {
            Ok(ProcessorReply::Approved { transaction_id }) => {
                tracing::info!(transaction_id = %transaction_id, "charge approved");
                ChargeOutcome::succeeded(transaction_id)
            }
            Ok(ProcessorReply::Declined { errors }) => {
                tracing::warn!(
                    code = errors.first().map(|e| e.code.as_str()).unwrap_or_default(),
                    "charge declined"
                );
                ChargeOutcome::failed(errors)
            }
            Err(e) => {
                tracing::warn!(error = %e, "processor unavailable");
                ChargeOutcome::failed(vec![ChargeError::gateway_unavailable(e.to_string())])
            }
        };

        self.record(outcome)
    }

    fn record(&mut self, outcome: ChargeOutcome) -> bool {
        let success = outcome.is_success();
        self.outcome = Some(outcome);
        success
    }

    /// Errors from the latest charge; empty before any charge or after a success.
    pub fn errors(&self) -> &[ChargeError] {
        self.outcome
            .as_ref()
            .map(ChargeOutcome::errors)
            .unwrap_or_default()
    }

    /// Transaction id of the latest charge, if it succeeded.
    pub fn transaction_id(&self) -> Option<&str> {
        self.outcome.as_ref().and_then(ChargeOutcome::transaction_id)
    }

    /// The full outcome of the latest charge.
    pub fn last_outcome(&self) -> Option<&ChargeOutcome> {
        self.outcome.as_ref()
    }

    /// Fields accumulated so far.
    pub fn profile(&self) -> &CardholderProfile {
        &self.profile
    }

    /// Name of the processor charges go to.
    pub fn processor_name(&self) -> &str {
        self.processor.name()
    }
}
