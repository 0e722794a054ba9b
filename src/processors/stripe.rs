//! Stripe charge API (`POST /v1/charges`).
//!
//! Requests are form-encoded and authenticated with the secret key as a
//! bearer token. Amounts go out in minor units and currencies in lowercase.
//! Card data is sent inline as a `source` of type `card`.

use crate::errors::{GatewayError, Result};
use crate::processors::{Processor, ProcessorReply};
use crate::types::{
    ChargeError, ChargeRequest, Secret, AUTHENTICATION_FAILED, CARD_DECLINED,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Production API base.
pub const STRIPE_API_BASE: &str = "https://api.stripe.com/";

const CHARGES_PATH: &str = "v1/charges";

/// Stripe processor bound to one secret key.
pub struct Stripe {
    secret_key: Secret,
    endpoint: Url,
    http_client: Client,
    timeout: Duration,
}

#[derive(Deserialize, Debug)]
struct StripeCharge {
    id: String,
    status: Option<String>,
    paid: Option<bool>,
    failure_code: Option<String>,
    failure_message: Option<String>,
}

#[derive(Deserialize, Debug)]
struct StripeErrorBody {
    error: StripeError,
}

#[derive(Deserialize, Debug)]
struct StripeError {
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
    decline_code: Option<String>,
    message: Option<String>,
}

impl Stripe {
    /// Creates a Stripe processor.
    ///
    /// # Arguments
    ///
    /// * `secret_key` - `sk_...` or `rk_...` key
    /// * `api_base` - API root, normally [`STRIPE_API_BASE`]
    /// * `http_client` - Client with the gateway's timeout already applied
    /// * `timeout` - The same timeout, used for error reporting
    pub fn new(
        secret_key: Secret,
        api_base: &Url,
        http_client: Client,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            secret_key,
            endpoint: api_base.join(CHARGES_PATH)?,
            http_client,
            timeout,
        })
    }

    /// URL charges are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Builds the form body for a charge.
    pub(crate) fn form_params(request: &ChargeRequest) -> Vec<(&'static str, String)> {
        let p = &request.profile;
        let mut params = vec![
            ("amount", request.amount.minor_units().to_string()),
            ("currency", request.currency.to_ascii_lowercase()),
            ("source[object]", "card".to_string()),
            ("source[number]", p.card_number().to_string()),
            ("source[exp_month]", p.expiration_month().to_string()),
            ("source[exp_year]", p.expiration_year().to_string()),
            ("source[cvc]", p.cvv().to_string()),
            (
                "source[name]",
                format!("{} {}", p.first_name(), p.last_name()),
            ),
            ("source[address_line1]", p.address1().to_string()),
        ];
        if let Some(line2) = p.address2() {
            params.push(("source[address_line2]", line2.to_string()));
        }
        params.extend([
            ("source[address_city]", p.city().to_string()),
            ("source[address_state]", p.province().to_string()),
            ("source[address_zip]", p.postal().to_string()),
            ("source[address_country]", p.country().to_string()),
        ]);
        params
    }

    /// Maps a Stripe HTTP answer into a processor reply.
    pub(crate) fn translate(status: StatusCode, body: &str) -> Result<ProcessorReply> {
        if status.is_success() {
            let charge: StripeCharge = serde_json::from_str(body)
                .map_err(|e| GatewayError::MalformedResponse(format!("charge object: {}", e)))?;

            let succeeded = match charge.status.as_deref() {
                Some(s) => s == "succeeded",
                None => charge.paid.unwrap_or(false),
            };
            if succeeded {
                return Ok(ProcessorReply::Approved {
                    transaction_id: charge.id,
                });
            }

            let status = charge.status.unwrap_or_else(|| "unpaid".to_string());
            return Ok(ProcessorReply::Declined {
                errors: vec![ChargeError::new(
                    charge
                        .failure_code
                        .unwrap_or_else(|| CARD_DECLINED.to_string()),
                    charge
                        .failure_message
                        .unwrap_or_else(|| format!("charge {} is {}", charge.id, status)),
                )],
            });
        }

        match status {
            // Stripe echoes part of the key in these messages; keep it out.
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(ProcessorReply::Declined {
                errors: vec![ChargeError::new(
                    AUTHENTICATION_FAILED,
                    "processor rejected the configured credentials",
                )],
            }),
            StatusCode::TOO_MANY_REQUESTS => {
                Err(GatewayError::ProcessorUnavailable(status.as_u16()))
            }
            s if s.is_server_error() => Err(GatewayError::ProcessorUnavailable(s.as_u16())),
            s if s.is_client_error() => {
                let body: StripeErrorBody = serde_json::from_str(body).map_err(|e| {
                    GatewayError::MalformedResponse(format!("error object (HTTP {}): {}", s, e))
                })?;
                let err = body.error;
                let code = err
                    .code
                    .or(err.decline_code)
                    .or(err.kind)
                    .unwrap_or_else(|| CARD_DECLINED.to_string());
                let message = err
                    .message
                    .unwrap_or_else(|| "charge was declined".to_string());
                Ok(ProcessorReply::Declined {
                    errors: vec![ChargeError::new(code, message)],
                })
            }
            s => Err(GatewayError::MalformedResponse(format!(
                "unexpected HTTP status {}",
                s
            ))),
        }
    }
}

#[async_trait]
impl Processor for Stripe {
    fn name(&self) -> &str {
        "stripe"
    }

    async fn submit(&self, request: &ChargeRequest) -> Result<ProcessorReply> {
        let timeout_ms = self.timeout.as_millis();
        tracing::debug!(endpoint = %self.endpoint, "posting stripe charge");

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .bearer_auth(self.secret_key.expose())
            .form(&Self::form_params(request))
            .send()
            .await
            .map_err(|e| GatewayError::from_transport(e, timeout_ms))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::from_transport(e, timeout_ms))?;

        Self::translate(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Amount, CardholderProfile};
    use serde_json::json;

    fn request() -> ChargeRequest {
        ChargeRequest {
            profile: CardholderProfile {
                first_name: "Bob".to_string(),
                last_name: "Smith".to_string(),
                address1: "123 Test Street".to_string(),
                address2: Some("Suite #4".to_string()),
                city: "Morristown".to_string(),
                province: "TN".to_string(),
                postal: "37814".to_string(),
                country: "US".to_string(),
                card_number: "4007000000027".to_string(),
                expiration_month: "10".to_string(),
                expiration_year: "2029".to_string(),
                cvv: "123".to_string(),
            },
            amount: Amount::from_minor_units(4999),
            currency: "USD".to_string(),
        }
    }

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_form_params() {
        let params = Stripe::form_params(&request());
        assert_eq!(param(&params, "amount"), Some("4999"));
        assert_eq!(param(&params, "currency"), Some("usd"));
        assert_eq!(param(&params, "source[number]"), Some("4007000000027"));
        assert_eq!(param(&params, "source[exp_month]"), Some("10"));
        assert_eq!(param(&params, "source[exp_year]"), Some("2029"));
        assert_eq!(param(&params, "source[cvc]"), Some("123"));
        assert_eq!(param(&params, "source[name]"), Some("Bob Smith"));
        assert_eq!(param(&params, "source[address_line2]"), Some("Suite #4"));
        assert_eq!(param(&params, "source[address_zip]"), Some("37814"));
    }

    #[test]
    fn test_form_params_without_address2() {
        let mut req = request();
        req.profile.address2 = None;
        let params = Stripe::form_params(&req);
        assert_eq!(param(&params, "source[address_line2]"), None);
    }

    #[test]
    fn test_endpoint_join() {
        let base = Url::parse(STRIPE_API_BASE).unwrap();
        let stripe = Stripe::new(
            Secret::new("sk_test_x"),
            &base,
            Client::new(),
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(stripe.endpoint().as_str(), "https://api.stripe.com/v1/charges");
    }

    #[test]
    fn test_translate_success() {
        let body = json!({"id": "ch_3Abc", "object": "charge", "status": "succeeded", "paid": true});
        let reply = Stripe::translate(StatusCode::OK, &body.to_string()).unwrap();
        assert_eq!(
            reply,
            ProcessorReply::Approved {
                transaction_id: "ch_3Abc".to_string()
            }
        );
    }

    #[test]
    fn test_translate_failed_charge_object() {
        let body = json!({
            "id": "ch_fail",
            "status": "failed",
            "paid": false,
            "failure_code": "card_declined",
            "failure_message": "Your card was declined."
        });
        let reply = Stripe::translate(StatusCode::OK, &body.to_string()).unwrap();
        match reply {
            ProcessorReply::Declined { errors } => {
                assert_eq!(errors[0].code, "card_declined");
                assert_eq!(errors[0].message, "Your card was declined.");
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_translate_card_error() {
        let body = json!({"error": {
            "type": "card_error",
            "code": "card_declined",
            "decline_code": "insufficient_funds",
            "message": "Your card has insufficient funds."
        }});
        let reply = Stripe::translate(StatusCode::PAYMENT_REQUIRED, &body.to_string()).unwrap();
        assert_eq!(
            reply,
            ProcessorReply::Declined {
                errors: vec![ChargeError::new(
                    "card_declined",
                    "Your card has insufficient funds."
                )]
            }
        );
    }

    #[test]
    fn test_translate_error_without_code_uses_type() {
        let body = json!({"error": {"type": "invalid_request_error", "message": "Missing amount"}});
        let reply = Stripe::translate(StatusCode::BAD_REQUEST, &body.to_string()).unwrap();
        match reply {
            ProcessorReply::Declined { errors } => assert_eq!(errors[0].code, "invalid_request_error"),
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_translate_auth_failure_hides_message() {
        let body = json!({"error": {
            "type": "invalid_request_error",
            "message": "Invalid API Key provided: sk_test_****Mal"
        }});
        let reply = Stripe::translate(StatusCode::UNAUTHORIZED, &body.to_string()).unwrap();
        match reply {
            ProcessorReply::Declined { errors } => {
                assert_eq!(errors[0].code, AUTHENTICATION_FAILED);
                assert!(!errors[0].message.contains("sk_"));
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_translate_unavailable() {
        assert!(matches!(
            Stripe::translate(StatusCode::SERVICE_UNAVAILABLE, ""),
            Err(GatewayError::ProcessorUnavailable(503))
        ));
        assert!(matches!(
            Stripe::translate(StatusCode::TOO_MANY_REQUESTS, ""),
            Err(GatewayError::ProcessorUnavailable(429))
        ));
    }

    #[test]
    fn test_translate_malformed() {
        assert!(matches!(
            Stripe::translate(StatusCode::OK, "<html>"),
            Err(GatewayError::MalformedResponse(_))
        ));
        assert!(matches!(
            Stripe::translate(StatusCode::PAYMENT_REQUIRED, "{}"),
            Err(GatewayError::MalformedResponse(_))
        ));
    }
}
