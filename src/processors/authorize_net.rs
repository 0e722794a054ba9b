//! Authorize.Net JSON API (`createTransactionRequest`, `authCaptureTransaction`).
//!
//! The API answers HTTP 200 for almost everything, including declines and
//! authentication failures, and prefixes its JSON with a UTF-8 byte order
//! mark. Element order in the request matters to the processor, so the
//! request types below declare their fields in schema order.

use crate::errors::{GatewayError, Result};
use crate::processors::{Processor, ProcessorReply};
use crate::types::{
    ChargeError, ChargeRequest, Secret, AUTHENTICATION_FAILED, CARD_DECLINED,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Sandbox API base.
pub const AUTHORIZE_NET_SANDBOX_BASE: &str = "https://apitest.authorize.net/";

/// Production API base.
pub const AUTHORIZE_NET_PRODUCTION_BASE: &str = "https://api.authorize.net/";

const REQUEST_PATH: &str = "xml/v1/request.api";

// Response codes inside `transactionResponse`.
const APPROVED: &str = "1";
const DECLINED: &str = "2";
const ERROR: &str = "3";
const HELD_FOR_REVIEW: &str = "4";

/// Error code reported when the processor holds a transaction for review.
pub const HELD_FOR_REVIEW_CODE: &str = "held_for_review";

// Result code for an invalid login id or transaction key.
const E_AUTHENTICATION: &str = "E00007";

/// Authorize.Net processor bound to one API login.
pub struct AuthorizeNet {
    login_id: String,
    transaction_key: Secret,
    endpoint: Url,
    http_client: Client,
    timeout: Duration,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    create_transaction_request: CreateTransactionRequest<'a>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CreateTransactionRequest<'a> {
    merchant_authentication: MerchantAuthentication<'a>,
    transaction_request: TransactionRequest<'a>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct MerchantAuthentication<'a> {
    name: &'a str,
    transaction_key: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct TransactionRequest<'a> {
    transaction_type: &'static str,
    amount: String,
    currency_code: &'a str,
    payment: Payment<'a>,
    bill_to: BillTo<'a>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Payment<'a> {
    credit_card: CreditCard<'a>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CreditCard<'a> {
    card_number: &'a str,
    expiration_date: String,
    card_code: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct BillTo<'a> {
    first_name: &'a str,
    last_name: &'a str,
    address: String,
    city: &'a str,
    state: &'a str,
    zip: &'a str,
    country: &'a str,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CreateTransactionResponse {
    transaction_response: Option<TransactionResponse>,
    messages: ResultMessages,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct TransactionResponse {
    response_code: Option<String>,
    trans_id: Option<String>,
    #[serde(default)]
    errors: Vec<TransactionError>,
    #[serde(default)]
    messages: Vec<TransactionMessage>,
}

#[derive(Deserialize, Debug)]
struct TransactionMessage {
    code: String,
    description: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct TransactionError {
    error_code: String,
    error_text: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ResultMessages {
    result_code: String,
    #[serde(default)]
    message: Vec<ResultMessage>,
}

#[derive(Deserialize, Debug)]
struct ResultMessage {
    code: String,
    text: String,
}

impl AuthorizeNet {
    /// Creates an Authorize.Net processor.
    ///
    /// # Arguments
    ///
    /// * `login_id` - API login id
    /// * `transaction_key` - API transaction key
    /// * `api_base` - [`AUTHORIZE_NET_SANDBOX_BASE`] or [`AUTHORIZE_NET_PRODUCTION_BASE`]
    /// * `http_client` - Client with the gateway's timeout already applied
    /// * `timeout` - The same timeout, used for error reporting
    pub fn new(
        login_id: impl Into<String>,
        transaction_key: Secret,
        api_base: &Url,
        http_client: Client,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            login_id: login_id.into(),
            transaction_key,
            endpoint: api_base.join(REQUEST_PATH)?,
            http_client,
            timeout,
        })
    }

    /// URL requests are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Builds the JSON body for a charge.
    fn request_body<'a>(&'a self, request: &'a ChargeRequest) -> Envelope<'a> {
        let p = &request.profile;
        let address = match p.address2() {
            Some(line2) => format!("{} {}", p.address1(), line2),
            None => p.address1().to_string(),
        };

        Envelope {
            create_transaction_request: CreateTransactionRequest {
                merchant_authentication: MerchantAuthentication {
                    name: &self.login_id,
                    transaction_key: self.transaction_key.expose(),
                },
                transaction_request: TransactionRequest {
                    transaction_type: "authCaptureTransaction",
                    amount: request.amount.to_string(),
                    currency_code: &request.currency,
                    payment: Payment {
                        credit_card: CreditCard {
                            card_number: p.card_number(),
                            expiration_date: format!(
                                "{}-{}",
                                p.expiration_year(),
                                p.expiration_month()
                            ),
                            card_code: p.cvv(),
                        },
                    },
                    bill_to: BillTo {
                        first_name: p.first_name(),
                        last_name: p.last_name(),
                        address,
                        city: p.city(),
                        state: p.province(),
                        zip: p.postal(),
                        country: p.country(),
                    },
                },
            },
        }
    }

    /// Maps an Authorize.Net HTTP answer into a processor reply.
    pub(crate) fn translate(status: StatusCode, body: &str) -> Result<ProcessorReply> {
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(GatewayError::ProcessorUnavailable(status.as_u16()));
        }
        if !status.is_success() {
            return Err(GatewayError::MalformedResponse(format!(
                "unexpected HTTP status {}",
                status
            )));
        }

        let body = body.trim_start_matches('\u{feff}');
        let response: CreateTransactionResponse = serde_json::from_str(body)
            .map_err(|e| GatewayError::MalformedResponse(format!("transaction response: {}", e)))?;

        if let Some(tx) = response.transaction_response {
            match tx.response_code.as_deref() {
                Some(APPROVED) => {
                    let transaction_id = tx.trans_id.filter(|id| !id.is_empty()).ok_or_else(|| {
                        GatewayError::MalformedResponse(
                            "approved transaction without transId".to_string(),
                        )
                    })?;
                    return Ok(ProcessorReply::Approved { transaction_id });
                }
                Some(code)
                    if !tx.errors.is_empty() || matches!(code, DECLINED | ERROR | HELD_FOR_REVIEW) =>
                {
                    let fallback = if code == HELD_FOR_REVIEW {
                        tracing::warn!(
                            trans_id = tx.trans_id.as_deref().unwrap_or_default(),
                            "authorize.net held transaction for review"
                        );
                        HELD_FOR_REVIEW_CODE
                    } else {
                        CARD_DECLINED
                    };

                    let mut errors: Vec<ChargeError> = tx
                        .errors
                        .into_iter()
                        .map(|e| ChargeError::new(e.error_code, e.error_text))
                        .collect();
                    if errors.is_empty() {
                        errors = tx
                            .messages
                            .into_iter()
                            .filter(|m| !m.description.is_empty())
                            .map(|m| {
                                tracing::debug!(code = %m.code, "authorize.net transaction message");
                                ChargeError::new(fallback, m.description)
                            })
                            .collect();
                    }
                    if errors.is_empty() {
                        let message = if code == HELD_FOR_REVIEW {
                            "This transaction is being held for review."
                        } else {
                            "This transaction has been declined."
                        };
                        errors.push(ChargeError::new(fallback, message));
                    }
                    return Ok(ProcessorReply::Declined { errors });
                }
                _ => {}
            }
        }

        if response.messages.result_code != "Error" {
            return Err(GatewayError::MalformedResponse(
                "response carried neither a transaction nor an error".to_string(),
            ));
        }

        // No usable transaction response: the top-level messages explain why.
        let mut errors = response
            .messages
            .message
            .into_iter()
            .map(|m| {
                if m.code == E_AUTHENTICATION {
                    ChargeError::new(
                        AUTHENTICATION_FAILED,
                        "processor rejected the configured credentials",
                    )
                } else {
                    ChargeError::new(m.code, m.text)
                }
            })
            .collect::<Vec<_>>();

        if errors.is_empty() {
            errors.push(ChargeError::new(
                CARD_DECLINED,
                "The transaction was unsuccessful.",
            ));
        }

        Ok(ProcessorReply::Declined { errors })
    }
}

#[async_trait]
impl Processor for AuthorizeNet {
    fn name(&self) -> &str {
        "authorize_net"
    }

    async fn submit(&self, request: &ChargeRequest) -> Result<ProcessorReply> {
        let timeout_ms = self.timeout.as_millis();
        tracing::debug!(endpoint = %self.endpoint, "posting authorize.net transaction");

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .json(&self.request_body(request))
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
