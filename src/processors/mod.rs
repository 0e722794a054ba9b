//! Payment processor integrations.
//!
//! This module contains the trait every processor implements and the
//! concrete Stripe and Authorize.Net translations. A processor turns a
//! validated [`ChargeRequest`] into its own wire format, performs exactly one
//! HTTP call, and maps the answer back into a [`ProcessorReply`].

pub mod authorize_net;
pub mod stripe;

use crate::errors::Result;
use crate::types::{ChargeError, ChargeRequest};
use async_trait::async_trait;

pub use authorize_net::AuthorizeNet;
pub use stripe::Stripe;

/// Processor-neutral answer to a charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessorReply {
    /// The processor captured the funds.
    Approved {
        /// The processor's identifier for the charge
        transaction_id: String,
    },

    /// The processor refused the charge for a business reason.
    Declined {
        /// Errors as reported by the processor
        errors: Vec<ChargeError>,
    },
}

/// Trait for a payment processor's charge endpoint.
///
/// Transport failures, timeouts, 5xx answers and unreadable bodies are
/// reported as `Err`; the gateway turns them into `gateway_unavailable`.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Returns the name of this processor (e.g., "stripe").
    fn name(&self) -> &str;

    /// Submits one charge.
    ///
    /// # Arguments
    ///
    /// * `request` - Validated charge snapshot
    ///
    /// # Returns
    ///
    /// Whether the processor approved or declined the charge
    async fn submit(&self, request: &ChargeRequest) -> Result<ProcessorReply>;
}
