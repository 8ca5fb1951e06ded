//! Mock payment gateway for development and testing.
//!
//! The resale marketplace never processes real payments: the gateway is a
//! fixed-delay mock that always succeeds absent a backend failure. The
//! trait keeps the seam where a real UPI/card processor would plug in.

use cineswap_core::types::{Money, PaymentMethod};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Payment gateway result
pub type GatewayResult<T> = Result<T, PaymentError>;

/// Payment gateway error
///
/// The mock gateway never produces these; a real integration would. The
/// coordinator maps any gateway error to a retryable commit failure since
/// nothing has been written yet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// The payment was declined by the processor.
    #[error("payment declined: {reason}")]
    Declined {
        /// Decline reason from the processor.
        reason: String,
    },
    /// The gateway did not answer in time.
    #[error("payment gateway timeout")]
    Timeout,
}

/// Confirmation returned by a successful payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    /// Gateway-side reference for the charge.
    pub gateway_reference: String,
    /// Amount charged.
    pub amount: Money,
    /// Payment method used.
    pub payment_method: PaymentMethod,
}

/// Payment gateway trait
///
/// Abstraction over payment processors (UPI apps, card networks). Uses
/// explicit `Pin<Box<dyn Future>>` returns to stay dyn-compatible for the
/// coordinator's `Arc<dyn PaymentGateway>`.
pub trait PaymentGateway: Send + Sync {
    /// Charge the buyer.
    ///
    /// # Errors
    ///
    /// Returns an error if the processor declines or times out.
    fn process_payment(
        &self,
        amount: Money,
        payment_method: PaymentMethod,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<PaymentConfirmation>> + Send>>;
}

/// Mock payment gateway (always succeeds)
///
/// Simulates processor latency with a fixed delay (two seconds by
/// default, matching the production dialog's spinner), then confirms.
#[derive(Clone, Debug)]
pub struct MockPaymentGateway {
    delay: Duration,
}

impl MockPaymentGateway {
    /// Default processing delay.
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

    /// Creates a mock gateway with the default two-second delay
    #[must_use]
    pub const fn new() -> Self {
        Self {
            delay: Self::DEFAULT_DELAY,
        }
    }

    /// Creates a mock gateway with a chosen delay (zero in tests)
    #[must_use]
    pub const fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared() -> Arc<dyn PaymentGateway> {
        Arc::new(Self::new())
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentGateway for MockPaymentGateway {
    fn process_payment(
        &self,
        amount: Money,
        payment_method: PaymentMethod,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<PaymentConfirmation>> + Send>> {
        let delay = self.delay;
        Box::pin(async move {
            // Simulate processor latency
            tokio::time::sleep(delay).await;

            let gateway_reference = format!("mock_pay_{}", uuid::Uuid::new_v4());

            tracing::info!(
                amount = %amount,
                method = %payment_method,
                gateway_reference = %gateway_reference,
                "Mock payment processed successfully"
            );

            Ok(PaymentConfirmation {
                gateway_reference,
                amount,
                payment_method,
            })
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_payment_always_succeeds() {
        let gateway = MockPaymentGateway::with_delay(Duration::ZERO);
        let amount = Money::from_rupees(30);

        let confirmation = gateway
            .process_payment(amount, PaymentMethod::Card)
            .await
            .unwrap();

        assert_eq!(confirmation.amount, amount);
        assert_eq!(confirmation.payment_method, PaymentMethod::Card);
        assert!(confirmation.gateway_reference.starts_with("mock_pay_"));
    }

    #[tokio::test(start_paused = true)]
    async fn mock_payment_waits_the_configured_delay() {
        let gateway = MockPaymentGateway::new();
        let started = tokio::time::Instant::now();

        gateway
            .process_payment(Money::from_rupees(15), PaymentMethod::Upi)
            .await
            .unwrap();

        assert!(started.elapsed() >= MockPaymentGateway::DEFAULT_DELAY);
    }
}
