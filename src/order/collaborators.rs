//! External services the order steps delegate to.
//!
//! Each contract is a narrow async call that can fail in two ways: by
//! reporting failure in its return value (`false`, `None`) or by returning a
//! [`CollaboratorError`]. The steps treat both the same way.

use crate::order::model::{Invoice, Order};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Latency of the simulated services.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(500);

/// Failure raised by a collaborator call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// The service could not be reached.
    #[error("{service} is unavailable: {reason}")]
    Unavailable {
        service: &'static str,
        reason: String,
    },

    /// The service was reached but the call failed.
    #[error("{0}")]
    Failed(String),
}

#[async_trait]
pub trait PaymentCollaborator: Send + Sync {
    /// Charges `amount`. `Ok(false)` means the payment was declined.
    async fn process(&self, amount: f64) -> Result<bool, CollaboratorError>;
}

#[async_trait]
pub trait InvoiceCollaborator: Send + Sync {
    /// Issues an invoice for `order`. `Ok(None)` means none was produced.
    async fn generate(&self, order: &Order) -> Result<Option<Invoice>, CollaboratorError>;
}

#[async_trait]
pub trait NotificationCollaborator: Send + Sync {
    /// Sends `message` to the customer. `Ok(false)` means it was not delivered.
    async fn notify(&self, customer_id: &str, message: &str) -> Result<bool, CollaboratorError>;
}

#[async_trait]
pub trait StockCollaborator: Send + Sync {
    /// Reserves `quantity` units of `product_id`. `Ok(false)` means not enough stock.
    async fn reserve(&self, product_id: &str, quantity: u32) -> Result<bool, CollaboratorError>;
}

macro_rules! simulated_service {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name {
            latency: Duration,
        }

        impl $name {
            pub fn new() -> Self {
                Self {
                    latency: DEFAULT_LATENCY,
                }
            }

            pub fn with_latency(latency: Duration) -> Self {
                Self { latency }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

simulated_service!(
    /// Payment service that approves every charge.
    SimulatedPayment
);
simulated_service!(
    /// Invoice service that issues a fresh invoice for every order.
    SimulatedInvoicing
);
simulated_service!(
    /// Notification service that delivers every message.
    SimulatedNotifier
);
simulated_service!(
    /// Inventory with unlimited stock.
    SimulatedStock
);

#[async_trait]
impl PaymentCollaborator for SimulatedPayment {
    async fn process(&self, amount: f64) -> Result<bool, CollaboratorError> {
        info!("Processing payment of ${:.2}", amount);
        tokio::time::sleep(self.latency).await;
        info!("Payment processed successfully");
        Ok(true)
    }
}

#[async_trait]
impl InvoiceCollaborator for SimulatedInvoicing {
    async fn generate(&self, order: &Order) -> Result<Option<Invoice>, CollaboratorError> {
        info!("Generating invoice for order '{}'", order.order_id);
        tokio::time::sleep(self.latency).await;

        let invoice = Invoice {
            invoice_id: Uuid::new_v4().to_string(),
            order_id: order.order_id.clone(),
            amount: order.total_amount,
            generated_at: Utc::now(),
        };
        info!("Invoice generated: {}", invoice.invoice_id);
        Ok(Some(invoice))
    }
}

#[async_trait]
impl NotificationCollaborator for SimulatedNotifier {
    async fn notify(&self, customer_id: &str, message: &str) -> Result<bool, CollaboratorError> {
        info!("Sending notification to customer '{}'", customer_id);
        tokio::time::sleep(self.latency).await;
        info!("Notification sent: {}", message);
        Ok(true)
    }
}

#[async_trait]
impl StockCollaborator for SimulatedStock {
    async fn reserve(&self, product_id: &str, quantity: u32) -> Result<bool, CollaboratorError> {
        tokio::time::sleep(self.latency).await;
        info!("Reserved {} x '{}'", quantity, product_id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::model::OrderItem;

    #[tokio::test]
    async fn test_simulated_invoicing() {
        let invoicing = SimulatedInvoicing::with_latency(Duration::ZERO);
        let order = Order::new("ORDER9", "C1", vec![OrderItem::new("P1", 1)], 42.5);

        let invoice = invoicing.generate(&order).await.unwrap().unwrap();
        assert_eq!(invoice.order_id, "ORDER9");
        assert_eq!(invoice.amount, 42.5);
        assert!(Uuid::parse_str(&invoice.invoice_id).is_ok());

        let other = invoicing.generate(&order).await.unwrap().unwrap();
        assert_ne!(invoice.invoice_id, other.invoice_id);
    }

    #[tokio::test]
    async fn test_simulated_services_succeed() {
        assert_eq!(
            SimulatedPayment::with_latency(Duration::ZERO).process(10.0).await,
            Ok(true)
        );
        assert_eq!(
            SimulatedNotifier::with_latency(Duration::ZERO)
                .notify("C1", "hello")
                .await,
            Ok(true)
        );
        assert_eq!(
            SimulatedStock::with_latency(Duration::ZERO)
                .reserve("P1", 2)
                .await,
            Ok(true)
        );
    }

    #[test]
    fn test_collaborator_error_display() {
        let error = CollaboratorError::Unavailable {
            service: "payment",
            reason: "gateway down".to_string(),
        };
        assert_eq!(error.to_string(), "payment is unavailable: gateway down");
        assert_eq!(CollaboratorError::Failed("x".into()).to_string(), "x");
    }
}
