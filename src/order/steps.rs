use crate::error::PipelineError;
use crate::order::collaborators::{
    CollaboratorError, InvoiceCollaborator, NotificationCollaborator, PaymentCollaborator,
    StockCollaborator,
};
use crate::order::model::Order;
use crate::step::{RetryPolicy, Step, StepName};
use async_trait::async_trait;
use std::sync::Arc;

/// Shipping cost applied to every order.
pub const FLAT_SHIPPING_COST: f64 = 15.0;

fn operation_error(step_name: StepName, error: CollaboratorError) -> PipelineError {
    PipelineError::operation(step_name, error.to_string())
}

crate::define_step!(
    /// Rejects orders without a customer or without items.
    ValidateOrderStep
);

#[async_trait]
impl Step<Order> for ValidateOrderStep {
    async fn execute(&self, order: &mut Order) -> Result<(), PipelineError> {
        if order.customer_id.trim().is_empty() {
            return Err(PipelineError::validation(
                self.name(),
                "order has no customer",
            ));
        }
        if order.items.is_empty() {
            return Err(PipelineError::validation(self.name(), "order has no items"));
        }
        Ok(())
    }
}

crate::define_step!(CalculateShippingStep);

#[async_trait]
impl Step<Order> for CalculateShippingStep {
    async fn execute(&self, order: &mut Order) -> Result<(), PipelineError> {
        order.shipping_cost = FLAT_SHIPPING_COST;
        Ok(())
    }
}

/// Reserves stock for every order line not reserved yet.
///
/// Lines reserved by an earlier failed attempt are skipped on retry.
pub struct ReserveStockStep {
    stock: Arc<dyn StockCollaborator>,
}

impl ReserveStockStep {
    pub fn new(stock: Arc<dyn StockCollaborator>) -> Self {
        Self { stock }
    }
}

#[async_trait]
impl Step<Order> for ReserveStockStep {
    async fn execute(&self, order: &mut Order) -> Result<(), PipelineError> {
        for item in order.items.iter_mut().filter(|item| !item.reserved) {
            let reserved = self
                .stock
                .reserve(&item.product_id, item.quantity)
                .await
                .map_err(|e| operation_error(self.name(), e))?;
            if !reserved {
                return Err(PipelineError::operation(
                    self.name(),
                    format!("could not reserve stock for '{}'", item.product_id),
                ));
            }
            item.reserved = true;
        }
        Ok(())
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::attempts(3)
    }
}

/// Charges the order total. Declines and collaborator errors are retried up
/// to three attempts.
pub struct ProcessPaymentStep {
    payment: Arc<dyn PaymentCollaborator>,
}

impl ProcessPaymentStep {
    pub fn new(payment: Arc<dyn PaymentCollaborator>) -> Self {
        Self { payment }
    }
}

#[async_trait]
impl Step<Order> for ProcessPaymentStep {
    async fn execute(&self, order: &mut Order) -> Result<(), PipelineError> {
        let approved = self
            .payment
            .process(order.total_amount)
            .await
            .map_err(|e| operation_error(self.name(), e))?;
        if !approved {
            return Err(PipelineError::operation(
                self.name(),
                "payment was declined",
            ));
        }
        order.payment_processed = true;
        Ok(())
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::attempts(3)
    }
}

/// Stores the invoice issued for the order. Not retried.
pub struct GenerateInvoiceStep {
    invoicing: Arc<dyn InvoiceCollaborator>,
}

impl GenerateInvoiceStep {
    pub fn new(invoicing: Arc<dyn InvoiceCollaborator>) -> Self {
        Self { invoicing }
    }
}

#[async_trait]
impl Step<Order> for GenerateInvoiceStep {
    async fn execute(&self, order: &mut Order) -> Result<(), PipelineError> {
        let invoice = self
            .invoicing
            .generate(order)
            .await
            .map_err(|e| operation_error(self.name(), e))?
            .ok_or_else(|| PipelineError::operation(self.name(), "no invoice was generated"))?;
        order.invoice = Some(invoice);
        order.invoice_generated = true;
        Ok(())
    }
}

/// Tells the customer their order went through, with up to two attempts.
pub struct NotifyCustomerStep {
    notifier: Arc<dyn NotificationCollaborator>,
}

impl NotifyCustomerStep {
    pub fn new(notifier: Arc<dyn NotificationCollaborator>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl Step<Order> for NotifyCustomerStep {
    async fn execute(&self, order: &mut Order) -> Result<(), PipelineError> {
        let message = format!(
            "Your order #{} has been processed successfully!",
            order.order_id
        );
        let sent = self
            .notifier
            .notify(&order.customer_id, &message)
            .await
            .map_err(|e| operation_error(self.name(), e))?;
        if !sent {
            return Err(PipelineError::operation(
                self.name(),
                "customer could not be notified",
            ));
        }
        order.customer_notified = true;
        Ok(())
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::attempts(2)
    }
}
