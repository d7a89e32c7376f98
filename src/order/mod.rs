//! Order processing built on the pipeline.
//!
//! This module is the domain glue: an [`Order`] payload, the collaborator
//! contracts its steps call, simulated collaborators, and the six steps of
//! the standard order flow.

mod collaborators;
mod model;
mod steps;

pub use collaborators::{
    CollaboratorError, InvoiceCollaborator, NotificationCollaborator, PaymentCollaborator,
    SimulatedInvoicing, SimulatedNotifier, SimulatedPayment, SimulatedStock, StockCollaborator,
    DEFAULT_LATENCY,
};
pub use model::{Invoice, Order, OrderItem};
pub use steps::{
    CalculateShippingStep, GenerateInvoiceStep, NotifyCustomerStep, ProcessPaymentStep,
    ReserveStockStep, ValidateOrderStep, FLAT_SHIPPING_COST,
};

use crate::middleware::ExceptionLogging;
use crate::pipeline::PipelineBuilder;
use std::sync::Arc;
use std::time::Duration;

/// The collaborators an order pipeline talks to.
#[derive(Clone)]
pub struct OrderServices {
    /// Used by [`ReserveStockStep`]
    pub stock: Arc<dyn StockCollaborator>,
    /// Used by [`ProcessPaymentStep`]
    pub payment: Arc<dyn PaymentCollaborator>,
    /// Used by [`GenerateInvoiceStep`]
    pub invoicing: Arc<dyn InvoiceCollaborator>,
    /// Used by [`NotifyCustomerStep`]
    pub notifier: Arc<dyn NotificationCollaborator>,
}

impl OrderServices {
    /// Simulated collaborators that always succeed after `latency`.
    pub fn simulated(latency: Duration) -> Self {
        Self {
            stock: Arc::new(SimulatedStock::with_latency(latency)),
            payment: Arc::new(SimulatedPayment::with_latency(latency)),
            invoicing: Arc::new(SimulatedInvoicing::with_latency(latency)),
            notifier: Arc::new(SimulatedNotifier::with_latency(latency)),
        }
    }
}

/// Assembles the standard order flow behind [`ExceptionLogging`]:
/// validate, calculate shipping, reserve stock, take payment, invoice, notify.
///
/// Returns the builder so callers can add middleware or a failure sink.
/// [`ExceptionLogging`] is registered first and stays outermost, so failures
/// raised inside middleware added later are logged too.
///
/// ```
/// use nagare::order::{order_pipeline, Order, OrderItem, OrderServices};
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let pipeline = order_pipeline(OrderServices::simulated(Duration::ZERO)).build();
/// let order = Order::new("ORDER1", "123", vec![OrderItem::new("P1", 1)], 200.0);
///
/// let processed = pipeline.execute(order).await.unwrap();
/// assert!(processed.customer_notified);
/// # }
/// ```
pub fn order_pipeline(services: OrderServices) -> PipelineBuilder<Order> {
    PipelineBuilder::new()
        .use_middleware(ExceptionLogging)
        .add_step(ValidateOrderStep)
        .add_step(CalculateShippingStep)
        .add_step(ReserveStockStep::new(services.stock))
        .add_step(ProcessPaymentStep::new(services.payment))
        .add_step(GenerateInvoiceStep::new(services.invoicing))
        .add_step(NotifyCustomerStep::new(services.notifier))
}
