use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A customer order flowing through the order pipeline.
///
/// The input fields (`order_id`, `customer_id`, `items`, `total_amount`) are
/// supplied by the caller; the remaining fields are filled in by the steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default)]
    pub order_id: String,
    pub customer_id: String,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    #[serde(default)]
    pub shipping_cost: f64,
    #[serde(default)]
    pub payment_processed: bool,
    #[serde(default)]
    pub invoice_generated: bool,
    #[serde(default)]
    pub invoice: Option<Invoice>,
    #[serde(default)]
    pub customer_notified: bool,
}

impl Order {
    /// Creates an unprocessed order; every step-filled field starts empty.
    pub fn new(
        order_id: impl Into<String>,
        customer_id: impl Into<String>,
        items: Vec<OrderItem>,
        total_amount: f64,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            customer_id: customer_id.into(),
            items,
            total_amount,
            ..Self::default()
        }
    }
}

/// One order line: a product and how many units of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub quantity: u32,
    /// Set once stock has been reserved for this line
    #[serde(default)]
    pub reserved: bool,
}

impl OrderItem {
    /// Creates a line with no stock reserved yet.
    pub fn new(product_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            reserved: false,
        }
    }
}

/// An invoice issued for a processed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: String,
    /// The order this invoice bills
    pub order_id: String,
    pub amount: f64,
    /// When the invoicing service issued it (UTC)
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_from_minimal_json() {
        let order: Order = serde_json::from_str(
            r#"{
                "customer_id": "123",
                "items": [{"product_id": "P1", "quantity": 1}],
                "total_amount": 200.0
            }"#,
        )
        .unwrap();

        assert_eq!(order.customer_id, "123");
        assert_eq!(order.items, vec![OrderItem::new("P1", 1)]);
        assert_eq!(order.shipping_cost, 0.0);
        assert!(order.invoice.is_none());
        assert!(!order.payment_processed);
    }

    #[test]
    fn test_order_new() {
        let order = Order::new("ORDER1", "CUSTOMER1", vec![OrderItem::new("P2", 3)], 10.0);
        assert_eq!(order.order_id, "ORDER1");
        assert_eq!(order.items[0].quantity, 3);
        assert!(!order.customer_notified);
    }
}
