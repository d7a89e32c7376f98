use async_trait::async_trait;
use nagare::order::{
    order_pipeline, CollaboratorError, NotificationCollaborator, Order, OrderItem, OrderServices,
    PaymentCollaborator, StockCollaborator,
};
use nagare::prelude::*;
use nagare::{ErrorKind, RecordingSink};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

/// Counts calls and answers `false` for the first `failures` of them.
struct FlakyService {
    failures: u32,
    calls: AtomicU32,
}

impl FlakyService {
    fn failing(failures: u32) -> Arc<Self> {
        Arc::new(Self {
            failures,
            calls: AtomicU32::new(0),
        })
    }

    fn answer(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst) >= self.failures
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentCollaborator for FlakyService {
    async fn process(&self, _amount: f64) -> Result<bool, CollaboratorError> {
        Ok(self.answer())
    }
}

#[async_trait]
impl StockCollaborator for FlakyService {
    async fn reserve(&self, _product_id: &str, _quantity: u32) -> Result<bool, CollaboratorError> {
        Ok(self.answer())
    }
}

#[async_trait]
impl NotificationCollaborator for FlakyService {
    async fn notify(&self, _customer_id: &str, _message: &str) -> Result<bool, CollaboratorError> {
        Ok(self.answer())
    }
}

fn sample_order() -> Order {
    Order::new("ORDER1", "123", vec![OrderItem::new("P1", 1)], 200.0)
}

#[tokio::test]
async fn test_complete_order_pipeline() {
    let pipeline = order_pipeline(OrderServices::simulated(Duration::ZERO)).build();
    assert_eq!(pipeline.step_count(), 6);

    let order = assert_ok!(pipeline.execute(sample_order()).await);

    assert_eq!(order.shipping_cost, 15.0);
    assert!(order.items.iter().all(|item| item.reserved));
    assert!(order.payment_processed);
    assert!(order.invoice_generated);
    assert!(order.invoice.is_some());
    assert_eq!(
        order.invoice.as_ref().map(|invoice| invoice.amount),
        Some(200.0)
    );
    assert!(order.customer_notified);
}

#[tokio::test]
async fn test_order_without_items_fails_validation() {
    let payment = FlakyService::failing(0);
    let stock = FlakyService::failing(0);
    let mut services = OrderServices::simulated(Duration::ZERO);
    services.payment = payment.clone();
    services.stock = stock.clone();

    let sink = Arc::new(RecordingSink::new());
    let pipeline = order_pipeline(services)
        .with_failure_sink(sink.clone())
        .build();

    let mut order = sample_order();
    order.items.clear();

    let error = assert_err!(pipeline.execute(order).await);
    assert_eq!(error.kind(), ErrorKind::Validation);
    assert_eq!(
        error.step_name().map(|name| name.as_str()),
        Some("ValidateOrderStep")
    );

    // nothing after validation ran
    assert_eq!(stock.calls(), 0);
    assert_eq!(payment.calls(), 0);
    assert_eq!(sink.reports().len(), 1);
    assert!(sink.reports()[0].fatal);
}

#[tokio::test]
async fn test_flaky_stock_recovers_within_budget() {
    let stock = FlakyService::failing(2);
    let mut services = OrderServices::simulated(Duration::ZERO);
    services.stock = stock.clone();
    let sink = Arc::new(RecordingSink::new());

    let pipeline = order_pipeline(services)
        .with_failure_sink(sink.clone())
        .build();

    let order = assert_ok!(pipeline.execute(sample_order()).await);
    assert!(order.customer_notified);
    assert_eq!(stock.calls(), 3);
    assert_eq!(sink.attempts_for("ReserveStockStep"), 2);
}

#[tokio::test]
async fn test_declined_payment_stops_pipeline() {
    let payment = FlakyService::failing(u32::MAX);
    let notifier = FlakyService::failing(0);
    let mut services = OrderServices::simulated(Duration::ZERO);
    services.payment = payment.clone();
    services.notifier = notifier.clone();
    let sink = Arc::new(RecordingSink::new());

    let pipeline = order_pipeline(services)
        .with_failure_sink(sink.clone())
        .build();

    let error = assert_err!(pipeline.execute(sample_order()).await);
    assert_eq!(error.kind(), ErrorKind::Operation);
    assert_eq!(payment.calls(), 3);
    assert_eq!(notifier.calls(), 0);

    let attempts: Vec<_> = sink.reports().iter().map(|r| r.attempt).collect();
    assert_eq!(attempts, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_last_registered_middleware_catches_first() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let observer = |label: &'static str, log: Arc<Mutex<Vec<String>>>| {
        move |next: Handler<Order>| {
            let log = Arc::clone(&log);
            handler_fn(move |order: Order| async move {
                log.lock().unwrap().push(format!("{} enter", label));
                let result = next(order).await;
                if let Err(e) = &result {
                    log.lock().unwrap().push(format!("{} saw {}", label, e.kind()));
                }
                result
            })
        }
    };

    let pipeline = Pipeline::builder()
        .use_middleware(observer("A", Arc::clone(&log)))
        .use_middleware(observer("B", Arc::clone(&log)))
        .add_step(nagare::order::ValidateOrderStep)
        .build();

    assert_err!(pipeline.execute(Order::default()).await);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["A enter", "B enter", "B saw validation", "A saw validation"]
    );
}

#[tokio::test]
async fn test_deadline_bounds_slow_collaborators() {
    let pipeline = order_pipeline(OrderServices::simulated(Duration::from_secs(5)))
        .use_middleware(Deadline::new(Duration::from_millis(50)))
        .build();

    let error = assert_err!(pipeline.execute(sample_order()).await);
    assert_eq!(error.kind(), ErrorKind::Timeout);
}

#[tokio::test]
async fn test_logging_middleware_is_transparent() {
    let pipeline = order_pipeline(OrderServices::simulated(Duration::ZERO))
        .use_middleware(Logging::new("orders"))
        .build();
    assert_eq!(pipeline.middleware_count(), 2);

    let order = assert_ok!(pipeline.execute(sample_order()).await);
    assert!(order.payment_processed);
}
