use nagare::order::{order_pipeline, Order, OrderItem, OrderServices, DEFAULT_LATENCY};
use nagare::Logging;
use std::path::Path;

fn load_order(path: &Path) -> Result<Order, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn sample_order() -> Order {
    Order::new(
        "ORDER123",
        "CUSTOMER001",
        vec![OrderItem::new("P1", 1)],
        250.0,
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let order = match std::env::args().nth(1) {
        Some(path) => load_order(Path::new(&path))?,
        None => sample_order(),
    };

    let pipeline = order_pipeline(OrderServices::simulated(DEFAULT_LATENCY))
        .use_middleware(Logging::new("order pipeline"))
        .build();

    match pipeline.execute(order).await {
        Ok(order) => {
            println!("Pipeline completed successfully");
            println!("{}", serde_json::to_string_pretty(&order)?);
        }
        Err(error) => {
            println!("Pipeline failed: {}", error);
            std::process::exit(1);
        }
    }

    Ok(())
}
