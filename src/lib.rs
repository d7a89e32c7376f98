//! # Nagare (流れ)
//!
//! A lightweight middleware pipeline for Rust.
//!
//! The name "Nagare" (流れ) means "flow" or "stream" in Japanese: a single
//! value flows through an ordered list of steps, with middleware wrapped
//! around the whole run.
//!
//! ## Features
//!
//! - **Typed payload**: one value of any `T: Send` is threaded through every step
//! - **Async First**: Built with `async-trait` for asynchronous steps
//! - **Per-step Retry**: each step declares its attempt budget and whether it retries
//! - **Middleware**: decorators composed around the step sequence, first-registered outermost
//! - **Error Handling**: Structured errors with `thiserror`, failure reports via `tracing`
//!
//! ## Quick Start
//!
//! ```rust
//! use nagare::prelude::*;
//! use async_trait::async_trait;
//!
//! define_step!(GreetStep);
//!
//! #[async_trait]
//! impl Step<String> for GreetStep {
//!     async fn execute(&self, value: &mut String) -> Result<(), PipelineError> {
//!         value.insert_str(0, "Hello, ");
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let pipeline = Pipeline::builder()
//!     .use_middleware(ExceptionLogging)
//!     .add_step(GreetStep)
//!     .build();
//!
//! let greeting = pipeline.execute("Nagare".to_string()).await;
//! assert_eq!(greeting, Ok("Hello, Nagare".to_string()));
//! # }
//! ```
//!
//! ## Retry Policies
//!
//! A step is retried only when its policy is enabled, the failure kind is
//! retryable, and the attempt budget is not spent. Validation failures are
//! never retried.
//!
//! ```rust
//! use nagare::prelude::*;
//! use async_trait::async_trait;
//! use std::time::Duration;
//!
//! define_step!(ChargeCardStep);
//!
//! #[async_trait]
//! impl Step<f64> for ChargeCardStep {
//!     async fn execute(&self, _amount: &mut f64) -> Result<(), PipelineError> {
//!         Ok(())
//!     }
//!
//!     fn retry_policy(&self) -> RetryPolicy {
//!         RetryPolicy::attempts(3).with_delay(Duration::from_millis(100))
//!     }
//! }
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use nagare::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let pipeline = Pipeline::builder()
//!     .add_fn("Validate", RetryPolicy::none(), |items: &mut Vec<u32>| {
//!         Box::pin(async move {
//!             if items.is_empty() {
//!                 return Err(PipelineError::validation("Validate", "no items"));
//!             }
//!             Ok(())
//!         })
//!     })
//!     .build();
//!
//! match pipeline.execute(Vec::new()).await {
//!     Ok(items) => println!("processed {} items", items.len()),
//!     Err(PipelineError::Validation { step_name, details }) => {
//!         eprintln!("Step {} rejected the input: {}", step_name, details);
//!     }
//!     Err(error) => eprintln!("Error: {}", error),
//! }
//! # }
//! ```

mod error;
mod middleware;
mod pipeline;
mod retry;
mod step;

pub mod order;
pub mod prelude;

pub use error::{ErrorKind, PipelineError};
pub use middleware::{compose, handler_fn, Deadline, ExceptionLogging, Handler, Logging, Middleware};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use retry::{run_step, FailureReport, FailureSink, RecordingSink, TracingSink};
pub use step::{FnStep, RetryPolicy, RetryPolicyError, Step, StepName};

/// Macro to define a step with minimal boilerplate
///
/// This macro creates a step struct with:
/// - `const NAME: &'static str` - compile-time step name
/// - `Debug` derive
/// - `Default` implementation
///
/// # Example
///
/// ```rust
/// use nagare::define_step;
///
/// define_step!(MyStep);
/// assert_eq!(MyStep::NAME, "MyStep");
///
/// define_step!(
///     /// Doc comments and other attributes are forwarded.
///     DocumentedStep
/// );
/// assert_eq!(DocumentedStep::NAME, "DocumentedStep");
/// ```
#[macro_export]
macro_rules! define_step {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name;

        impl $name {
            /// Step name as a compile-time constant
            #[allow(dead_code)]
            pub const NAME: &'static str = stringify!($name);
        }

        impl Default for $name {
            fn default() -> Self {
                Self
            }
        }
    };
}
