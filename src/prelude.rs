//! Commonly used types and traits

pub use crate::define_step;
pub use crate::error::PipelineError;
pub use crate::middleware::{handler_fn, Deadline, ExceptionLogging, Handler, Logging, Middleware};
pub use crate::pipeline::Pipeline;
pub use crate::step::{RetryPolicy, Step, StepName};
