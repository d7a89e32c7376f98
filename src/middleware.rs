//! Middleware composition around the step sequence.
//!
//! A [`Handler`] is "the rest of the pipeline from here". A [`Middleware`]
//! turns the next handler into a wrapped one, and [`compose`] folds a list of
//! middleware around an innermost handler so that the first-registered
//! middleware ends up outermost. The last-registered middleware sits closest
//! to the steps and is the first to observe a failure.

use crate::error::PipelineError;
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// The remaining pipeline work, consumed by a single invocation.
pub type Handler<T> = Box<dyn FnOnce(T) -> BoxFuture<'static, Result<T, PipelineError>> + Send>;

/// Boxes an async closure into a [`Handler`].
///
/// ```
/// use nagare::handler_fn;
///
/// # #[tokio::main]
/// # async fn main() {
/// let handler = handler_fn(|value: u32| async move { Ok(value + 1) });
/// assert_eq!(handler(1).await, Ok(2));
/// # }
/// ```
pub fn handler_fn<T, F, Fut>(f: F) -> Handler<T>
where
    F: FnOnce(T) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, PipelineError>> + Send + 'static,
{
    Box::new(move |input| f(input).boxed())
}

/// A wrapper adding behavior around the whole step sequence.
///
/// Implementations may run code before calling `next`, after it returns, or
/// when it fails. A middleware that observes a failure is expected to return
/// it unchanged; one that suppresses failures must say so in its docs.
///
/// Any `Fn(Handler<T>) -> Handler<T>` closure is a middleware:
///
/// ```
/// use nagare::{handler_fn, Handler, Middleware};
///
/// # #[tokio::main]
/// # async fn main() {
/// let add_one = |next: Handler<u32>| handler_fn(move |value: u32| next(value + 1));
/// let wrapped = add_one.wrap(handler_fn(|value: u32| async move { Ok(value * 10) }));
///
/// assert_eq!(wrapped(1).await, Ok(20));
/// # }
/// ```
pub trait Middleware<T>: Send + Sync {
    /// Wraps `next`, returning the handler that replaces it.
    fn wrap(&self, next: Handler<T>) -> Handler<T>;
}

impl<T, F> Middleware<T> for F
where
    F: Fn(Handler<T>) -> Handler<T> + Send + Sync,
{
    fn wrap(&self, next: Handler<T>) -> Handler<T> {
        self(next)
    }
}

/// Wraps `handler` with every middleware in `middleware`.
///
/// The list is folded in reverse registration order, so `middleware[0]` is
/// outermost: it is the first to see the input and the last to see the result
/// or failure. The last entry wraps `handler` directly and catches first.
pub fn compose<T, M>(handler: Handler<T>, middleware: &[M]) -> Handler<T>
where
    M: AsRef<dyn Middleware<T>>,
{
    middleware
        .iter()
        .rev()
        .fold(handler, |next, m| m.as_ref().wrap(next))
}

/// Logs any failure raised inside it and re-raises it unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExceptionLogging;

impl<T: Send + 'static> Middleware<T> for ExceptionLogging {
    fn wrap(&self, next: Handler<T>) -> Handler<T> {
        handler_fn(move |input: T| async move {
            next(input).await.map_err(|e| {
                error!(kind = %e.kind(), "Pipeline error: {}", e);
                e
            })
        })
    }
}

/// Logs entry to and exit from the wrapped handler with its elapsed time.
#[derive(Debug, Clone)]
pub struct Logging {
    label: String,
}

impl Logging {
    /// Creates a logging middleware whose log lines carry `label`.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Default for Logging {
    fn default() -> Self {
        Self::new("pipeline")
    }
}

impl<T: Send + 'static> Middleware<T> for Logging {
    fn wrap(&self, next: Handler<T>) -> Handler<T> {
        let label = self.label.clone();
        handler_fn(move |input: T| async move {
            debug!("Entering '{}'", label);
            let start = Instant::now();
            let result = next(input).await;
            match &result {
                Ok(_) => info!("'{}' completed in {:?}", label, start.elapsed()),
                Err(e) => warn!("'{}' failed after {:?}: {}", label, start.elapsed(), e),
            }
            result
        })
    }
}

/// Bounds the wrapped handler with a deadline.
///
/// When the deadline expires the inner work is dropped and
/// [`PipelineError::Timeout`] is returned. The payload owned by the inner
/// work is lost with it.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    limit: Duration,
}

impl Deadline {
    /// Creates a deadline of `limit` measured from entry into the middleware.
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }
}

impl<T: Send + 'static> Middleware<T> for Deadline {
    fn wrap(&self, next: Handler<T>) -> Handler<T> {
        let limit = self.limit;
        handler_fn(move |input: T| async move {
            match tokio::time::timeout(limit, next(input)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Pipeline exceeded its deadline of {:?}", limit);
                    Err(PipelineError::Timeout { limit })
                }
            }
        })
    }
}
