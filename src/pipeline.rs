use crate::error::PipelineError;
use crate::middleware::{compose, handler_fn, Handler, Middleware};
use crate::retry::{run_step, FailureSink, TracingSink};
use crate::step::{FnStep, RetryPolicy, Step, StepName};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

type StepList<T> = Arc<Vec<Arc<dyn Step<T>>>>;

/// An ordered list of steps wrapped by an ordered list of middleware.
///
/// A pipeline is immutable once built and keeps no state between runs, so the
/// same instance can be executed any number of times, including concurrently
/// from clones.
pub struct Pipeline<T: Send> {
    steps: StepList<T>,
    middleware: Arc<Vec<Arc<dyn Middleware<T>>>>,
    sink: Arc<dyn FailureSink>,
}

impl<T: Send> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Self {
            steps: Arc::clone(&self.steps),
            middleware: Arc::clone(&self.middleware),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<T: Send> fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.step_names())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

impl<T: Send + 'static> Pipeline<T> {
    /// Creates a new pipeline builder.
    pub fn builder() -> PipelineBuilder<T> {
        PipelineBuilder::new()
    }

    /// Runs `input` through the middleware chain and every step.
    ///
    /// Returns the fully transformed value, or the first failure no step
    /// recovered from, exactly as the step (or middleware) produced it.
    pub async fn execute(&self, input: T) -> Result<T, PipelineError> {
        debug!(
            "Executing pipeline with {} steps and {} middleware",
            self.steps.len(),
            self.middleware.len()
        );
        let handler = compose(self.sequencer(), self.middleware.as_slice());
        handler(input).await
    }

    fn sequencer(&self) -> Handler<T> {
        let steps = Arc::clone(&self.steps);
        let sink = Arc::clone(&self.sink);
        handler_fn(move |input| run_steps(steps, sink, input))
    }
}

impl<T: Send> Pipeline<T> {
    /// Returns the step names in execution order.
    pub fn step_names(&self) -> Vec<StepName> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Returns the number of registered steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Returns the number of registered middleware.
    pub fn middleware_count(&self) -> usize {
        self.middleware.len()
    }
}

/// Runs every step in registration order, stopping at the first failure.
async fn run_steps<T: Send>(
    steps: StepList<T>,
    sink: Arc<dyn FailureSink>,
    mut value: T,
) -> Result<T, PipelineError> {
    for step in steps.iter() {
        run_step(step.as_ref(), &mut value, sink.as_ref()).await?;
    }
    Ok(value)
}

/// Builder for constructing [`Pipeline`] instances.
///
/// ```
/// use nagare::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() {
/// let pipeline = Pipeline::builder()
///     .use_middleware(ExceptionLogging)
///     .add_fn("Trim", RetryPolicy::none(), |s: &mut String| {
///         Box::pin(async move {
///             *s = s.trim().to_string();
///             Ok(())
///         })
///     })
///     .add_fn("Upper", RetryPolicy::none(), |s: &mut String| {
///         Box::pin(async move {
///             *s = s.to_uppercase();
///             Ok(())
///         })
///     })
///     .build();
///
/// let output = pipeline.execute("  nagare ".to_string()).await;
/// assert_eq!(output, Ok("NAGARE".to_string()));
/// # }
/// ```
pub struct PipelineBuilder<T: Send> {
    steps: Vec<Arc<dyn Step<T>>>,
    middleware: Vec<Arc<dyn Middleware<T>>>,
    sink: Option<Arc<dyn FailureSink>>,
}

impl<T: Send> Default for PipelineBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> PipelineBuilder<T> {
    /// Creates a new empty pipeline builder.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            middleware: Vec::new(),
            sink: None,
        }
    }

    /// Appends a step.
    pub fn add_step<S: Step<T> + 'static>(mut self, step: S) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// Appends a step shared with other pipelines.
    pub fn add_shared(mut self, step: Arc<dyn Step<T>>) -> Self {
        self.steps.push(step);
        self
    }

    /// Appends a step built from a name, a retry policy and an async closure.
    pub fn add_fn<F>(self, name: impl Into<StepName>, policy: RetryPolicy, body: F) -> Self
    where
        F: for<'a> Fn(&'a mut T) -> BoxFuture<'a, Result<(), PipelineError>>
            + Send
            + Sync
            + 'static,
    {
        self.add_step(FnStep::new(name, policy, body))
    }

    /// Registers a middleware. Earlier registrations wrap later ones, so the
    /// first middleware registered is the outermost.
    pub fn use_middleware<M: Middleware<T> + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Sets where failed attempts are reported. Default: [`TracingSink`].
    pub fn with_failure_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds the pipeline.
    pub fn build(self) -> Pipeline<T> {
        Pipeline {
            steps: Arc::new(self.steps),
            middleware: Arc::new(self.middleware),
            sink: self.sink.unwrap_or_else(|| Arc::new(TracingSink)),
        }
    }

    /// Builds a pipeline from the current registrations and executes it once.
    ///
    /// The builder itself is left untouched and can keep accumulating.
    pub async fn execute(&self, input: T) -> Result<T, PipelineError>
    where
        T: 'static,
    {
        self.snapshot().execute(input).await
    }

    fn snapshot(&self) -> Pipeline<T> {
        Pipeline {
            steps: Arc::new(self.steps.clone()),
            middleware: Arc::new(self.middleware.clone()),
            sink: self
                .sink
                .clone()
                .unwrap_or_else(|| Arc::new(TracingSink)),
        }
    }
}
