use crate::error::{ErrorKind, PipelineError};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Type-safe step name wrapper.
///
/// Step names are used for diagnostics only: log lines, failure reports and
/// error payloads. Two steps may share a name.
///
/// # Examples
///
/// ```
/// use nagare::StepName;
///
/// let name = StepName::new("ValidateOrder");
/// assert_eq!(name.as_str(), "ValidateOrder");
///
/// let name: StepName = "ReserveStock".into();
/// assert_eq!(name.to_string(), "ReserveStock");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepName(String);

impl StepName {
    /// Creates a new StepName
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a StepName from a type's name (extracts last segment)
    pub fn from_type_name<T: ?Sized>() -> Self {
        let full_name = std::any::type_name::<T>();
        let short_name = full_name.rsplit("::").next().unwrap_or("UnknownStep");
        Self::new(short_name)
    }

    /// Returns the step name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StepName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StepName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for StepName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Error returned when a [`RetryPolicy`] configuration is invalid.
///
/// # Examples
///
/// ```
/// use nagare::RetryPolicy;
///
/// let result = RetryPolicy::new(0, true);
/// assert_eq!(result.unwrap_err().0, "max_attempts must be at least 1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicyError(pub &'static str);

impl fmt::Display for RetryPolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for RetryPolicyError {}

impl From<RetryPolicyError> for PipelineError {
    fn from(error: RetryPolicyError) -> Self {
        PipelineError::Configuration(error.to_string())
    }
}

/// Retry policy for a single step.
///
/// A policy counts *attempts*, not retries: one attempt is one execution of
/// the step body, so `max_attempts = 3` means the body runs at most three
/// times. `max_attempts` is always at least 1.
///
/// Retries are immediate unless a delay is configured with
/// [`RetryPolicy::with_delay`].
///
/// # Examples
///
/// ```
/// use nagare::RetryPolicy;
/// use std::time::Duration;
///
/// // No retry (default): a single attempt.
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts(), 1);
/// assert!(!policy.is_enabled());
///
/// // Up to three attempts, 100ms apart.
/// let policy = RetryPolicy::attempts(3).with_delay(Duration::from_millis(100));
/// assert_eq!(policy.max_attempts(), 3);
/// assert_eq!(policy.delay(), Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RetryPolicySpec", into = "RetryPolicySpec")]
pub struct RetryPolicy {
    max_attempts: u32,
    enabled: bool,
    delay: Duration,
    retry_unexpected: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// Creates a policy from an explicit attempt budget and enabled flag.
    ///
    /// # Errors
    ///
    /// Returns [`RetryPolicyError`] if `max_attempts` is 0.
    pub fn new(max_attempts: u32, enabled: bool) -> Result<Self, RetryPolicyError> {
        if max_attempts == 0 {
            return Err(RetryPolicyError("max_attempts must be at least 1"));
        }
        Ok(Self {
            max_attempts,
            enabled,
            delay: Duration::ZERO,
            retry_unexpected: true,
        })
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            enabled: false,
            delay: Duration::ZERO,
            retry_unexpected: true,
        }
    }

    /// A retrying policy allowing up to `max_attempts` executions.
    ///
    /// A budget of 0 is normalized to 1.
    ///
    /// ```
    /// use nagare::RetryPolicy;
    ///
    /// assert_eq!(RetryPolicy::attempts(0).max_attempts(), 1);
    /// ```
    pub fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            enabled: true,
            delay: Duration::ZERO,
            retry_unexpected: true,
        }
    }

    /// Sets a fixed pause between attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Controls whether [`ErrorKind::Unexpected`] failures are retried.
    ///
    /// Defaults to `true`: unexpected failures retry like operation failures.
    pub fn retry_unexpected(mut self, retry: bool) -> Self {
        self.retry_unexpected = retry;
        self
    }

    /// Maximum number of executions of the step body.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether failed attempts may be retried at all.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Pause between attempts.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns `true` if a failure of `kind` is eligible for retry under this
    /// policy, ignoring the attempt budget.
    pub fn retries_kind(&self, kind: ErrorKind) -> bool {
        match kind {
            ErrorKind::Operation => true,
            ErrorKind::Unexpected => self.retry_unexpected,
            ErrorKind::Validation | ErrorKind::Timeout | ErrorKind::Configuration => false,
        }
    }

    /// Decides whether attempt number `attempt` (1-based), which just failed
    /// with `kind`, should be followed by another attempt.
    ///
    /// ```
    /// use nagare::{ErrorKind, RetryPolicy};
    ///
    /// let policy = RetryPolicy::attempts(3);
    /// assert!(policy.should_retry(1, ErrorKind::Operation));
    /// assert!(policy.should_retry(2, ErrorKind::Operation));
    /// assert!(!policy.should_retry(3, ErrorKind::Operation));
    /// assert!(!policy.should_retry(1, ErrorKind::Validation));
    /// ```
    pub fn should_retry(&self, attempt: u32, kind: ErrorKind) -> bool {
        self.enabled && attempt < self.max_attempts && self.retries_kind(kind)
    }
}

/// Serialized form of [`RetryPolicy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RetryPolicySpec {
    max_attempts: u32,
    enabled: bool,
    delay_ms: u64,
    retry_unexpected: bool,
}

impl Default for RetryPolicySpec {
    fn default() -> Self {
        RetryPolicy::none().into()
    }
}

impl From<RetryPolicy> for RetryPolicySpec {
    fn from(policy: RetryPolicy) -> Self {
        Self {
            max_attempts: policy.max_attempts,
            enabled: policy.enabled,
            delay_ms: u64::try_from(policy.delay.as_millis()).unwrap_or(u64::MAX),
            retry_unexpected: policy.retry_unexpected,
        }
    }
}

impl TryFrom<RetryPolicySpec> for RetryPolicy {
    type Error = RetryPolicyError;

    fn try_from(spec: RetryPolicySpec) -> Result<Self, Self::Error> {
        Ok(RetryPolicy::new(spec.max_attempts, spec.enabled)?
            .with_delay(Duration::from_millis(spec.delay_ms))
            .retry_unexpected(spec.retry_unexpected))
    }
}

/// A pipeline step that can be executed asynchronously.
///
/// A step borrows the payload mutably for the duration of one attempt and
/// either leaves it transformed (`Ok(())`) or reports a failure. Retrying is
/// not the step's job: the pipeline re-runs `execute` according to
/// [`Step::retry_policy`].
///
/// # Examples
///
/// ```
/// use nagare::prelude::*;
/// use async_trait::async_trait;
///
/// define_step!(DoubleStep);
///
/// #[async_trait]
/// impl Step<u64> for DoubleStep {
///     async fn execute(&self, value: &mut u64) -> Result<(), PipelineError> {
///         *value *= 2;
///         Ok(())
///     }
///
///     fn retry_policy(&self) -> RetryPolicy {
///         RetryPolicy::attempts(3)
///     }
/// }
///
/// assert_eq!(DoubleStep.name().as_str(), "DoubleStep");
/// ```
#[async_trait]
pub trait Step<T: Send>: Send + Sync {
    /// Executes one attempt of the step body.
    ///
    /// A failed attempt may leave partial changes in `value`; steps that are
    /// retried should tolerate being re-run on such a value.
    async fn execute(&self, value: &mut T) -> Result<(), PipelineError>;

    /// Returns the step name.
    ///
    /// By default, uses the type name. Override to provide a custom name.
    fn name(&self) -> StepName {
        StepName::from_type_name::<Self>()
    }

    /// Returns the retry policy. Default: no retry.
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }

    /// Formats step information for debugging.
    fn fmt_debug(&self) -> String {
        format!("Step '{}' (policy: {:?})", self.name(), self.retry_policy())
    }
}

/// A step assembled from a name, a retry policy and an async closure.
///
/// ```
/// use nagare::{FnStep, RetryPolicy, Step};
///
/// let step = FnStep::new("Increment", RetryPolicy::none(), |value: &mut u32| {
///     Box::pin(async move {
///         *value += 1;
///         Ok(())
///     })
/// });
/// assert_eq!(step.name().as_str(), "Increment");
/// ```
pub struct FnStep<F> {
    name: StepName,
    policy: RetryPolicy,
    body: F,
}

impl<F> FnStep<F> {
    /// Creates a step from its parts.
    pub fn new<T>(name: impl Into<StepName>, policy: RetryPolicy, body: F) -> Self
    where
        T: Send,
        F: for<'a> Fn(&'a mut T) -> BoxFuture<'a, Result<(), PipelineError>> + Send + Sync,
    {
        Self {
            name: name.into(),
            policy,
            body,
        }
    }
}

impl<F> fmt::Debug for FnStep<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish()
    }
}

#[async_trait]
impl<T, F> Step<T> for FnStep<F>
where
    T: Send,
    F: for<'a> Fn(&'a mut T) -> BoxFuture<'a, Result<(), PipelineError>> + Send + Sync,
{
    async fn execute(&self, value: &mut T) -> Result<(), PipelineError> {
        (self.body)(value).await
    }

    fn name(&self) -> StepName {
        self.name.clone()
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.policy.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_step;

    define_step!(AppendStep);

    #[async_trait]
    impl Step<String> for AppendStep {
        async fn execute(&self, value: &mut String) -> Result<(), PipelineError> {
            value.push_str("-appended");
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_step_execution() {
        let step = AppendStep;
        let mut value = "start".to_string();

        let result = step.execute(&mut value).await;
        assert!(result.is_ok());
        assert_eq!(value, "start-appended");
    }

    #[test]
    fn test_step_name() {
        let step = AppendStep;
        assert_eq!(step.name(), StepName::new("AppendStep"));
        assert_eq!(AppendStep::NAME, "AppendStep");
    }

    #[test]
    fn test_step_default_policy() {
        let step = AppendStep;
        assert_eq!(step.retry_policy(), RetryPolicy::none());
        assert!(step.fmt_debug().starts_with("Step 'AppendStep'"));
    }

    #[tokio::test]
    async fn test_fn_step() {
        let step = FnStep::new("Square", RetryPolicy::attempts(2), |value: &mut i64| {
            Box::pin(async move {
                *value *= *value;
                Ok(())
            })
        });

        let mut value = 7;
        step.execute(&mut value).await.unwrap();
        assert_eq!(value, 49);
        assert_eq!(step.name().as_str(), "Square");
        assert_eq!(step.retry_policy().max_attempts(), 2);
    }

    #[test]
    fn test_retry_policy_none() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.max_attempts(), 1);
        assert!(!policy.is_enabled());
        assert!(!policy.should_retry(1, ErrorKind::Operation));
        assert_eq!(policy.delay(), Duration::ZERO);
    }

    #[test]
    fn test_retry_policy_validation() {
        assert_eq!(
            RetryPolicy::new(0, true),
            Err(RetryPolicyError("max_attempts must be at least 1"))
        );
        assert!(RetryPolicy::new(0, false).is_err());

        let policy = RetryPolicy::new(4, false).unwrap();
        assert_eq!(policy.max_attempts(), 4);
        // disabled policies never retry, whatever the budget
        assert!(!policy.should_retry(1, ErrorKind::Operation));
    }

    #[test]
    fn test_retry_policy_single_attempt_enabled() {
        let policy = RetryPolicy::new(1, true).unwrap();
        assert!(!policy.should_retry(1, ErrorKind::Operation));
        assert!(!policy.should_retry(5, ErrorKind::Operation));
    }

    #[test]
    fn test_retry_policy_kinds() {
        let policy = RetryPolicy::attempts(5);
        assert!(policy.should_retry(1, ErrorKind::Operation));
        assert!(policy.should_retry(1, ErrorKind::Unexpected));
        assert!(!policy.should_retry(1, ErrorKind::Validation));
        assert!(!policy.should_retry(1, ErrorKind::Timeout));

        let policy = policy.retry_unexpected(false);
        assert!(!policy.should_retry(1, ErrorKind::Unexpected));
        assert!(policy.should_retry(1, ErrorKind::Operation));
    }

    #[test]
    fn test_retry_policy_deserialize() {
        let policy: RetryPolicy =
            serde_json::from_str(r#"{"max_attempts": 3, "enabled": true, "delay_ms": 250}"#)
                .unwrap();
        assert_eq!(policy.max_attempts(), 3);
        assert!(policy.is_enabled());
        assert_eq!(policy.delay(), Duration::from_millis(250));

        let policy: RetryPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy, RetryPolicy::none());

        let result = serde_json::from_str::<RetryPolicy>(r#"{"max_attempts": 0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_retry_policy_error_into_pipeline_error() {
        let error: PipelineError = RetryPolicyError("max_attempts must be at least 1").into();
        assert_eq!(
            error,
            PipelineError::Configuration("max_attempts must be at least 1".to_string())
        );
    }

    #[test]
    fn test_step_name_from_type_name() {
        struct Nested;
        assert_eq!(StepName::from_type_name::<Nested>().as_str(), "Nested");
    }
}
