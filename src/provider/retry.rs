// src/provider/retry.rs — Bounded retry with exponential backoff
//
// Wraps any ModelProvider with automatic retry on transient failures.
// Retries: rate limits (429), server errors (5xx), timeouts, connection resets.
// Does NOT retry: bad request (400), auth errors (401, 403), unparsable bodies.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, ModelProvider};
use crate::infra::config::GatewayConfig;
use crate::infra::errors::DevflowError;

const MAX_RETRIES: u32 = 4;
const INITIAL_DELAY_MS: u64 = 5_000;
const BACKOFF_FACTOR: f64 = 2.0;
const MAX_DELAY_MS: u64 = 30_000;
const JITTER_FRACTION: f64 = 0.2;
const MIN_DELAY_MS: f64 = 10.0;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt; total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            initial_delay: Duration::from_millis(INITIAL_DELAY_MS),
            backoff_factor: BACKOFF_FACTOR,
            max_delay: Duration::from_millis(MAX_DELAY_MS),
            jitter_fraction: JITTER_FRACTION,
        }
    }
}

impl From<&GatewayConfig> for RetryConfig {
    fn from(cfg: &GatewayConfig) -> Self {
        Self {
            max_retries: cfg.tries.saturating_sub(1),
            initial_delay: Duration::from_millis(cfg.retry_delay_ms),
            backoff_factor: cfg.backoff_factor,
            max_delay: Duration::from_millis(cfg.max_retry_delay_ms),
            jitter_fraction: JITTER_FRACTION,
        }
    }
}

impl RetryConfig {
    /// No waiting between attempts. Used by tests and dry runs.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::ZERO,
            backoff_factor: 1.0,
            max_delay: Duration::ZERO,
            jitter_fraction: 0.0,
        }
    }
}

/// A provider wrapper that adds retry with exponential backoff.
pub struct RetryProvider {
    inner: Arc<dyn ModelProvider>,
    config: RetryConfig,
}

impl RetryProvider {
    pub fn new(inner: Arc<dyn ModelProvider>) -> Self {
        Self {
            inner,
            config: RetryConfig::default(),
        }
    }

    pub fn with_config(inner: Arc<dyn ModelProvider>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Calculate the delay for a given retry attempt (0-indexed).
    fn delay_for_attempt(&self, attempt: u32, rate_limit_delay: Option<Duration>) -> Duration {
        if let Some(rl_delay) = rate_limit_delay {
            return rl_delay + Duration::from_millis(100);
        }

        if self.config.initial_delay.is_zero() {
            return Duration::ZERO;
        }

        let base_ms = self.config.initial_delay.as_millis() as f64
            * self.config.backoff_factor.powi(attempt as i32);
        let capped_ms = base_ms.min(self.config.max_delay.as_millis() as f64);

        let jitter = deterministic_jitter(attempt, self.config.jitter_fraction);
        let final_ms = (capped_ms * jitter).max(MIN_DELAY_MS);

        Duration::from_millis(final_ms as u64)
    }
}

/// Extract rate-limit retry delay from the error, if available.
fn rate_limit_delay(error: &DevflowError) -> Option<Duration> {
    match error {
        DevflowError::RateLimited { retry_after_ms, .. } if *retry_after_ms > 0 => {
            Some(Duration::from_millis(*retry_after_ms))
        }
        _ => None,
    }
}

/// Deterministic jitter multiplier in [1 - fraction, 1 + fraction].
fn deterministic_jitter(attempt: u32, fraction: f64) -> f64 {
    let hash = (attempt.wrapping_mul(2654435761)) as f64 / u32::MAX as f64;
    1.0 + fraction * (2.0 * hash - 1.0)
}

#[async_trait]
impl ModelProvider for RetryProvider {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, DevflowError> {
        let attempts = self.config.max_retries + 1;

        for attempt in 0..attempts {
            match self.inner.chat(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if !e.is_retriable() => return Err(e),
                Err(e) if attempt + 1 == attempts => {
                    tracing::error!(
                        provider = self.inner.id(),
                        attempts,
                        "Max retries reached: {}",
                        e
                    );
                    return Err(DevflowError::RetriesExhausted {
                        provider: self.inner.id().to_string(),
                        attempts,
                        last_error: e.to_string(),
                    });
                }
                Err(e) => {
                    let delay = self.delay_for_attempt(attempt, rate_limit_delay(&e));

                    tracing::warn!(
                        provider = self.inner.id(),
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Model query error, retrying: {}",
                        e
                    );

                    tokio::time::sleep(delay).await;
                }
            }
        }

        // Only reachable with zero attempts, which `max_retries + 1` rules out.
        Err(DevflowError::RetriesExhausted {
            provider: self.inner.id().to_string(),
            attempts,
            last_error: "no attempt made".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{StopReason, TokenUsage};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails `failures` times with the given retriability, then succeeds.
    struct FlakyProvider {
        failures: u32,
        retriable: bool,
        calls: AtomicU32,
    }

    impl FlakyProvider {
        fn new(failures: u32, retriable: bool) -> Self {
            Self {
                failures,
                retriable,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ModelProvider for FlakyProvider {
        fn id(&self) -> &str {
            "flaky"
        }
        fn name(&self) -> &str {
            "Flaky"
        }
        async fn chat(&self, _req: ChatRequest) -> Result<ChatResponse, DevflowError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(DevflowError::Provider {
                    provider: "flaky".into(),
                    message: format!("failure #{}", n + 1),
                    retriable: self.retriable,
                });
            }
            Ok(ChatResponse {
                content: "ok".into(),
                usage: TokenUsage::new(1, 1),
                stop_reason: StopReason::EndTurn,
            })
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let inner = Arc::new(FlakyProvider::new(2, true));
        let p = RetryProvider::with_config(inner.clone(), RetryConfig::immediate(4));
        let resp = p.chat(ChatRequest::default()).await.unwrap();
        assert_eq!(resp.content, "ok");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let inner = Arc::new(FlakyProvider::new(10, true));
        let p = RetryProvider::with_config(inner.clone(), RetryConfig::immediate(4));
        let err = p.chat(ChatRequest::default()).await.unwrap_err();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 5);
        match err {
            DevflowError::RetriesExhausted {
                attempts,
                last_error,
                ..
            } => {
                assert_eq!(attempts, 5);
                assert!(last_error.contains("failure #5"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_non_retriable_fails_fast() {
        let inner = Arc::new(FlakyProvider::new(10, false));
        let p = RetryProvider::with_config(inner.clone(), RetryConfig::immediate(4));
        let err = p.chat(ChatRequest::default()).await.unwrap_err();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, DevflowError::Provider { .. }));
    }

    #[test]
    fn test_rate_limit_delay_extraction() {
        let err = DevflowError::RateLimited {
            provider: "test".into(),
            retry_after_ms: 3000,
        };
        assert_eq!(rate_limit_delay(&err), Some(Duration::from_millis(3000)));

        let zero = DevflowError::RateLimited {
            provider: "test".into(),
            retry_after_ms: 0,
        };
        assert!(rate_limit_delay(&zero).is_none());
    }

    #[test]
    fn test_delay_for_attempt_exponential() {
        let provider = RetryProvider::new(Arc::new(FlakyProvider::new(0, true)));
        let d0 = provider.delay_for_attempt(0, None);
        let d1 = provider.delay_for_attempt(1, None);
        let d2 = provider.delay_for_attempt(2, None);

        // ~5s, ~10s, ~20s within jitter bounds
        assert!(d0.as_millis() >= 4000 && d0.as_millis() <= 6000);
        assert!(d1.as_millis() >= 8000 && d1.as_millis() <= 12000);
        assert!(d2.as_millis() >= 16000 && d2.as_millis() <= 24000);
    }

    #[test]
    fn test_delay_capped_at_max() {
        let provider = RetryProvider::new(Arc::new(FlakyProvider::new(0, true)));
        let d = provider.delay_for_attempt(10, None);
        assert!(d.as_millis() <= 36_000);
    }

    #[test]
    fn test_delay_uses_rate_limit_hint() {
        let provider = RetryProvider::new(Arc::new(FlakyProvider::new(0, true)));
        let d = provider.delay_for_attempt(0, Some(Duration::from_millis(10_000)));
        assert_eq!(d.as_millis(), 10_100);
    }

    #[test]
    fn test_immediate_has_no_delay() {
        let provider = RetryProvider::with_config(
            Arc::new(FlakyProvider::new(0, true)),
            RetryConfig::immediate(2),
        );
        assert_eq!(provider.delay_for_attempt(3, None), Duration::ZERO);
    }

    #[test]
    fn test_deterministic_jitter_range() {
        for attempt in 0..20 {
            let j = deterministic_jitter(attempt, 0.2);
            assert!((0.8..=1.2).contains(&j), "jitter {j} out of range");
        }
        assert_eq!(deterministic_jitter(5, 0.2), deterministic_jitter(5, 0.2));
    }

    #[test]
    fn test_from_gateway_config() {
        let cfg = RetryConfig::from(&GatewayConfig::default());
        assert_eq!(cfg.max_retries, 4);
        assert_eq!(cfg.initial_delay, Duration::from_millis(5000));
        assert_eq!(cfg.max_delay, Duration::from_millis(30000));
    }

    #[test]
    fn test_default_config() {
        let cfg = RetryConfig::default();
        assert_eq!(cfg.max_retries, 4);
        assert_eq!(cfg.backoff_factor, 2.0);
        assert_eq!(cfg.jitter_fraction, 0.2);
    }
}
