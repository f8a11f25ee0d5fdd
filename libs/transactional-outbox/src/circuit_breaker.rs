//! Circuit breaker guarding Kafka publish calls.
//!
//! State transitions:
//! - Closed → Open: 5 consecutive failures (configurable)
//! - Open → HalfOpen: after the open timeout (30 s)
//! - HalfOpen → Closed: 2 consecutive successes
//! - HalfOpen → Open: any failure
//!
//! While Open, calls fail fast with [`CircuitBreakerError::Open`] and no
//! bus traffic is produced.

use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, requests pass through
    Closed,
    /// Circuit is open, requests fail fast
    Open,
    /// Testing if the broker recovered
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failure count that opens the circuit
    pub failure_threshold: u32,
    /// Consecutive successes in HalfOpen that close the circuit
    pub success_threshold: u32,
    /// Time to wait in Open before probing with HalfOpen
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Arc<RwLock<BreakerState>>,
}

struct BreakerState {
    current: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError {
    #[error("circuit breaker is open - failing fast")]
    Open,
    #[error("call failed: {0}")]
    CallFailed(String),
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(BreakerState {
                current: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
            })),
            config,
        }
    }

    /// Execute a future with circuit breaker protection.
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, CircuitBreakerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        if self.should_reject_call() {
            return Err(CircuitBreakerError::Open);
        }

        match f().await {
            Ok(result) => {
                self.record_success();
                Ok(result)
            }
            Err(e) => {
                self.record_failure();
                Err(CircuitBreakerError::CallFailed(e.to_string()))
            }
        }
    }

    fn should_reject_call(&self) -> bool {
        let mut state = self.state.write();

        match state.current {
            CircuitState::Open => {
                if let Some(opened_at) = state.opened_at {
                    if opened_at.elapsed() >= self.config.open_timeout {
                        info!("Circuit breaker: Open → HalfOpen");
                        state.current = CircuitState::HalfOpen;
                        state.consecutive_successes = 0;
                        state.consecutive_failures = 0;
                        false
                    } else {
                        true
                    }
                } else {
                    true
                }
            }
            CircuitState::HalfOpen | CircuitState::Closed => false,
        }
    }

    fn record_success(&self) {
        let mut state = self.state.write();

        state.consecutive_successes += 1;
        state.consecutive_failures = 0;

        if state.current == CircuitState::HalfOpen
            && state.consecutive_successes >= self.config.success_threshold
        {
            info!("Circuit breaker: HalfOpen → Closed");
            state.current = CircuitState::Closed;
            state.consecutive_successes = 0;
        }
    }

    fn record_failure(&self) {
        let mut state = self.state.write();

        state.consecutive_failures += 1;
        state.consecutive_successes = 0;

        match state.current {
            CircuitState::Closed => {
                if state.consecutive_failures >= self.config.failure_threshold {
                    warn!(
                        failures = state.consecutive_failures,
                        "Circuit breaker: Closed → Open"
                    );
                    state.current = CircuitState::Open;
                    state.opened_at = Some(Instant::now());
                }
            }
            CircuitState::HalfOpen => {
                warn!("Circuit breaker: HalfOpen → Open (probe failed)");
                state.current = CircuitState::Open;
                state.opened_at = Some(Instant::now());
            }
            CircuitState::Open => {}
        }
    }

    /// Current circuit state (for monitoring).
    pub fn state(&self) -> CircuitState {
        self.state.read().current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(timeout: Duration) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout: timeout,
        })
    }

    async fn fail(cb: &CircuitBreaker) {
        let _ = cb.call(|| async { Err::<(), _>("broker down") }).await;
    }

    async fn succeed(cb: &CircuitBreaker) {
        let _ = cb.call(|| async { Ok::<_, String>(()) }).await;
    }

    #[tokio::test]
    async fn test_closed_to_open_on_five_consecutive_failures() {
        let cb = breaker(Duration::from_secs(30));

        for _ in 0..4 {
            fail(&cb).await;
        }
        assert_eq!(cb.state(), CircuitState::Closed);

        fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);

        // Calls now fail fast
        let result = cb.call(|| async { Ok::<_, String>(()) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::Open)));
    }

    #[tokio::test]
    async fn test_success_resets_failure_streak() {
        let cb = breaker(Duration::from_secs(30));

        for _ in 0..4 {
            fail(&cb).await;
        }
        succeed(&cb).await;
        for _ in 0..4 {
            fail(&cb).await;
        }
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_open_to_halfopen_after_timeout() {
        let cb = breaker(Duration::from_millis(50));

        for _ in 0..5 {
            fail(&cb).await;
        }
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(80)).await;

        succeed(&cb).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);
    }

    #[tokio::test]
    async fn test_halfopen_to_closed_after_two_successes() {
        let cb = breaker(Duration::from_millis(50));

        for _ in 0..5 {
            fail(&cb).await;
        }
        tokio::time::sleep(Duration::from_millis(80)).await;

        succeed(&cb).await;
        succeed(&cb).await;
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_halfopen_failure_reopens() {
        let cb = breaker(Duration::from_millis(50));

        for _ in 0..5 {
            fail(&cb).await;
        }
        tokio::time::sleep(Duration::from_millis(80)).await;

        succeed(&cb).await;
        fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);
    }
}
