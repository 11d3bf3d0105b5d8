use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use stepup_core::gateway::{
    AcsResultResponse, EnrollmentResponse, GatewayClient, GatewaySession, OrderTotals,
    ThreeDsConfig,
};
use stepup_core::GatewayError;
use stepup_shared::Masked;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircuitState {
    Closed,   // Normal operation
    Open,     // Failure detected, failing fast
    HalfOpen, // Testing if the gateway is back
}

pub struct CircuitBreaker {
    pub name: String,
    pub state: RwLock<CircuitState>,
    pub failure_count: AtomicUsize,
    pub failure_threshold: usize,
    pub reset_timeout: Duration,
    pub last_failure: RwLock<Option<Instant>>,
}

impl CircuitBreaker {
    pub fn new(name: &str, threshold: usize, timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicUsize::new(0),
            failure_threshold: threshold.max(1),
            reset_timeout: timeout,
            last_failure: RwLock::new(None),
        }
    }

    pub async fn current(&self) -> CircuitState {
        *self.state.read().await
    }

    pub async fn check(&self) -> bool {
        let state = *self.state.read().await;
        if state == CircuitState::Closed {
            return true;
        }

        if state == CircuitState::Open {
            let last_fail = *self.last_failure.read().await;
            if let Some(instant) = last_fail {
                if instant.elapsed() >= self.reset_timeout {
                    let mut s = self.state.write().await;
                    *s = CircuitState::HalfOpen;
                    tracing::info!("Circuit Breaker [{}] moving to Half-Open", self.name);
                    return true;
                }
            }
            return false;
        }

        // Half-Open lets a trial call through
        true
    }

    pub async fn record_success(&self) {
        let mut state = self.state.write().await;
        if *state == CircuitState::HalfOpen {
            *state = CircuitState::Closed;
            self.failure_count.store(0, Ordering::SeqCst);
            tracing::info!("Circuit Breaker [{}] recovered to Closed", self.name);
        } else if *state == CircuitState::Closed {
            self.failure_count.store(0, Ordering::SeqCst);
        }
    }

    pub async fn record_failure(&self) {
        let count = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.write().await;

        if count >= self.failure_threshold || *state == CircuitState::HalfOpen {
            *state = CircuitState::Open;
            let mut last = self.last_failure.write().await;
            *last = Some(Instant::now());
            tracing::error!("Circuit Breaker [{}] TRIPPED to Open. Failures: {}", self.name, count);
        }
    }
}

/// Wraps a gateway client so a failing gateway is short-circuited instead of
/// holding every checkout for the full timeout.
///
/// Each call is bounded by `call_timeout`; an expired call counts as a failure.
/// Only transient failures count. A decline is a successful call and a 4xx
/// rejection says nothing about gateway health.
pub struct CircuitBreakerGateway<G> {
    inner: G,
    breaker: CircuitBreaker,
    call_timeout: Duration,
}

impl<G: GatewayClient> CircuitBreakerGateway<G> {
    pub fn new(inner: G, breaker: CircuitBreaker, call_timeout: Duration) -> Self {
        Self {
            inner,
            breaker,
            call_timeout,
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn guarded<T, F>(&self, call: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        if !self.breaker.check().await {
            return Err(GatewayError::CircuitOpen(self.breaker.name.clone()));
        }

        let result = match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.call_timeout)),
        };
        match &result {
            Ok(_) => self.breaker.record_success().await,
            Err(e) if e.is_transient() => self.breaker.record_failure().await,
            Err(_) => {}
        }
        result
    }
}

#[async_trait]
impl<G: GatewayClient> GatewayClient for CircuitBreakerGateway<G> {
    async fn check_3ds_enrollment(
        &self,
        three_ds: &ThreeDsConfig,
        order: &OrderTotals,
        session: &GatewaySession,
    ) -> Result<EnrollmentResponse, GatewayError> {
        self.guarded(self.inner.check_3ds_enrollment(three_ds, order, session))
            .await
    }

    async fn process_acs_result(
        &self,
        authentication_id: &str,
        pa_res: &Masked<String>,
    ) -> Result<AcsResultResponse, GatewayError> {
        self.guarded(self.inner.process_acs_result(authentication_id, pa_res))
            .await
    }
}
