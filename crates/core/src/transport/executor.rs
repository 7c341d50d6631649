//! Webservice request executor with retry and exponential backoff

use std::sync::Arc;
use std::time::Duration;

use dtelink_domain::{
    AttemptOutcome, ConnectionOptions, DteLinkError, Endpoint, FailureKind, RawResponse,
    RequestAttempt, Result, SoapPayload,
};
use tracing::{debug, warn};
use uuid::Uuid;

use super::ports::SoapTransport;

/// Upper bound on the backoff exponent so the multiplier cannot overflow.
const MAX_BACKOFF_SHIFT: u32 = 16;

/// Attempt budget and backoff schedule for one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` counts the initial try; it is raised to at least one.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), base_delay }
    }

    /// Policy from the (capped) retry budget and backoff base of `options`.
    pub fn from_options(options: &ConnectionOptions) -> Self {
        Self::new(options.retry_budget(), options.backoff_base())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Wait after the 1-based `attempt` failed: `base * 2^(attempt - 1)`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.base_delay.saturating_mul(1u32 << shift)
    }
}

/// Sends webservice calls through a [`SoapTransport`] under a [`RetryPolicy`]
///
/// Attempts are strictly sequential. Timeouts, transport errors and server
/// faults are retried until the budget is spent; authentication rejections
/// and client faults end the call immediately.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn SoapTransport>,
    policy: RetryPolicy,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn SoapTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn from_options(transport: Arc<dyn SoapTransport>, options: &ConnectionOptions) -> Self {
        Self::new(transport, RetryPolicy::from_options(options))
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Execute `operation` on `endpoint` with retry semantics.
    ///
    /// # Errors
    /// - `DteLinkError::Auth` when the transport reports an authentication
    ///   rejection
    /// - `DteLinkError::Rejected` for client faults
    /// - `DteLinkError::ServiceUnavailable` once every attempt failed with a
    ///   retryable failure; it carries the last one
    pub async fn send(
        &self,
        endpoint: &Endpoint,
        operation: &str,
        payload: &SoapPayload,
    ) -> Result<RawResponse> {
        let request_id = Uuid::new_v4();
        let max_attempts = self.policy.max_attempts;
        let mut attempts = Vec::with_capacity(max_attempts as usize);
        let mut backoff = Duration::ZERO;

        for attempt in 1..=max_attempts {
            if !backoff.is_zero() {
                tokio::time::sleep(backoff).await;
            }

            debug!(
                %request_id,
                attempt,
                service = %endpoint.service,
                operation,
                url = %endpoint.address,
                "sending webservice request"
            );

            match self.transport.call(endpoint, operation, payload).await {
                Ok(body) => {
                    debug!(%request_id, attempt, service = %endpoint.service, operation, "webservice responded");
                    attempts.push(RequestAttempt {
                        sequence: attempt,
                        backoff,
                        outcome: AttemptOutcome::Success,
                    });
                    return Ok(RawResponse { body, attempts });
                }
                Err(failure) => {
                    debug!(
                        %request_id,
                        attempt,
                        service = %endpoint.service,
                        operation,
                        error = %failure,
                        "webservice attempt failed"
                    );
                    attempts.push(RequestAttempt {
                        sequence: attempt,
                        backoff,
                        outcome: AttemptOutcome::Failed(failure.clone()),
                    });

                    if !failure.is_retryable() {
                        return Err(match failure.kind {
                            FailureKind::AuthRejected => DteLinkError::Auth(format!(
                                "{}.{operation} rejected the credentials: {}",
                                endpoint.service, failure.message
                            )),
                            _ => DteLinkError::Rejected {
                                operation: format!("{}.{operation}", endpoint.service),
                                message: failure.message,
                            },
                        });
                    }

                    if attempt == max_attempts {
                        warn!(
                            %request_id,
                            attempts = attempt,
                            service = %endpoint.service,
                            operation,
                            error = %failure,
                            "webservice unavailable, retry budget exhausted"
                        );
                        return Err(DteLinkError::ServiceUnavailable {
                            service: endpoint.service.clone(),
                            operation: operation.to_string(),
                            attempts: attempt,
                            last_failure: failure,
                        });
                    }

                    backoff = self.policy.delay_after(attempt);
                    warn!(
                        %request_id,
                        attempt,
                        service = %endpoint.service,
                        operation,
                        delay_ms = backoff.as_millis() as u64,
                        "retrying webservice request"
                    );
                }
            }
        }

        Err(DteLinkError::Internal("request executor exhausted retries without producing a result".into()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use dtelink_domain::AttemptFailure;
    use tokio::time::Instant;

    use super::*;

    type Scripted = std::result::Result<String, AttemptFailure>;

    /// Replays scripted results; the last one repeats forever.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Scripted>>,
        calls: Mutex<Vec<Instant>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self { script: Mutex::new(script.into()), calls: Mutex::new(Vec::new()) })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SoapTransport for ScriptedTransport {
        async fn call(
            &self,
            _endpoint: &Endpoint,
            _operation: &str,
            _payload: &SoapPayload,
        ) -> std::result::Result<String, AttemptFailure> {
            self.calls.lock().unwrap().push(Instant::now());
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script.front().cloned().unwrap()
            }
        }
    }

    fn endpoint() -> Endpoint {
        Endpoint::from_wsdl("QueryEstDteAv", "https://maullin.sii.cl/DTEWS/services/QueryEstDteAv?WSDL")
    }

    fn executor(transport: Arc<ScriptedTransport>, attempts: u32) -> RequestExecutor {
        RequestExecutor::new(transport, RetryPolicy::new(attempts, Duration::from_millis(100)))
    }

    #[test]
    fn delay_schedule_is_exponential() {
        let policy = RetryPolicy::new(10, Duration::from_millis(100));

        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
        assert_eq!(policy.delay_after(9), Duration::from_millis(25_600));

        for attempt in 1..40 {
            assert!(policy.delay_after(attempt + 1) >= policy.delay_after(attempt));
        }
    }

    #[test]
    fn policy_follows_capped_options() {
        let options = ConnectionOptions::new()
            .with_retry_budget(50)
            .with_backoff_base(Duration::from_millis(5));
        let policy = RetryPolicy::from_options(&options);

        assert_eq!(policy.max_attempts(), 10);
        assert_eq!(policy.base_delay(), Duration::from_millis(5));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_first_success_without_retry() {
        let transport = ScriptedTransport::new(vec![Ok("<ok/>".into())]);
        let response = executor(transport.clone(), 5)
            .send(&endpoint(), "getEstDteAv", &SoapPayload::new())
            .await
            .unwrap();

        assert_eq!(response.body, "<ok/>");
        assert_eq!(response.attempt_count(), 1);
        assert_eq!(response.attempts[0].backoff, Duration::ZERO);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures_until_success() {
        let transport = ScriptedTransport::new(vec![
            Err(AttemptFailure::timeout("timed out")),
            Err(AttemptFailure::server_fault("HTTP 503")),
            Ok("<ok/>".into()),
        ]);
        let response = executor(transport.clone(), 5)
            .send(&endpoint(), "getEstDteAv", &SoapPayload::new())
            .await
            .unwrap();

        assert_eq!(transport.call_count(), 3);
        assert_eq!(response.attempt_count(), 3);
        assert_eq!(response.attempts[1].backoff, Duration::from_millis(100));
        assert_eq!(response.attempts[2].backoff, Duration::from_millis(200));
        assert!(response.attempts[0].failure().is_some());
        assert_eq!(response.attempts[2].outcome, AttemptOutcome::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausting_budget_reports_last_failure() {
        let transport = ScriptedTransport::new(vec![
            Err(AttemptFailure::transport("connection refused")),
            Err(AttemptFailure::server_fault("HTTP 502")),
            Err(AttemptFailure::timeout("deadline elapsed")),
        ]);
        let err = executor(transport.clone(), 3)
            .send(&endpoint(), "getEstDteAv", &SoapPayload::new())
            .await
            .unwrap_err();

        assert_eq!(transport.call_count(), 3);
        match err {
            DteLinkError::ServiceUnavailable { service, operation, attempts, last_failure } => {
                assert_eq!(service, "QueryEstDteAv");
                assert_eq!(operation, "getEstDteAv");
                assert_eq!(attempts, 3);
                assert_eq!(last_failure, AttemptFailure::timeout("deadline elapsed"));
            }
            other => panic!("expected service unavailable, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn authentication_rejection_is_not_retried() {
        let transport = ScriptedTransport::new(vec![Err(AttemptFailure::auth_rejected("HTTP 401"))]);
        let err = executor(transport.clone(), 10)
            .send(&endpoint(), "getEstDteAv", &SoapPayload::new())
            .await
            .unwrap_err();

        assert_eq!(transport.call_count(), 1);
        assert!(err.is_auth());
    }

    #[tokio::test(start_paused = true)]
    async fn client_fault_is_not_retried() {
        let transport = ScriptedTransport::new(vec![
            Err(AttemptFailure::server_fault("HTTP 500")),
            Err(AttemptFailure::client_fault("malformed payload")),
        ]);
        let err = executor(transport.clone(), 10)
            .send(&endpoint(), "getEstDteAv", &SoapPayload::new())
            .await
            .unwrap_err();

        assert_eq!(transport.call_count(), 2);
        assert!(matches!(
            err,
            DteLinkError::Rejected { ref operation, .. } if operation == "QueryEstDteAv.getEstDteAv"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_between_attempts_follow_the_schedule() {
        let transport = ScriptedTransport::new(vec![Err(AttemptFailure::timeout("timed out"))]);
        let _ = executor(transport.clone(), 5)
            .send(&endpoint(), "getEstDteAv", &SoapPayload::new())
            .await;

        let times = transport.call_times();
        assert_eq!(times.len(), 5);
        let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
        let expected = [100, 200, 400, 800].map(Duration::from_millis);

        for (gap, expected) in gaps.iter().zip(expected) {
            assert!(*gap >= expected, "gap {gap:?} shorter than {expected:?}");
            assert!(*gap < expected + Duration::from_millis(50), "gap {gap:?} too long");
        }
        assert!(gaps.windows(2).all(|w| w[1] >= w[0]));
    }
}
