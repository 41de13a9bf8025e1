//! Bounded-deadline notification delivery with exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pagesmith_core::EvaluationPayload;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Total budget measured from the first attempt
    pub max_duration: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            max_duration: Duration::from_secs(600),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = duration;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn backoff(&self) -> Backoff {
        Backoff {
            next: self.initial_delay,
            max: self.max_delay,
        }
    }
}

/// Delays between attempts: doubling from the initial delay, capped.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next.min(self.max);
        self.next = current.saturating_mul(2).min(self.max);
        Some(current)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// One JSON POST to the evaluator.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn post_json(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError>;
}

#[derive(Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationTransport for HttpTransport {
    async fn post_json(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(endpoint)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        Ok(TransportResponse { status, body })
    }
}

pub struct RetryDelivery {
    transport: Arc<dyn NotificationTransport>,
    policy: RetryPolicy,
}

impl RetryDelivery {
    pub fn new(transport: Arc<dyn NotificationTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Posts `payload` until the endpoint answers 200 or the policy's
    /// duration runs out. Returns whether delivery succeeded.
    pub async fn deliver(&self, endpoint: &str, payload: &EvaluationPayload) -> bool {
        let body = match serde_json::to_value(payload) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "Could not serialize evaluation payload");
                return false;
            }
        };

        let deadline = Instant::now() + self.policy.max_duration;
        self.deliver_until(endpoint, &body, deadline).await
    }

    /// Retry loop against an absolute deadline. No attempt starts at or after
    /// `deadline`, and no attempt or wait runs past it.
    pub async fn deliver_until(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
        deadline: Instant,
    ) -> bool {
        let started = Instant::now();
        let mut backoff = self.policy.backoff();
        let mut attempts = 0u32;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            attempts += 1;
            let timeout = self.policy.attempt_timeout.min(remaining);
            let outcome =
                tokio::time::timeout(timeout, self.transport.post_json(endpoint, body, timeout))
                    .await;

            match outcome {
                Ok(Ok(response)) if response.status == 200 => {
                    info!(
                        endpoint = %endpoint,
                        attempts,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Notification delivered"
                    );
                    return true;
                }
                Ok(Ok(response)) => {
                    warn!(
                        endpoint = %endpoint,
                        attempt = attempts,
                        status = response.status,
                        body = %response.body,
                        "Notification rejected"
                    );
                }
                Ok(Err(e)) => {
                    warn!(endpoint = %endpoint, attempt = attempts, error = %e, "Notification failed");
                }
                Err(_) => {
                    warn!(
                        endpoint = %endpoint,
                        attempt = attempts,
                        timeout_ms = timeout.as_millis() as u64,
                        "Notification timed out"
                    );
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let delay = backoff.next().unwrap_or(self.policy.max_delay).min(remaining);
            tokio::time::sleep(delay).await;
        }

        error!(
            endpoint = %endpoint,
            attempts,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Giving up on notification"
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedTransport, TransportReply};
    use serde_json::json;

    fn delivery(transport: &ScriptedTransport, policy: RetryPolicy) -> RetryDelivery {
        RetryDelivery::new(Arc::new(transport.clone()), policy)
    }

    fn gaps(transport: &ScriptedTransport) -> Vec<Duration> {
        transport
            .attempts()
            .windows(2)
            .map(|w| w[1].at - w[0].at)
            .collect()
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let delays: Vec<u64> = RetryPolicy::default()
            .backoff()
            .take(9)
            .map(|d| d.as_secs())
            .collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 32, 60, 60, 60]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_at_deadline() {
        let transport = ScriptedTransport::always(TransportReply::Status(503));
        let delivery = delivery(
            &transport,
            RetryPolicy::default().with_max_duration(Duration::from_secs(10)),
        );

        let start = Instant::now();
        let delivered = delivery
            .deliver_until("http://eval/notify", &json!({}), start + Duration::from_secs(10))
            .await;

        assert!(!delivered);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
        assert_eq!(
            gaps(&transport),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_server_errors() {
        let transport = ScriptedTransport::new(
            vec![TransportReply::Status(500), TransportReply::Fail("reset".into())],
            TransportReply::Status(200),
        );

        let start = Instant::now();
        let delivered = delivery(&transport, RetryPolicy::default())
            .deliver_until("http://eval/notify", &json!({"task": "t"}), start + Duration::from_secs(600))
            .await;

        assert!(delivered);
        assert_eq!(transport.attempts().len(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_200_success_codes_are_retried() {
        let transport = ScriptedTransport::new(
            vec![TransportReply::Status(201)],
            TransportReply::Status(200),
        );

        let delivered = delivery(&transport, RetryPolicy::default())
            .deliver_until("http://eval/notify", &json!({}), Instant::now() + Duration::from_secs(60))
            .await;

        assert!(delivered);
        assert_eq!(transport.attempts().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_deadline_makes_no_attempt() {
        let transport = ScriptedTransport::always(TransportReply::Status(200));

        let delivered = delivery(&transport, RetryPolicy::default())
            .deliver_until("http://eval/notify", &json!({}), Instant::now())
            .await;

        assert!(!delivered);
        assert!(transport.attempts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_is_clamped_to_deadline() {
        let transport = ScriptedTransport::always(TransportReply::Hang);

        let start = Instant::now();
        let delivered = delivery(&transport, RetryPolicy::default())
            .deliver_until("http://eval/notify", &json!({}), start + Duration::from_secs(45))
            .await;

        assert!(!delivered);
        assert_eq!(start.elapsed(), Duration::from_secs(45));

        let attempts = transport.attempts();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].timeout, Duration::from_secs(30));
        assert_eq!(attempts[1].timeout, Duration::from_secs(14));
    }

    #[tokio::test]
    async fn test_http_transport_retries_until_ok() {
        use wiremock::matchers::{body_partial_json, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notify"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/notify"))
            .and(body_partial_json(json!({ "task": "demo", "round": 1 })))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let policy = RetryPolicy::default()
            .with_initial_delay(Duration::from_millis(10))
            .with_max_duration(Duration::from_secs(5));
        let delivery = RetryDelivery::new(Arc::new(HttpTransport::new()), policy);

        let payload = EvaluationPayload {
            email: "student@example.com".to_string(),
            task: "demo".to_string(),
            round: 1,
            nonce: "n-1".to_string(),
            repo_url: "https://github.com/octo/demo".to_string(),
            commit_sha: "abc123".to_string(),
            pages_url: "https://octo.github.io/demo/".to_string(),
        };

        assert!(delivery.deliver(&format!("{}/notify", server.uri()), &payload).await);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }
}
