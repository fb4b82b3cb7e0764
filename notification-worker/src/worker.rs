//! Queue consumer loop.
//!
//! Jobs are JSON envelopes on a Redis list; the web process LPUSHes and this
//! worker BRPOPs. A malformed envelope is logged and dropped so one bad job
//! cannot wedge the queue. Transient send failures are retried with
//! exponential backoff before the job is abandoned.

use crate::sender::{EmailSender, SenderError};
use crate::template;
use backoff::ExponentialBackoff;
use redis::aio::ConnectionManager;
use service_core::error::AppError;
use service_core::jobs::EmailJob;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct Worker {
    conn: ConnectionManager,
    queue_key: String,
    sender: Arc<dyn EmailSender>,
    poll_timeout: Duration,
    max_retry_elapsed: Duration,
}

impl Worker {
    pub async fn connect(
        redis_url: &str,
        queue_key: String,
        sender: Arc<dyn EmailSender>,
        poll_timeout: Duration,
        max_retry_elapsed: Duration,
    ) -> Result<Self, AppError> {
        tracing::info!(url = %redis_url, queue = %queue_key, "Connecting to Redis");
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            queue_key,
            sender,
            poll_timeout,
            max_retry_elapsed,
        })
    }

    /// Consume jobs until cancelled. The BRPOP timeout bounds how long a
    /// cancellation can go unnoticed.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(queue = %self.queue_key, "Worker started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Worker stopping");
                    return;
                }
                popped = self.pop() => {
                    match popped {
                        Ok(Some(raw)) => self.handle(&raw).await,
                        Ok(None) => {} // timeout, poll again
                        Err(e) => {
                            tracing::error!(error = %e, "Queue read failed, backing off");
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
            }
        }
    }

    async fn pop(&mut self) -> Result<Option<String>, redis::RedisError> {
        let reply: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(&self.queue_key)
            .arg(self.poll_timeout.as_secs())
            .query_async(&mut self.conn)
            .await?;
        Ok(reply.map(|(_, value)| value))
    }

    async fn handle(&self, raw: &str) {
        let job: EmailJob = match serde_json::from_str(raw) {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(error = %e, payload = %raw, "Dropping malformed job");
                return;
            }
        };

        if let Err(e) = deliver(self.sender.as_ref(), &job, self.max_retry_elapsed).await {
            tracing::error!(error = %e, "Giving up on job after retries");
        }
    }
}

/// Render the job and send it, retrying transient failures.
pub async fn deliver(
    sender: &dyn EmailSender,
    job: &EmailJob,
    max_elapsed: Duration,
) -> Result<(), SenderError> {
    let email = match job {
        EmailJob::OrderConfirmation(payload) => template::order_confirmation(payload),
        EmailJob::PasswordReset(payload) => template::password_reset(payload),
    };

    let policy = ExponentialBackoff {
        max_elapsed_time: Some(max_elapsed),
        ..ExponentialBackoff::default()
    };

    backoff::future::retry(policy, || async {
        sender.send(&email).await.map_err(|e| {
            if e.is_permanent() {
                backoff::Error::permanent(e)
            } else {
                tracing::warn!(to = %email.to, "Send failed, will retry");
                backoff::Error::transient(e)
            }
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::MockSender;
    use service_core::jobs::PasswordResetPayload;

    #[tokio::test]
    async fn deliver_sends_each_job_once() {
        let sender = MockSender::new();
        let job = EmailJob::PasswordReset(PasswordResetPayload {
            email: "buyer@example.com".to_string(),
            name: "Buyer".to_string(),
            code: "123456".to_string(),
        });

        deliver(&sender, &job, Duration::from_secs(1)).await.unwrap();
        assert_eq!(sender.send_count(), 1);
    }

    #[test]
    fn unknown_job_types_fail_to_parse() {
        let raw = r#"{"job_type":"carrier_pigeon","payload":{}}"#;
        assert!(serde_json::from_str::<EmailJob>(raw).is_err());
    }
}
