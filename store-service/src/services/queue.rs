use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use service_core::error::AppError;
use service_core::jobs::{EMAIL_QUEUE_KEY, EmailJob};

/// Producer side of the email queue: JSON envelopes LPUSHed onto a Redis
/// list. The notification worker BRPOPs the other end.
#[derive(Clone)]
pub struct EmailQueue {
    conn: ConnectionManager,
    key: String,
}

impl EmailQueue {
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        tracing::info!(url = %url, "Connecting to Redis");
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            key: EMAIL_QUEUE_KEY.to_string(),
        })
    }

    pub async fn enqueue(&self, job: &EmailJob) -> Result<(), AppError> {
        let payload = serde_json::to_string(job)?;
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(&self.key, payload).await?;
        Ok(())
    }
}
