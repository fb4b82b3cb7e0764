use notification_worker::config::WorkerConfig;
use notification_worker::sender::{EmailSender, MockSender, SmtpSender};
use notification_worker::worker::Worker;
use service_core::observability::init_tracing;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_tracing("notification-worker", "info");

    let config = WorkerConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    let sender: Arc<dyn EmailSender> = if config.smtp.enabled {
        match SmtpSender::new(config.smtp.clone()) {
            Ok(sender) => {
                tracing::info!("SMTP sender initialized");
                Arc::new(sender)
            }
            Err(e) => {
                tracing::warn!("Failed to initialize SMTP sender: {}. Using mock.", e);
                Arc::new(MockSender::new())
            }
        }
    } else {
        tracing::info!("SMTP disabled, emails will be logged only");
        Arc::new(MockSender::new())
    };

    let worker = Worker::connect(
        &config.redis.url,
        config.redis.queue_key.clone(),
        sender,
        Duration::from_secs(config.poll_timeout_secs),
        Duration::from_secs(config.max_retry_elapsed_secs),
    )
    .await
    .map_err(|e| std::io::Error::other(format!("Startup error: {}", e)))?;

    let cancel = CancellationToken::new();
    let worker_handle = tokio::spawn(worker.run(cancel.clone()));

    shutdown_signal().await;
    cancel.cancel();
    worker_handle.await.ok();

    Ok(())
}
