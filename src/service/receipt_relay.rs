use anyhow::Result;
use chrono::{Duration, Utc};

use crate::repo::receipt_outbox_repo::ReceiptOutboxRepo;

/// Moves enqueued receipt jobs from the outbox table onto a Redis stream for
/// the mailer worker. The ACK to the processor never waits on this.
#[derive(Clone)]
pub struct ReceiptRelay {
    pub outbox_repo: ReceiptOutboxRepo,
    pub redis_client: redis::Client,
    pub stream_key: String,
}

impl ReceiptRelay {
    pub async fn run(self) {
        loop {
            if let Err(err) = self.tick().await {
                tracing::error!("receipt relay error: {}", err);
            }
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        }
    }

    async fn tick(&self) -> Result<()> {
        let batch = self.outbox_repo.lock_pending(50).await?;
        if batch.is_empty() {
            return Ok(());
        }

        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        for job in batch {
            let payload = serde_json::to_string(&job)?;
            let add_res: redis::RedisResult<String> = redis::cmd("XADD")
                .arg(&self.stream_key)
                .arg("MAXLEN")
                .arg("~")
                .arg(100_000)
                .arg("*")
                .arg("job")
                .arg(payload)
                .query_async(&mut conn)
                .await;

            match add_res {
                Ok(_) => {
                    self.outbox_repo.mark_published(job.id).await?;
                }
                Err(e) => {
                    let attempts = job.attempts + 1;
                    let backoff = i64::min(300, 2_i64.pow((attempts.min(8)) as u32));
                    let next_attempt_at = Utc::now() + Duration::seconds(backoff);
                    self.outbox_repo.mark_retry(job.id, attempts, next_attempt_at).await?;
                    tracing::warn!("xadd failed for receipt job {}: {}", job.id, e);
                }
            }
        }

        Ok(())
    }
}
