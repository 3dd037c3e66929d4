use anyhow::Result;
use donation_gateway::config::AppConfig;
use donation_gateway::repo::receipt_outbox_repo::ReceiptJob;
use redis::streams::StreamReadReply;
use tracing_subscriber::EnvFilter;

/// Consumes receipt jobs off the Redis stream and posts them to the mail
/// sender. An unacked entry stays in the consumer group's pending list, so a
/// crashed or failed send is picked up again.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    let consumer_name =
        std::env::var("RECEIPT_CONSUMER_NAME").unwrap_or_else(|_| "receipt-mailer-1".to_string());
    let mailer_url =
        std::env::var("MAILER_URL").unwrap_or_else(|_| "http://localhost:8025/send".to_string());

    let redis_client = redis::Client::open(cfg.redis_url.clone())?;
    let mut conn = redis_client.get_multiplexed_async_connection().await?;
    let http = reqwest::Client::new();

    let _: redis::RedisResult<String> = redis::cmd("XGROUP")
        .arg("CREATE")
        .arg(&cfg.receipt_stream_key)
        .arg(&cfg.receipt_stream_group)
        .arg("0")
        .arg("MKSTREAM")
        .query_async(&mut conn)
        .await;

    loop {
        let reply: StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&cfg.receipt_stream_group)
            .arg(&consumer_name)
            .arg("COUNT")
            .arg(50)
            .arg("BLOCK")
            .arg(2000)
            .arg("STREAMS")
            .arg(&cfg.receipt_stream_key)
            .arg(">")
            .query_async(&mut conn)
            .await
            .unwrap_or(StreamReadReply { keys: vec![] });

        if reply.keys.is_empty() {
            continue;
        }

        for stream_key in reply.keys {
            for id in stream_key.ids {
                let raw = id
                    .map
                    .get("job")
                    .and_then(|v| redis::from_redis_value::<String>(v).ok());

                let Some(raw_json) = raw else {
                    continue;
                };
                let Ok(job) = serde_json::from_str::<ReceiptJob>(&raw_json) else {
                    tracing::warn!("unparseable receipt job on stream; skipping");
                    continue;
                };

                match http.post(&mailer_url).json(&job.payload_json).send().await {
                    Ok(resp) if resp.status().is_success() => {
                        tracing::info!(donation_id = job.donation_id, "receipt email dispatched");
                        let _: i64 = redis::cmd("XACK")
                            .arg(&cfg.receipt_stream_key)
                            .arg(&cfg.receipt_stream_group)
                            .arg(id.id)
                            .query_async(&mut conn)
                            .await
                            .unwrap_or(0);
                    }
                    Ok(resp) => {
                        // Left unacked; redelivered from the pending list.
                        tracing::warn!(
                            donation_id = job.donation_id,
                            status = resp.status().as_u16(),
                            "mailer rejected receipt job"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(donation_id = job.donation_id, "mailer unreachable: {}", e);
                    }
                }
            }
        }
    }
}
