use noteai_core::UsageLogRecord;

use crate::usage::UsageSink;

const DEFAULT_STREAM_KEY: &str = "noteai:usage";

/// Appends usage records to a Redis stream with `XADD`.
///
/// Writes are fire-and-forget; when Redis is unreachable records are only
/// traced at debug level.
pub struct RedisUsageSink {
    manager: Option<redis::aio::ConnectionManager>,
    stream_key: String,
}

impl RedisUsageSink {
    pub async fn new(redis_url: &str) -> Self {
        let manager = match redis::Client::open(redis_url) {
            Ok(client) => match redis::aio::ConnectionManager::new(client).await {
                Ok(m) => Some(m),
                Err(e) => {
                    tracing::warn!("Failed to create Redis connection manager: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Invalid Redis URL for usage records: {}", e);
                None
            }
        };

        Self {
            manager,
            stream_key: DEFAULT_STREAM_KEY.to_string(),
        }
    }

    pub fn with_stream_key(mut self, stream_key: &str) -> Self {
        if !stream_key.trim().is_empty() {
            self.stream_key = stream_key.to_string();
        }
        self
    }

    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }

    pub fn is_connected(&self) -> bool {
        self.manager.is_some()
    }
}

fn stream_fields(record: &UsageLogRecord) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("timestamp", record.timestamp.to_rfc3339()),
        ("model", record.model.clone()),
        ("input_tokens", record.input_tokens.to_string()),
        ("output_tokens", record.output_tokens.to_string()),
        ("latency_ms", record.latency_ms.to_string()),
        ("success", record.success.to_string()),
    ];
    if let Some(error) = &record.error {
        fields.push(("error", error.clone()));
    }
    fields
}

impl UsageSink for RedisUsageSink {
    fn record(&self, record: &UsageLogRecord) {
        let (Some(manager), Ok(runtime)) = (&self.manager, tokio::runtime::Handle::try_current())
        else {
            tracing::debug!(
                "Usage record skipped (Redis unavailable): model={}, input_tokens={}, output_tokens={}, latency_ms={}, success={}",
                record.model,
                record.input_tokens,
                record.output_tokens,
                record.latency_ms,
                record.success
            );
            return;
        };

        let stream_key = self.stream_key.clone();
        let fields = stream_fields(record);
        let mut manager = manager.clone();

        runtime.spawn(async move {
            let mut cmd = redis::cmd("XADD");
            cmd.arg(&stream_key).arg("*");
            for (name, value) in &fields {
                cmd.arg(*name).arg(value);
            }
            let result: Result<(), redis::RedisError> = cmd.query_async(&mut manager).await;

            if let Err(e) = result {
                tracing::error!("Failed to push usage record to Redis stream: {:?}", e);
            }
        });
    }
}
