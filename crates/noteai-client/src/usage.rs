//! Usage record sinks

use noteai_core::UsageLogRecord;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Tracing target of usage events.
pub const USAGE_TARGET: &str = "noteai::usage";

/// Destination for per-call usage records.
///
/// Called from concurrent tasks; implementations must not block.
pub trait UsageSink: Send + Sync {
    fn record(&self, record: &UsageLogRecord);
}

/// Emits each record as a structured tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingUsageSink {
    verbose: bool,
}

impl TracingUsageSink {
    /// `verbose` raises events from `debug` to `info`.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl UsageSink for TracingUsageSink {
    fn record(&self, r: &UsageLogRecord) {
        let timestamp = r.timestamp.to_rfc3339();
        let error = r.error.as_deref().unwrap_or("");
        if self.verbose {
            info!(
                target: USAGE_TARGET,
                timestamp = %timestamp,
                model = %r.model,
                input_tokens = r.input_tokens,
                output_tokens = r.output_tokens,
                latency_ms = r.latency_ms,
                success = r.success,
                error,
                "generation usage"
            );
        } else {
            debug!(
                target: USAGE_TARGET,
                timestamp = %timestamp,
                model = %r.model,
                input_tokens = r.input_tokens,
                output_tokens = r.output_tokens,
                latency_ms = r.latency_ms,
                success = r.success,
                error,
                "generation usage"
            );
        }
    }
}

/// Keeps records in memory, mainly for tests and short-lived tools.
#[derive(Debug, Clone, Default)]
pub struct MemoryUsageSink {
    records: Arc<Mutex<Vec<UsageLogRecord>>>,
}

impl MemoryUsageSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<UsageLogRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl UsageSink for MemoryUsageSink {
    fn record(&self, record: &UsageLogRecord) {
        self.records.lock().push(record.clone());
    }
}

impl<S: UsageSink + ?Sized> UsageSink for Arc<S> {
    fn record(&self, record: &UsageLogRecord) {
        (**self).record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_collects() {
        let sink = MemoryUsageSink::new();
        assert!(sink.is_empty());

        sink.record(&UsageLogRecord::success("gemini", 5, 3, 10));
        sink.record(&UsageLogRecord::failure("gemini", 5, 12, "Request timeout"));

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert!(records[0].success);
        assert_eq!(records[1].error.as_deref(), Some("Request timeout"));

        sink.clear();
        assert_eq!(sink.len(), 0);
    }

    #[test]
    fn test_memory_sink_clones_share_storage() {
        let sink = MemoryUsageSink::new();
        let handle = sink.clone();
        handle.record(&UsageLogRecord::success("gemini", 1, 1, 1));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_memory_sink_concurrent_writes() {
        let sink = MemoryUsageSink::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        sink.record(&UsageLogRecord::success("gemini", i, 0, 0));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sink.len(), 200);
    }

    #[test]
    fn test_tracing_sink_does_not_panic() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("noteai::usage=debug")
            .with_test_writer()
            .try_init();

        let sink = TracingUsageSink::new(false);
        sink.record(&UsageLogRecord::success("gemini", 5, 3, 10));
        TracingUsageSink::new(true)
            .record(&UsageLogRecord::failure("gemini", 5, 10, "Network error"));
    }

    #[test]
    fn test_arc_sink_forwards() {
        let inner = MemoryUsageSink::new();
        let shared: Arc<dyn UsageSink> = Arc::new(inner.clone());
        shared.record(&UsageLogRecord::success("gemini", 1, 2, 3));
        assert_eq!(inner.len(), 1);
    }
}
