use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 传输层指标收集器
#[derive(Clone)]
pub struct TransportMetrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    // 连接指标
    connections_total: AtomicU64,
    reconnect_attempts: AtomicU64,

    // 消息指标
    messages_received: AtomicU64,
    bytes_received: AtomicU64,
    messages_published: AtomicU64,
    publish_failures: AtomicU64,
    decode_failures: AtomicU64,

    start_time: Instant,
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub connections_total: u64,
    pub reconnect_attempts: u64,
    pub messages_received: u64,
    pub bytes_received: u64,
    pub messages_published: u64,
    pub publish_failures: u64,
    pub decode_failures: u64,
    pub uptime: Duration,
}

impl TransportMetrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                connections_total: AtomicU64::new(0),
                reconnect_attempts: AtomicU64::new(0),
                messages_received: AtomicU64::new(0),
                bytes_received: AtomicU64::new(0),
                messages_published: AtomicU64::new(0),
                publish_failures: AtomicU64::new(0),
                decode_failures: AtomicU64::new(0),
                start_time: Instant::now(),
            }),
        }
    }

    pub fn record_connection(&self) {
        self.inner.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect_attempt(&self) {
        self.inner.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message_received(&self, bytes: usize) {
        self.inner.messages_received.fetch_add(1, Ordering::Relaxed);
        self.inner
            .bytes_received
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_publish(&self) {
        self.inner.messages_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_failure(&self) {
        self.inner.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.inner.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.inner.connections_total.load(Ordering::Relaxed),
            reconnect_attempts: self.inner.reconnect_attempts.load(Ordering::Relaxed),
            messages_received: self.inner.messages_received.load(Ordering::Relaxed),
            bytes_received: self.inner.bytes_received.load(Ordering::Relaxed),
            messages_published: self.inner.messages_published.load(Ordering::Relaxed),
            publish_failures: self.inner.publish_failures.load(Ordering::Relaxed),
            decode_failures: self.inner.decode_failures.load(Ordering::Relaxed),
            uptime: self.inner.start_time.elapsed(),
        }
    }
}

impl Default for TransportMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counters() {
        let metrics = TransportMetrics::new();
        let shared = metrics.clone();

        metrics.record_connection();
        shared.record_reconnect_attempt();
        shared.record_reconnect_attempt();
        metrics.record_message_received(128);
        metrics.record_message_received(64);
        metrics.record_publish();
        metrics.record_publish_failure();
        metrics.record_decode_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connections_total, 1);
        assert_eq!(snapshot.reconnect_attempts, 2);
        assert_eq!(snapshot.messages_received, 2);
        assert_eq!(snapshot.bytes_received, 192);
        assert_eq!(snapshot.messages_published, 1);
        assert_eq!(snapshot.publish_failures, 1);
        assert_eq!(snapshot.decode_failures, 1);
    }
}
