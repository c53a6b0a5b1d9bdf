use crate::document::ReadingDocument;
use crate::error::SnapshotError;
use crate::history::history_by_kind;
use crate::reconciler::reconcile;
use crate::store::DocumentStore;
use roomlink_config::SnapshotConfig;
use roomlink_core::{DashboardEvent, StateHub};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 监听参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerOptions {
    /// 推导当前状态使用的文档数
    pub window_size: usize,

    /// 推导历史曲线使用的文档数
    pub history_window_size: usize,

    /// 每种类型的历史点数
    pub chart_size: usize,
}

impl ListenerOptions {
    pub fn from_config(config: &SnapshotConfig, chart_size: usize) -> Self {
        Self {
            window_size: config.window_size,
            history_window_size: config.history_window_size,
            chart_size,
        }
    }

    /// 实时查询的文档上限
    pub fn query_limit(&self) -> usize {
        self.window_size.max(self.history_window_size)
    }
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self {
            window_size: 50,
            history_window_size: 100,
            chart_size: 20,
        }
    }
}

/// 快照监听器
///
/// 每次文档窗口变化都重新完整推导，不做增量合并。
pub struct SnapshotListener {
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SnapshotListener {
    pub fn spawn(store: Arc<dyn DocumentStore>, hub: StateHub, options: ListenerOptions) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);

        info!(
            store = store.name(),
            window_size = options.window_size,
            history_window_size = options.history_window_size,
            "Starting snapshot listener"
        );

        let task = tokio::spawn(run_listener(store, hub, options, stop_rx));
        Self {
            stop_tx,
            task: Some(task),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// 停止监听并释放订阅
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            if tokio::time::timeout(Duration::from_secs(2), task).await.is_err() {
                warn!("Snapshot listener did not stop in time");
            }
        }
        info!("Snapshot listener stopped");
    }
}

impl Drop for SnapshotListener {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_listener(
    store: Arc<dyn DocumentStore>,
    hub: StateHub,
    options: ListenerOptions,
    mut stop: watch::Receiver<bool>,
) {
    let mut subscription = store.watch(options.query_limit());

    loop {
        let update = tokio::select! {
            _ = stop.changed() => break,
            update = subscription.next() => update,
        };

        match update {
            Some(Ok(window)) => apply_window(&hub, &window, &options),
            Some(Err(e)) => report_failure(&hub, e.to_string()),
            None => {
                report_failure(&hub, SnapshotError::Closed.to_string());
                break;
            }
        }
    }

    debug!("Snapshot listener loop ended");
}

fn apply_window(hub: &StateHub, window: &[ReadingDocument], options: &ListenerOptions) {
    let state = reconcile(&window[..window.len().min(options.window_size)]);
    let charts = history_by_kind(window, options.chart_size);

    debug!(
        documents = window.len(),
        observed = state.observed_count(),
        "Snapshot reconciled"
    );

    hub.update(|s| {
        s.snapshot = Some(state);
        s.snapshot_error = None;
        s.snapshot_charts = charts;
    });
    hub.emit(DashboardEvent::SnapshotUpdated(state));
}

fn report_failure(hub: &StateHub, reason: String) {
    warn!(error = %reason, "Snapshot update failed");
    hub.update(|s| s.snapshot_error = Some(reason.clone()));
    hub.emit(DashboardEvent::SnapshotFailed(reason));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_limit_covers_both_windows() {
        let options = ListenerOptions {
            window_size: 80,
            history_window_size: 60,
            chart_size: 20,
        };
        assert_eq!(options.query_limit(), 80);
        assert_eq!(ListenerOptions::default().query_limit(), 100);
    }

    #[test]
    fn test_options_from_config() {
        let options = ListenerOptions::from_config(&SnapshotConfig::default(), 15);
        assert_eq!(options.window_size, 50);
        assert_eq!(options.history_window_size, 100);
        assert_eq!(options.chart_size, 15);
    }
}
