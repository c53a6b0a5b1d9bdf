use crate::ingest::IngestStats;
use async_trait::async_trait;
use roomlink_shutdown::{Resource, ResourceError};
use roomlink_snapshot::SnapshotListener;
use roomlink_transport::Connector;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

fn take<T>(slot: &Mutex<Option<T>>) -> Option<T> {
    slot.lock().unwrap_or_else(|e| e.into_inner()).take()
}

/// 快照监听器，最先停止
pub struct ListenerResource {
    listener: Mutex<Option<SnapshotListener>>,
}

impl ListenerResource {
    pub fn new(listener: SnapshotListener) -> Self {
        Self {
            listener: Mutex::new(Some(listener)),
        }
    }
}

#[async_trait]
impl Resource for ListenerResource {
    async fn cleanup(&self) -> Result<(), ResourceError> {
        let listener = take(&self.listener)
            .ok_or_else(|| ResourceError::AlreadyReleased(self.name().to_string()))?;
        listener.stop().await;
        Ok(())
    }

    fn name(&self) -> &str {
        "snapshot-listener"
    }

    fn priority(&self) -> u32 {
        10
    }
}

/// 传输连接：取消订阅并断开
pub struct TransportResource {
    connector: Mutex<Option<Connector>>,
}

impl TransportResource {
    pub fn new(connector: Connector) -> Self {
        Self {
            connector: Mutex::new(Some(connector)),
        }
    }
}

#[async_trait]
impl Resource for TransportResource {
    async fn cleanup(&self) -> Result<(), ResourceError> {
        let connector = take(&self.connector)
            .ok_or_else(|| ResourceError::AlreadyReleased(self.name().to_string()))?;
        connector
            .shutdown()
            .await
            .map_err(|e| ResourceError::CleanupFailed(e.to_string()))
    }

    fn name(&self) -> &str {
        "transport"
    }

    fn priority(&self) -> u32 {
        20
    }
}

/// 接收循环任务
///
/// 连接器关闭后事件通道随之关闭，循环自然结束；此处只等待它排空。
pub struct IngestResource {
    task: Mutex<Option<JoinHandle<IngestStats>>>,
    stats: Mutex<Option<IngestStats>>,
}

impl IngestResource {
    pub fn new(task: JoinHandle<IngestStats>) -> Self {
        Self {
            task: Mutex::new(Some(task)),
            stats: Mutex::new(None),
        }
    }

    /// 清理完成后的统计
    pub fn stats(&self) -> Option<IngestStats> {
        *self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Resource for IngestResource {
    async fn cleanup(&self) -> Result<(), ResourceError> {
        let mut task = take(&self.task)
            .ok_or_else(|| ResourceError::AlreadyReleased(self.name().to_string()))?;

        match tokio::time::timeout(Duration::from_secs(5), &mut task).await {
            Ok(Ok(stats)) => {
                info!(events = stats.events, logged = stats.logged, "Ingestion drained");
                *self.stats.lock().unwrap_or_else(|e| e.into_inner()) = Some(stats);
                Ok(())
            }
            Ok(Err(e)) => Err(ResourceError::CleanupFailed(e.to_string())),
            Err(_) => {
                warn!("Ingestion loop did not drain in time");
                task.abort();
                Err(ResourceError::CleanupFailed(
                    "ingestion loop did not drain in time".to_string(),
                ))
            }
        }
    }

    fn name(&self) -> &str {
        "ingest"
    }

    fn priority(&self) -> u32 {
        30
    }
}

impl Drop for IngestResource {
    fn drop(&mut self) {
        if let Some(task) = take(&self.task) {
            task.abort();
        }
    }
}
