use crate::document::ReadingDocument;
use crate::store::DocumentStore;
use roomlink_types::SensorReading;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 读数记录器：把推送路径的读数写入文档存储
///
/// 写入在后台任务中进行，`record` 不会阻塞调用方。
pub struct ReadingLogger {
    tx: mpsc::Sender<ReadingDocument>,
    task: JoinHandle<u64>,
}

impl ReadingLogger {
    pub fn spawn(store: Arc<dyn DocumentStore>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<ReadingDocument>(capacity.max(1));

        let task = tokio::spawn(async move {
            let mut written = 0u64;
            while let Some(document) = rx.recv().await {
                match store.add(document).await {
                    Ok(()) => written += 1,
                    Err(e) => warn!(store = store.name(), error = %e, "Failed to store reading"),
                }
            }
            written
        });

        info!("Reading logger started");
        Self { tx, task }
    }

    /// 排队一条读数，队列已满时丢弃
    pub fn record(&self, reading: &SensorReading) -> bool {
        match self.tx.try_send(ReadingDocument::from_reading(reading)) {
            Ok(()) => true,
            Err(e) => {
                debug!(kind = %reading.kind, error = %e, "Reading logger queue rejected reading");
                false
            }
        }
    }

    /// 写完队列中的读数后停止，返回成功写入的条数
    pub async fn close(self) -> u64 {
        let Self { tx, task } = self;
        drop(tx);

        match tokio::time::timeout(Duration::from_secs(5), task).await {
            Ok(Ok(written)) => {
                info!(written, "Reading logger closed");
                written
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Reading logger task failed");
                0
            }
            Err(_) => {
                warn!("Reading logger did not drain in time");
                0
            }
        }
    }
}
