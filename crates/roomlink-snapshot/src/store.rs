use crate::document::ReadingDocument;
use crate::error::{Result, SnapshotError};
use crate::firestore::FirestoreStore;
use crate::memory::MemoryStore;
use async_trait::async_trait;
use roomlink_config::{SnapshotBackend, SnapshotConfig};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

/// 文档存储接口
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 按创建时间倒序返回最近的 `limit` 条文档
    async fn recent(&self, limit: usize) -> Result<Vec<ReadingDocument>>;

    /// 追加一条文档
    async fn add(&self, document: ReadingDocument) -> Result<()>;

    /// 订阅最近 `limit` 条文档的实时窗口
    ///
    /// 订阅建立后立即推送一次当前窗口，之后每次变更推送完整窗口。
    fn watch(&self, limit: usize) -> WindowSubscription;

    fn name(&self) -> &str;
}

/// 实时窗口订阅，释放时停止后台任务
pub struct WindowSubscription {
    rx: mpsc::Receiver<Result<Vec<ReadingDocument>>>,
    task: JoinHandle<()>,
}

impl WindowSubscription {
    pub fn new(rx: mpsc::Receiver<Result<Vec<ReadingDocument>>>, task: JoinHandle<()>) -> Self {
        Self { rx, task }
    }

    /// 下一次窗口更新，订阅结束时返回 `None`
    pub async fn next(&mut self) -> Option<Result<Vec<ReadingDocument>>> {
        self.rx.recv().await
    }
}

impl Drop for WindowSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// 按配置打开文档存储
pub fn open_store(config: &SnapshotConfig) -> Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match config.backend {
        SnapshotBackend::Memory => Arc::new(MemoryStore::with_retention(
            config.window_size.max(config.history_window_size),
        )),
        SnapshotBackend::Firestore => {
            let firestore = config.firestore.as_ref().ok_or_else(|| {
                SnapshotError::Config("snapshot.firestore section is required".to_string())
            })?;
            Arc::new(FirestoreStore::new(firestore, &config.collection)?)
        }
    };

    info!(
        backend = store.name(),
        collection = %config.collection,
        "Document store opened"
    );
    Ok(store)
}
