use crate::document::ReadingDocument;
use crate::error::Result;
use crate::store::{DocumentStore, WindowSubscription};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use tokio::sync::{mpsc, watch};
use tracing::debug;

/// 默认保留的文档条数
pub const DEFAULT_RETENTION: usize = 1000;

/// 进程内文档存储
///
/// 文档按创建时间倒序保存，超过保留条数时丢弃最旧的。
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    documents: RwLock<VecDeque<ReadingDocument>>,
    retention: usize,
    /// 每次写入递增，用于通知订阅者
    version: watch::Sender<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    /// 最多保留 `retention` 条文档（至少 1 条）
    pub fn with_retention(retention: usize) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(MemoryInner {
                documents: RwLock::new(VecDeque::new()),
                retention: retention.max(1),
                version,
            }),
        }
    }

    /// 按给定顺序写入初始文档
    pub fn with_documents(documents: Vec<ReadingDocument>) -> Self {
        let store = Self::new();
        {
            let mut stored = store.inner.documents.write().unwrap_or_else(|e| e.into_inner());
            for document in documents {
                store.inner.insert(&mut stored, document);
            }
        }
        store
    }

    pub fn retention(&self) -> usize {
        self.inner.retention
    }

    pub fn len(&self) -> usize {
        self.inner
            .documents
            .read()
            .map(|docs| docs.len())
            .unwrap_or_else(|e| e.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn window(&self, limit: usize) -> Vec<ReadingDocument> {
        let documents = self.inner.documents.read().unwrap_or_else(|e| e.into_inner());
        documents.iter().take(limit).cloned().collect()
    }
}

impl MemoryInner {
    /// 插入到同一创建时间的已有文档之前，后写入的优先
    fn insert(&self, documents: &mut VecDeque<ReadingDocument>, document: ReadingDocument) {
        let at = documents
            .iter()
            .position(|d| d.created_at <= document.created_at)
            .unwrap_or(documents.len());
        documents.insert(at, document);
        documents.truncate(self.retention);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn recent(&self, limit: usize) -> Result<Vec<ReadingDocument>> {
        Ok(self.window(limit))
    }

    async fn add(&self, document: ReadingDocument) -> Result<()> {
        {
            let mut documents = self.inner.documents.write().unwrap_or_else(|e| e.into_inner());
            self.inner.insert(&mut documents, document);
        }
        self.inner.version.send_modify(|v| *v += 1);
        Ok(())
    }

    fn watch(&self, limit: usize) -> WindowSubscription {
        let store = self.clone();
        let mut version = self.inner.version.subscribe();
        let (tx, rx) = mpsc::channel(8);

        let task = tokio::spawn(async move {
            loop {
                if tx.send(Ok(store.window(limit))).await.is_err() {
                    break;
                }

                tokio::select! {
                    _ = tx.closed() => break,
                    changed = version.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("Memory store watch ended");
        });

        WindowSubscription::new(rx, task)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocTimestamp;

    fn doc(kind: &str, value: f64, seconds: i64) -> ReadingDocument {
        ReadingDocument::new(kind, value, DocTimestamp { seconds, nanoseconds: 0 })
    }

    #[tokio::test]
    async fn test_recent_orders_newest_first() {
        let store = MemoryStore::with_documents(vec![
            doc("temp", 20.0, 1),
            doc("temp", 22.0, 3),
            doc("temp", 21.0, 2),
        ]);

        let window = store.recent(2).await.unwrap();
        let values: Vec<f64> = window.iter().map(|d| d.value).collect();
        assert_eq!(values, vec![22.0, 21.0]);
    }

    #[tokio::test]
    async fn test_equal_timestamps_prefer_latest_write() {
        let store = MemoryStore::new();
        store.add(doc("sound", 40.0, 5)).await.unwrap();
        store.add(doc("sound", 45.0, 5)).await.unwrap();

        let window = store.recent(10).await.unwrap();
        assert_eq!(window[0].value, 45.0);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_retention_drops_oldest_documents() {
        let store = MemoryStore::with_retention(5);
        for seconds in 0..50 {
            store.add(doc("temp", seconds as f64, seconds)).await.unwrap();
        }
        // 迟到的旧文档直接被丢弃
        store.add(doc("temp", -1.0, 0)).await.unwrap();

        assert_eq!(store.len(), 5);
        let window = store.recent(10).await.unwrap();
        let values: Vec<f64> = window.iter().map(|d| d.value).collect();
        assert_eq!(values, vec![49.0, 48.0, 47.0, 46.0, 45.0]);
    }

    #[test]
    fn test_zero_retention_keeps_one() {
        assert_eq!(MemoryStore::with_retention(0).retention(), 1);
        assert_eq!(MemoryStore::new().retention(), DEFAULT_RETENTION);
    }

    #[tokio::test]
    async fn test_watch_pushes_initial_and_updates() {
        let store = MemoryStore::new();
        let mut subscription = store.watch(10);

        let initial = subscription.next().await.unwrap().unwrap();
        assert!(initial.is_empty());

        store.add(doc("humid", 55.0, 1)).await.unwrap();
        let updated = subscription.next().await.unwrap().unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].kind, "humid");
    }
}
