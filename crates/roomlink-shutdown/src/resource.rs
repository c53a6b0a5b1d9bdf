use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Cleanup failed: {0}")]
    CleanupFailed(String),

    /// 资源已释放过
    #[error("Resource already released: {0}")]
    AlreadyReleased(String),
}

/// 会话期间持有、退出时必须释放的资源
#[async_trait]
pub trait Resource: Send + Sync {
    /// 释放资源
    async fn cleanup(&self) -> Result<(), ResourceError>;

    fn name(&self) -> &str;

    /// 清理优先级（数字越小越先清理）
    fn priority(&self) -> u32 {
        100
    }
}

/// 清理结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub released: Vec<String>,
    pub failed: Vec<(String, ResourceError)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// 资源管理器
///
/// 按优先级依次清理；单个资源失败不影响其余资源。
pub struct ResourceManager {
    resources: Vec<Arc<dyn Resource>>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self {
            resources: Vec::new(),
        }
    }

    pub fn register(&mut self, resource: Arc<dyn Resource>) {
        info!(resource = resource.name(), "Registering resource");
        self.resources.push(resource);
    }

    /// 清理并移除所有已注册资源
    pub async fn cleanup_all(&mut self) -> CleanupReport {
        let mut resources = std::mem::take(&mut self.resources);
        resources.sort_by_key(|r| r.priority());

        info!(count = resources.len(), "Cleaning up resources");

        let mut report = CleanupReport::default();
        for resource in resources {
            match resource.cleanup().await {
                Ok(()) => {
                    info!(resource = resource.name(), "Resource released");
                    report.released.push(resource.name().to_string());
                }
                Err(e) => {
                    error!(resource = resource.name(), error = %e, "Failed to release resource");
                    report.failed.push((resource.name().to_string(), e));
                }
            }
        }

        info!(
            released = report.released.len(),
            failed = report.failed.len(),
            "Resource cleanup complete"
        );
        report
    }

    pub fn count(&self) -> usize {
        self.resources.len()
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestResource {
        name: String,
        priority: u32,
        should_fail: bool,
    }

    impl TestResource {
        fn new(name: &str, priority: u32, should_fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                priority,
                should_fail,
            })
        }
    }

    #[async_trait]
    impl Resource for TestResource {
        async fn cleanup(&self) -> Result<(), ResourceError> {
            if self.should_fail {
                Err(ResourceError::CleanupFailed("Test failure".to_string()))
            } else {
                Ok(())
            }
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn priority(&self) -> u32 {
            self.priority
        }
    }

    #[tokio::test]
    async fn test_priority_ordering() {
        let mut manager = ResourceManager::new();
        manager.register(TestResource::new("listener", 20, false));
        manager.register(TestResource::new("transport", 10, false));
        assert_eq!(manager.count(), 2);

        let report = manager.cleanup_all().await;
        assert_eq!(report.released, vec!["transport", "listener"]);
        assert!(report.is_clean());
        assert_eq!(manager.count(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_continues_after_failure() {
        let mut manager = ResourceManager::new();
        manager.register(TestResource::new("failing", 1, true));
        manager.register(TestResource::new("healthy", 2, false));

        let report = manager.cleanup_all().await;
        assert_eq!(report.released, vec!["healthy"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "failing");
        assert!(!report.is_clean());
    }
}
