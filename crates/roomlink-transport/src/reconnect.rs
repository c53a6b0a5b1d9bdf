use std::time::Duration;

/// 重连策略：固定间隔，无限重试
///
/// 不做指数退避，也没有最大重试次数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    interval: Duration,
}

impl ReconnectPolicy {
    pub fn fixed(interval: Duration) -> Self {
        Self { interval }
    }

    /// 第 `attempt` 次重连前的等待时间
    pub fn delay(&self, _attempt: u64) -> Duration {
        self.interval
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(1))
    }
}
