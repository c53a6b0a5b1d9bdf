use std::sync::Mutex;
use std::time::{Duration, Instant};

/// 采样策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingStrategy {
    /// 始终记录
    Always,

    /// 从不记录
    Never,

    /// 速率限制（每秒最多 N 条）
    RateLimit(u32),
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
    suppressed: u64,
}

/// 日志采样器
///
/// 用于高频重复告警（例如设备持续发送格式错误的读数）。
pub struct LogSampler {
    strategy: SamplingStrategy,
    window: Mutex<Window>,
}

impl LogSampler {
    pub fn new(strategy: SamplingStrategy) -> Self {
        Self {
            strategy,
            window: Mutex::new(Window {
                started: Instant::now(),
                count: 0,
                suppressed: 0,
            }),
        }
    }

    /// 判断本条日志是否输出
    ///
    /// 返回 `Some(n)` 表示应输出，`n` 为上次输出以来被抑制的条数。
    pub fn sample(&self) -> Option<u64> {
        self.sample_at(Instant::now())
    }

    fn sample_at(&self, now: Instant) -> Option<u64> {
        match self.strategy {
            SamplingStrategy::Always => Some(0),
            SamplingStrategy::Never => None,
            SamplingStrategy::RateLimit(max_per_sec) => {
                let mut window = self.window.lock().unwrap_or_else(|e| e.into_inner());

                // 每秒重置计数器
                if now.saturating_duration_since(window.started) >= Duration::from_secs(1) {
                    window.started = now;
                    window.count = 0;
                }

                if window.count < max_per_sec {
                    window.count += 1;
                    Some(std::mem::take(&mut window.suppressed))
                } else {
                    window.suppressed += 1;
                    None
                }
            }
        }
    }

    /// 当前被抑制、尚未报告的条数
    pub fn suppressed(&self) -> u64 {
        self.window
            .lock()
            .map(|w| w.suppressed)
            .unwrap_or_else(|e| e.into_inner().suppressed)
    }
}

impl Default for LogSampler {
    fn default() -> Self {
        Self::new(SamplingStrategy::Always)
    }
}
