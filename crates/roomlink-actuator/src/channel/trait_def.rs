use crate::command::ActuatorCommand;
use crate::error::Result;
use async_trait::async_trait;

/// 指令通道 trait
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// 发布指令；未连接或被拒绝时返回 `CommandError::NotSent`
    async fn send_command(&self, command: &ActuatorCommand) -> Result<()>;

    /// 传输层当前是否在线
    fn is_connected(&self) -> bool;
}

#[cfg(test)]
pub struct MockCommandChannel {
    connected: std::sync::atomic::AtomicBool,
    fail_with: std::sync::Mutex<Option<String>>,
    sent: std::sync::Mutex<Vec<ActuatorCommand>>,
}

#[cfg(test)]
impl MockCommandChannel {
    pub fn new() -> Self {
        Self {
            connected: std::sync::atomic::AtomicBool::new(true),
            fail_with: std::sync::Mutex::new(None),
            sent: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected
            .store(connected, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn fail_with(&self, reason: &str) {
        *self.fail_with.lock().unwrap() = Some(reason.to_string());
    }

    pub fn sent(&self) -> Vec<ActuatorCommand> {
        self.sent.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl CommandChannel for MockCommandChannel {
    async fn send_command(&self, command: &ActuatorCommand) -> Result<()> {
        if let Some(reason) = self.fail_with.lock().unwrap().clone() {
            return Err(crate::error::CommandError::NotSent(reason));
        }
        self.sent.lock().unwrap().push(*command);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(std::sync::atomic::Ordering::SeqCst)
    }
}
