use tokio::sync::broadcast;

/// 广播事件总线
#[derive(Clone)]
pub struct EventBus<T: Clone> {
    sender: broadcast::Sender<T>,
}

impl<T: Clone> EventBus<T> {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }

    /// 发布事件，返回收到事件的订阅者数量
    pub fn publish(&self, event: T) -> Result<usize, broadcast::error::SendError<T>> {
        self.sender.send(event)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
