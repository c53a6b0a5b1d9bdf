use roomlink_actuator::ActuatorController;
use roomlink_core::{ConnectionStatus, DashboardEvent, StateHub};
use roomlink_ingest::{DecodeFailure, DecodedMessage, Decoder, RollingWindow, SensorAggregator};
use roomlink_snapshot::ReadingLogger;
use roomlink_transport::{TransportEvent, TransportMetrics};
use roomlink_types::{ActuatorStatus, ImageFrame, SensorReading};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// 代理离线时展示的错误
pub const OFFLINE_MESSAGE: &str = "MQTT broker offline";

/// 接收循环统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub events: u64,
    pub readings: u64,
    pub images: u64,
    pub statuses: u64,
    pub decode_failures: u64,
    /// 记录器成功写入文档存储的读数
    pub logged: u64,
}

/// 接收循环
///
/// 单任务逐条处理传输事件，一条处理完才取下一条。
pub struct Ingestor {
    hub: StateHub,
    decoder: Decoder,
    aggregator: SensorAggregator,
    window: RollingWindow,
    controller: ActuatorController,
    logger: Option<ReadingLogger>,
    metrics: TransportMetrics,
    stats: IngestStats,
}

impl Ingestor {
    pub fn new(
        hub: StateHub,
        decoder: Decoder,
        window: RollingWindow,
        controller: ActuatorController,
        metrics: TransportMetrics,
    ) -> Self {
        Self {
            hub,
            decoder,
            aggregator: SensorAggregator::new(),
            window,
            controller,
            logger: None,
            metrics,
            stats: IngestStats::default(),
        }
    }

    /// 把推送路径的读数同时写入文档存储
    pub fn with_logger(mut self, logger: ReadingLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// 处理事件直到连接器关闭事件通道
    pub async fn run(mut self, mut events: mpsc::Receiver<TransportEvent>) -> IngestStats {
        while let Some(event) = events.recv().await {
            self.handle(event);
        }

        if let Some(logger) = self.logger.take() {
            self.stats.logged = logger.close().await;
        }

        info!(
            events = self.stats.events,
            readings = self.stats.readings,
            decode_failures = self.stats.decode_failures,
            "Ingestion loop finished"
        );
        self.stats
    }

    pub fn handle(&mut self, event: TransportEvent) {
        self.stats.events += 1;

        match event {
            TransportEvent::Connected => {
                self.hub.update(|s| {
                    s.connection = ConnectionStatus::Connected;
                    s.transport_error = None;
                });
                self.hub
                    .emit(DashboardEvent::ConnectionChanged(ConnectionStatus::Connected));
            }
            TransportEvent::Disconnected => {
                self.set_connection(ConnectionStatus::Disconnected);
            }
            TransportEvent::Offline => {
                self.hub.update(|s| {
                    s.connection = ConnectionStatus::Offline;
                    s.transport_error = Some(OFFLINE_MESSAGE.to_string());
                });
                self.hub
                    .emit(DashboardEvent::ConnectionChanged(ConnectionStatus::Offline));
                self.hub
                    .emit(DashboardEvent::TransportError(OFFLINE_MESSAGE.to_string()));
            }
            TransportEvent::TransportError(reason) => {
                self.hub.update(|s| s.transport_error = Some(reason.clone()));
                self.hub.emit(DashboardEvent::TransportError(reason));
            }
            TransportEvent::MessageReceived { topic, payload } => {
                let decoded = self.decoder.decode(&topic, &payload);
                self.apply(decoded);
            }
        }
    }

    fn set_connection(&self, status: ConnectionStatus) {
        self.hub.update(|s| s.connection = status);
        self.hub.emit(DashboardEvent::ConnectionChanged(status));
    }

    fn apply(&mut self, decoded: DecodedMessage) {
        match decoded {
            DecodedMessage::Sensor(reading) => self.apply_reading(reading),
            DecodedMessage::Image(frame) => self.apply_image(frame),
            DecodedMessage::Actuator(status) => self.apply_status(status),
            DecodedMessage::Ignored { topic, reason } => {
                debug!(topic = %topic, reason = %reason, "Message ignored");
            }
            DecodedMessage::Unrecognized(failure) => self.apply_failure(failure),
        }
    }

    fn apply_reading(&mut self, reading: SensorReading) {
        self.stats.readings += 1;
        self.aggregator.apply(&reading);
        let pushed = self
            .window
            .push(reading.kind, reading.value, reading.observed_at);

        if let Some(logger) = &self.logger {
            logger.record(&reading);
        }

        let sensors = self.aggregator.state();
        let series = pushed.then(|| self.window.series(reading.kind).copied().collect::<Vec<_>>());
        self.hub.update(|s| {
            s.sensors = sensors;
            if let Some(series) = series {
                s.charts.insert(reading.kind, series);
            }
        });
        self.hub.emit(DashboardEvent::SensorUpdated(reading));
    }

    fn apply_image(&mut self, frame: ImageFrame) {
        self.stats.images += 1;
        let bytes = frame.len();
        let encoding = frame.encoding;
        self.hub.update(|s| s.image = Some(frame));
        self.hub
            .emit(DashboardEvent::ImageUpdated { bytes, encoding });
    }

    fn apply_status(&mut self, status: ActuatorStatus) {
        self.stats.statuses += 1;
        self.controller.apply_status(status.clone());
        self.hub.update(|s| {
            s.actuator = Some(status.clone());
            s.actuator_error = None;
        });
        self.hub.emit(DashboardEvent::ActuatorUpdated(status));
    }

    fn apply_failure(&mut self, failure: DecodeFailure) {
        self.stats.decode_failures += 1;
        self.metrics.record_decode_failure();

        if !failure.is_surfaced() {
            return;
        }

        let reason = failure.error.to_string();
        warn!(topic = %failure.topic, error = %reason, "Actuator status rejected");
        self.hub.update(|s| s.actuator_error = Some(reason.clone()));
        self.hub.emit(DashboardEvent::DecodeFailed {
            topic: failure.topic,
            reason,
            excerpt: failure.excerpt,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use roomlink_actuator::{ActuatorCommand, ActuatorMachine, CommandChannel};
    use roomlink_config::TopicConfig;
    use roomlink_ingest::TopicRouter;
    use roomlink_types::{ActuatorState, SensorKind};
    use std::sync::Arc;

    fn payload(topic: &str, body: &[u8]) -> TransportEvent {
        TransportEvent::MessageReceived {
            topic: topic.to_string(),
            payload: body.to_vec().into(),
        }
    }

    struct IdleChannel;

    #[async_trait]
    impl CommandChannel for IdleChannel {
        async fn send_command(&self, _command: &ActuatorCommand) -> roomlink_actuator::Result<()> {
            Ok(())
        }

        fn is_connected(&self) -> bool {
            true
        }
    }

    fn ingestor(hub: &StateHub) -> Ingestor {
        let topics = TopicConfig::default().resolve();
        let controller = ActuatorController::new(Arc::new(IdleChannel), ActuatorMachine::new());
        Ingestor::new(
            hub.clone(),
            Decoder::new(TopicRouter::from_topics(&topics)),
            RollingWindow::new(3),
            controller,
            TransportMetrics::new(),
        )
    }

    #[test]
    fn test_offline_sets_transport_error() {
        let hub = StateHub::default();
        let mut ingestor = ingestor(&hub);

        ingestor.handle(TransportEvent::TransportError("connection refused".to_string()));
        ingestor.handle(TransportEvent::Offline);
        let state = hub.snapshot();
        assert_eq!(state.connection, ConnectionStatus::Offline);
        assert_eq!(state.transport_error.as_deref(), Some(OFFLINE_MESSAGE));

        ingestor.handle(TransportEvent::Connected);
        let state = hub.snapshot();
        assert!(state.is_connected());
        assert!(state.transport_error.is_none());
    }

    #[test]
    fn test_readings_feed_state_and_charts() {
        let hub = StateHub::default();
        let mut ingestor = ingestor(&hub);
        let topic = "roomlink/site-01/sensor/data";

        for body in [
            r#"{"type":"temp","value":21}"#,
            r#"{"type":"temp","value":21}"#,
            r#"{"type":"temp","value":22.5}"#,
            r#"{"type":"humid","value":48}"#,
        ] {
            ingestor.handle(payload(topic, body.as_bytes()));
        }

        let state = hub.snapshot();
        assert_eq!(state.sensors.get(SensorKind::Temperature), Some(22.5));
        assert_eq!(state.sensors.get(SensorKind::Humidity), Some(48.0));
        let temps: Vec<f64> = state.charts[&SensorKind::Temperature]
            .iter()
            .map(|p| p.value)
            .collect();
        assert_eq!(temps, vec![21.0, 22.5]);
        assert_eq!(ingestor.stats.readings, 4);
    }

    #[test]
    fn test_bad_sensor_reading_is_not_surfaced() {
        let hub = StateHub::default();
        let mut ingestor = ingestor(&hub);

        ingestor.handle(payload("roomlink/site-01/sensor/data", b"{not json"));
        let state = hub.snapshot();
        assert!(state.actuator_error.is_none());
        assert_eq!(ingestor.metrics.snapshot().decode_failures, 1);
    }

    #[test]
    fn test_bad_status_is_surfaced_and_cleared() {
        let hub = StateHub::default();
        let mut ingestor = ingestor(&hub);
        let topic = "roomlink/site-01/motor/status";

        ingestor.handle(payload(topic, br#"{"state":"sideways"}"#));
        assert!(hub.snapshot().actuator_error.is_some());

        ingestor.handle(payload(
            topic,
            br#"{"state":"closed","message":"Door closed","timestamp":1700000000}"#,
        ));
        let state = hub.snapshot();
        assert!(state.actuator_error.is_none());
        assert_eq!(state.actuator.map(|a| a.state), Some(ActuatorState::Closed));
        assert_eq!(
            ingestor.controller.inspect(|m| m.reported_state()),
            Some(ActuatorState::Closed)
        );
    }

    #[test]
    fn test_image_replaces_previous_frame() {
        let hub = StateHub::default();
        let mut ingestor = ingestor(&hub);
        let topic = "roomlink/site-01/sensor/image";

        ingestor.handle(payload(topic, &[0xFF, 0xD8, 0xFF, 0xD9]));
        ingestor.handle(payload(topic, br#"{"image":"data:image/png;base64,AAAA"}"#));

        let image = hub.snapshot().image.unwrap();
        assert_eq!(image.embedded_content(), Some("data:image/png;base64,AAAA"));
        assert_eq!(ingestor.stats.images, 2);
    }
}
