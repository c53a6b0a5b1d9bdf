use async_trait::async_trait;
use roomlink_actuator::{ActuatorAction, BlockReason, CommandOutcome};
use roomlink_config::{RoomlinkConfig, SnapshotConfig};
use roomlink_core::{ConnectionStatus, DashboardEvent, DashboardState};
use roomlink_dashboard::Session;
use roomlink_snapshot::{DocTimestamp, DocumentStore, MemoryStore, ReadingDocument};
use roomlink_transport::{
    BrokerClient, Connector, LinkDriver, LinkEvent, QosLevel, ReconnectPolicy, Result,
    TransportError,
};
use roomlink_types::{ActuatorState, MotorSpeed, SensorKind};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Clone, Default)]
struct RecordingClient {
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingClient {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrokerClient for RecordingClient {
    async fn subscribe(&self, topic: &str, _qos: QosLevel) -> Result<()> {
        self.calls.lock().unwrap().push(format!("subscribe {}", topic));
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("unsubscribe {}", topic));
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>, _qos: QosLevel) -> Result<()> {
        let body = String::from_utf8_lossy(&payload).into_owned();
        self.calls
            .lock()
            .unwrap()
            .push(format!("publish {} {}", topic, body));
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.calls.lock().unwrap().push("disconnect".to_string());
        Ok(())
    }
}

/// 由测试推送链路事件
struct ChannelDriver {
    rx: mpsc::UnboundedReceiver<Result<LinkEvent>>,
}

#[async_trait]
impl LinkDriver for ChannelDriver {
    async fn poll(&mut self) -> Result<LinkEvent> {
        match self.rx.recv().await {
            Some(step) => step,
            None => std::future::pending().await,
        }
    }
}

struct Harness {
    session: Session,
    client: RecordingClient,
    link: mpsc::UnboundedSender<Result<LinkEvent>>,
}

impl Harness {
    async fn start(config: RoomlinkConfig, store: Option<Arc<dyn DocumentStore>>) -> Self {
        let client = RecordingClient::default();
        let (link, rx) = mpsc::unbounded_channel();
        let (connector, events) = Connector::with_link(
            client.clone(),
            ChannelDriver { rx },
            ReconnectPolicy::fixed(Duration::from_millis(20)),
            64,
        );
        let session = Session::assemble(&config, connector, events, store)
            .await
            .unwrap();
        Self {
            session,
            client,
            link,
        }
    }

    fn send(&self, event: Result<LinkEvent>) {
        self.link.send(event).unwrap();
    }

    fn message(&self, suffix: &str, body: &[u8]) {
        self.send(Ok(LinkEvent::Message {
            topic: format!("roomlink/site-01/{}", suffix),
            payload: body.to_vec().into(),
        }));
    }

    async fn wait_for<F>(&self, predicate: F) -> DashboardState
    where
        F: Fn(&DashboardState) -> bool,
    {
        for _ in 0..200 {
            let state = self.session.state();
            if predicate(&state) {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached: {:?}", self.session.state());
    }
}

fn doc(kind: &str, value: f64, seconds: i64) -> ReadingDocument {
    ReadingDocument::new(
        kind,
        value,
        DocTimestamp {
            seconds,
            nanoseconds: 0,
        },
    )
}

fn push_only() -> RoomlinkConfig {
    RoomlinkConfig {
        snapshot: SnapshotConfig {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn test_subscribes_inbound_topics_on_connect() {
    let harness = Harness::start(push_only(), None).await;
    assert!(harness.client.calls().is_empty());

    harness.send(Ok(LinkEvent::Connected));
    harness.wait_for(|s| s.is_connected()).await;

    let calls = harness.client.calls();
    for topic in ["sensor/data", "sensor/image", "motor/status"] {
        assert!(calls.contains(&format!("subscribe roomlink/site-01/{}", topic)));
    }
    assert!(!calls.iter().any(|c| c.contains("motor/control")));
}

#[tokio::test]
async fn test_mixed_stream_reduces_into_state() {
    let harness = Harness::start(push_only(), None).await;
    harness.send(Ok(LinkEvent::Connected));

    harness.message("sensor/data", br#"{"type":"temp","value":21.5}"#);
    harness.message("sensor/data", b"garbage");
    harness.message("sensor/data", br#"{"type":"people_count","value":4}"#);
    harness.message("sensor/image", &[0xFF, 0xD8, 0xFF, 0xD9]);
    harness.message(
        "motor/status",
        br#"{"state":"opening","message":"Opening","timestamp":1700000000.5,"position":{"current_steps":300,"total_steps":2048,"percentage":14.6,"is_moving":true}}"#,
    );

    let state = harness
        .wait_for(|s| s.actuator.is_some() && s.image.is_some())
        .await;
    assert_eq!(state.sensors.get(SensorKind::Temperature), Some(21.5));
    assert_eq!(state.sensors.get(SensorKind::PeopleCount), Some(4.0));
    assert_eq!(state.charts[&SensorKind::PeopleCount].len(), 1);
    assert!(state.actuator_error.is_none());
    assert!(state.transport_error.is_none());
    assert_eq!(harness.session.metrics().decode_failures, 1);

    let guards = harness.session.guards();
    assert!(!guards.open);
    assert!(guards.stop);

    harness.session.shutdown().await;
}

#[tokio::test]
async fn test_malformed_status_is_surfaced() {
    let harness = Harness::start(push_only(), None).await;
    let mut events = harness.session.subscribe_events();
    harness.send(Ok(LinkEvent::Connected));
    harness.message("motor/status", b"{\"state\":");

    let state = harness.wait_for(|s| s.actuator_error.is_some()).await;
    assert!(state.actuator.is_none());

    loop {
        match events.recv().await.unwrap() {
            DashboardEvent::DecodeFailed { topic, excerpt, .. } => {
                assert_eq!(topic, "roomlink/site-01/motor/status");
                assert_eq!(excerpt, "{\"state\":");
                break;
            }
            _ => continue,
        }
    }
}

#[tokio::test]
async fn test_offline_reports_error_and_recovers() {
    let harness = Harness::start(push_only(), None).await;
    harness.send(Ok(LinkEvent::Connected));
    harness.wait_for(|s| s.is_connected()).await;

    harness.send(Err(TransportError::Connection("connection reset".to_string())));
    let state = harness
        .wait_for(|s| s.connection == ConnectionStatus::Offline)
        .await;
    assert_eq!(state.transport_error.as_deref(), Some("MQTT broker offline"));

    let blocked = harness
        .session
        .command(ActuatorAction::Open, None)
        .await
        .unwrap();
    assert_eq!(blocked, CommandOutcome::Blocked(BlockReason::Disconnected));

    harness.send(Ok(LinkEvent::Connected));
    let state = harness.wait_for(|s| s.is_connected()).await;
    assert!(state.transport_error.is_none());

    let subscribes = harness
        .client
        .calls()
        .iter()
        .filter(|c| c.starts_with("subscribe roomlink/site-01/sensor/data"))
        .count();
    assert_eq!(subscribes, 2);
}

#[tokio::test]
async fn test_command_published_on_control_topic() {
    let harness = Harness::start(push_only(), None).await;
    harness.send(Ok(LinkEvent::Connected));
    harness.wait_for(|s| s.is_connected()).await;

    let outcome = harness
        .session
        .command(ActuatorAction::Close, Some(MotorSpeed::Normal))
        .await
        .unwrap();
    assert!(outcome.is_sent());
    assert!(harness.client.calls().contains(
        &r#"publish roomlink/site-01/motor/control {"action":"close","speed":"normal"}"#
            .to_string()
    ));

    harness.message(
        "motor/status",
        br#"{"state":"closing","message":"Closing","timestamp":1700000001}"#,
    );
    harness
        .wait_for(|s| s.actuator.as_ref().map(|a| a.state) == Some(ActuatorState::Closing))
        .await;
    let blocked = harness
        .session
        .command(ActuatorAction::Close, None)
        .await
        .unwrap();
    assert_eq!(blocked, CommandOutcome::Blocked(BlockReason::AlreadyClosing));
}

#[tokio::test]
async fn test_snapshot_path_reconciles_store_window() {
    let store = MemoryStore::with_documents(vec![
        doc("temp", 19.0, 1_700_000_000),
        doc("temp", 20.0, 1_700_000_060),
        doc("humid", 55.0, 1_700_000_030),
    ]);
    let config = RoomlinkConfig {
        snapshot: SnapshotConfig {
            log_readings: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let harness = Harness::start(config, Some(Arc::new(store.clone()))).await;

    let state = harness.wait_for(|s| s.snapshot.is_some()).await;
    let snapshot = state.snapshot.unwrap();
    assert_eq!(snapshot.get(SensorKind::Temperature), Some(20.0));
    assert_eq!(snapshot.get(SensorKind::Humidity), Some(55.0));
    assert_eq!(state.snapshot_charts[&SensorKind::Temperature].len(), 2);
    assert!(state.snapshot_error.is_none());

    // 推送路径的读数经记录器写回存储，快照随之更新
    harness.send(Ok(LinkEvent::Connected));
    harness.message("sensor/data", br#"{"type":"sound","value":62}"#);
    harness
        .wait_for(|s| s.snapshot.and_then(|st| st.get(SensorKind::Sound)) == Some(62.0))
        .await;
    assert_eq!(store.len(), 4);

    let summary = harness.session.shutdown().await;
    assert!(summary.cleanup.is_clean());
    assert_eq!(summary.ingest.map(|s| s.logged), Some(1));
}

#[tokio::test]
async fn test_shutdown_releases_transport_and_listener() {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let harness = Harness::start(RoomlinkConfig::default(), Some(store)).await;
    harness.send(Ok(LinkEvent::Connected));
    harness.wait_for(|s| s.is_connected()).await;

    let client = harness.client.clone();
    let summary = harness.session.shutdown().await;

    assert_eq!(
        summary.cleanup.released,
        vec!["snapshot-listener", "transport", "ingest"]
    );
    let calls = client.calls();
    assert!(calls.contains(&"unsubscribe roomlink/site-01/motor/status".to_string()));
    assert_eq!(calls.last().map(String::as_str), Some("disconnect"));
    assert!(summary.ingest.unwrap().events >= 1);
}

#[tokio::test]
async fn test_start_from_config_file_without_broker() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roomlink.toml");
    std::fs::write(
        &path,
        r#"
[transport]
endpoint = "mqtt://127.0.0.1:1"
reconnect_interval_ms = 50

[topics]
namespace = "lab/room-7"

[snapshot]
enabled = false
"#,
    )
    .unwrap();

    let config = roomlink_config::ConfigLoader::new(&path).load().unwrap();
    let session = Session::start(&config).await.unwrap();
    assert_eq!(session.topics().motor_control, "lab/room-7/motor/control");
    assert!(!session.state().is_connected());

    let summary = session.shutdown().await;
    assert_eq!(summary.cleanup.released, vec!["transport", "ingest"]);
}
