use crate::error::{DecodeError, Result};
use crate::route::{TopicRoute, TopicRouter};
use roomlink_logging::{LogSampler, SamplingStrategy};
use roomlink_types::{ActuatorStatus, ImageFrame, SensorKind, SensorReading};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, warn};

/// 诊断用原始载荷摘录的默认长度（字节）
const DEFAULT_EXCERPT_LEN: usize = 64;

/// 设备端不带 `type` 字段时按人数计数处理
const DEFAULT_SENSOR_TAG: &str = "people_count";

/// 解码结果
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedMessage {
    Sensor(SensorReading),
    Image(ImageFrame),
    Actuator(ActuatorStatus),
    /// 格式正确但没有可用内容（例如不含 `image` 字段的 JSON）
    Ignored { topic: String, reason: String },
    Unrecognized(DecodeFailure),
}

/// 解码失败详情
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeFailure {
    pub topic: String,
    pub route: Option<TopicRoute>,
    pub error: DecodeError,
    /// 截断后的原始载荷
    pub excerpt: String,
}

impl DecodeFailure {
    /// 电机状态解析失败需要提示给使用方，其余只记录日志
    pub fn is_surfaced(&self) -> bool {
        self.route == Some(TopicRoute::ActuatorStatus)
    }
}

#[derive(Debug, Deserialize)]
struct SensorPayload {
    #[serde(rename = "type")]
    kind: Option<String>,
    value: Value,
}

/// 载荷解码器
///
/// 按主题路由表分发；单条坏消息只产生 `Unrecognized`，不会中断接收循环。
pub struct Decoder {
    router: TopicRouter,
    sampler: LogSampler,
    excerpt_len: usize,
}

impl Decoder {
    pub fn new(router: TopicRouter) -> Self {
        Self {
            router,
            sampler: LogSampler::new(SamplingStrategy::RateLimit(5)),
            excerpt_len: DEFAULT_EXCERPT_LEN,
        }
    }

    pub fn with_sampler(mut self, sampler: LogSampler) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_excerpt_len(mut self, excerpt_len: usize) -> Self {
        self.excerpt_len = excerpt_len;
        self
    }

    pub fn router(&self) -> &TopicRouter {
        &self.router
    }

    pub fn decode(&self, topic: &str, payload: &[u8]) -> DecodedMessage {
        let route = match self.router.route(topic) {
            Some(route) => route,
            None => {
                debug!(topic = %topic, "Message on unrouted topic");
                return self.failure(topic, None, DecodeError::UnknownTopic(topic.to_string()), payload);
            }
        };

        match route {
            TopicRoute::SensorData => match decode_sensor(payload) {
                Ok(reading) => DecodedMessage::Sensor(reading),
                Err(e) => {
                    if let Some(suppressed) = self.sampler.sample() {
                        warn!(topic = %topic, error = %e, suppressed, "Dropping sensor reading");
                    }
                    self.failure(topic, Some(route), e, payload)
                }
            },
            TopicRoute::SensorImage => decode_image(topic, payload),
            TopicRoute::ActuatorStatus => match decode_status(payload) {
                Ok(status) => DecodedMessage::Actuator(status),
                Err(e) => {
                    error!(topic = %topic, error = %e, "Failed to decode actuator status");
                    self.failure(topic, Some(route), e, payload)
                }
            },
        }
    }

    fn failure(
        &self,
        topic: &str,
        route: Option<TopicRoute>,
        error: DecodeError,
        payload: &[u8],
    ) -> DecodedMessage {
        DecodedMessage::Unrecognized(DecodeFailure {
            topic: topic.to_string(),
            route,
            error,
            excerpt: excerpt(payload, self.excerpt_len),
        })
    }
}

/// `{type, value}`，值可以是数字、布尔或数字字符串
fn decode_sensor(payload: &[u8]) -> Result<SensorReading> {
    let parsed: SensorPayload = serde_json::from_slice(payload)?;
    let tag = parsed.kind.as_deref().unwrap_or(DEFAULT_SENSOR_TAG);
    let kind: SensorKind = tag
        .parse()
        .map_err(|_| DecodeError::UnknownSensorType(tag.to_string()))?;

    let value = match &parsed.value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
    .ok_or_else(|| DecodeError::InvalidValue(parsed.value.to_string()))?;

    Ok(SensorReading::new(kind, value))
}

/// 先按 JSON 信封解析，失败则整体视为原始图像字节
fn decode_image(topic: &str, payload: &[u8]) -> DecodedMessage {
    match serde_json::from_slice::<Value>(payload) {
        Ok(envelope) => match envelope.get("image") {
            Some(Value::String(image)) if !image.is_empty() => {
                DecodedMessage::Image(ImageFrame::embedded(image.as_str()))
            }
            _ => {
                debug!(topic = %topic, "JSON frame envelope without image field");
                DecodedMessage::Ignored {
                    topic: topic.to_string(),
                    reason: "JSON envelope without image field".to_string(),
                }
            }
        },
        Err(_) => DecodedMessage::Image(ImageFrame::raw(payload.to_vec())),
    }
}

fn decode_status(payload: &[u8]) -> Result<ActuatorStatus> {
    let mut status: ActuatorStatus = serde_json::from_slice(payload)
        .map_err(|e| DecodeError::InvalidStatus(e.to_string()))?;
    status.position = status.position.map(|p| p.clamped());
    Ok(status)
}

fn excerpt(payload: &[u8], max_len: usize) -> String {
    if payload.len() <= max_len {
        return String::from_utf8_lossy(payload).into_owned();
    }
    format!("{}...", String::from_utf8_lossy(&payload[..max_len]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomlink_config::TopicConfig;
    use roomlink_types::{ActuatorState, FrameEncoding};

    fn decoder() -> (Decoder, roomlink_config::TopicSet) {
        let topics = TopicConfig::default().resolve();
        (Decoder::new(TopicRouter::from_topics(&topics)), topics)
    }

    #[test]
    fn test_decode_sensor_reading() {
        let (decoder, topics) = decoder();
        match decoder.decode(&topics.sensor_data, br#"{"type": "temp", "value": 23}"#) {
            DecodedMessage::Sensor(reading) => {
                assert_eq!(reading.kind, SensorKind::Temperature);
                assert_eq!(reading.value, 23.0);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_decode_boolean_and_string_values() {
        let (decoder, topics) = decoder();
        let door = decoder.decode(&topics.sensor_data, br#"{"type":"door_open","value":true}"#);
        assert!(matches!(door, DecodedMessage::Sensor(r) if r.value == 1.0));

        let tvoc = decoder.decode(&topics.sensor_data, br#"{"type":"totalVOC","value":"120.5"}"#);
        assert!(matches!(tvoc, DecodedMessage::Sensor(r) if r.kind == SensorKind::TotalVoc && r.value == 120.5));
    }

    #[test]
    fn test_missing_type_defaults_to_people_count() {
        let (decoder, topics) = decoder();
        let decoded = decoder.decode(&topics.sensor_data, br#"{"value": 4}"#);
        assert!(matches!(decoded, DecodedMessage::Sensor(r) if r.kind == SensorKind::PeopleCount));
    }

    #[test]
    fn test_unknown_sensor_type_is_not_surfaced() {
        let (decoder, topics) = decoder();
        match decoder.decode(&topics.sensor_data, br#"{"type":"pressure","value":1013}"#) {
            DecodedMessage::Unrecognized(failure) => {
                assert_eq!(failure.error, DecodeError::UnknownSensorType("pressure".to_string()));
                assert!(!failure.is_surfaced());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_image_embedded_in_json() {
        let (decoder, topics) = decoder();
        match decoder.decode(&topics.sensor_image, br#"{"image":"AAA"}"#) {
            DecodedMessage::Image(frame) => {
                assert_eq!(frame.encoding, FrameEncoding::EmbeddedInJson);
                assert_eq!(frame.embedded_content(), Some("AAA"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_image_raw_fallback_keeps_exact_bytes() {
        let (decoder, topics) = decoder();
        let jpeg: [u8; 8] = [0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, 0x4a, 0x46];
        match decoder.decode(&topics.sensor_image, &jpeg) {
            DecodedMessage::Image(frame) => {
                assert_eq!(frame.encoding, FrameEncoding::Raw);
                assert_eq!(frame.bytes, jpeg.to_vec());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_empty_image_payload_falls_back_to_raw() {
        let (decoder, topics) = decoder();
        match decoder.decode(&topics.sensor_image, b"") {
            DecodedMessage::Image(frame) => {
                assert_eq!(frame.encoding, FrameEncoding::Raw);
                assert!(frame.is_empty());
                assert_eq!(frame.to_data_url(), "data:image/jpeg;base64,");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_image_envelope_without_field_is_ignored() {
        let (decoder, topics) = decoder();
        let decoded = decoder.decode(&topics.sensor_image, br#"{"frame_id": 7}"#);
        assert!(matches!(decoded, DecodedMessage::Ignored { .. }));
    }

    #[test]
    fn test_actuator_status_failure_is_surfaced() {
        let (decoder, topics) = decoder();
        match decoder.decode(&topics.motor_status, b"{\"state\": \"spinning\"}") {
            DecodedMessage::Unrecognized(failure) => {
                assert!(failure.is_surfaced());
                assert!(matches!(failure.error, DecodeError::InvalidStatus(_)));
                assert_eq!(failure.excerpt, "{\"state\": \"spinning\"}");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_actuator_status_clamps_percentage() {
        let (decoder, topics) = decoder();
        let payload = br#"{"state":"open","message":"Door open","timestamp":1700000000,
            "position":{"current_steps":2048,"total_steps":2048,"percentage":100.4,"is_moving":false}}"#;
        match decoder.decode(&topics.motor_status, payload) {
            DecodedMessage::Actuator(status) => {
                assert_eq!(status.state, ActuatorState::Open);
                assert_eq!(status.position.unwrap().percentage, 100.0);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_topic_truncates_excerpt() {
        let (decoder, _) = decoder();
        let decoder = decoder.with_excerpt_len(4);
        match decoder.decode("elsewhere/topic", b"0123456789") {
            DecodedMessage::Unrecognized(failure) => {
                assert_eq!(failure.route, None);
                assert_eq!(failure.excerpt, "0123...");
                assert_eq!(failure.error, DecodeError::UnknownTopic("elsewhere/topic".to_string()));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
