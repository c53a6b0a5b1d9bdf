use crate::document::ReadingDocument;
use crate::error::{Result, SnapshotError};
use crate::store::{DocumentStore, WindowSubscription};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use roomlink_config::FirestoreConfig;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Firestore REST 文档存储
///
/// REST 接口没有实时监听，`watch` 按固定间隔重新查询，窗口变化时才推送。
#[derive(Clone)]
pub struct FirestoreStore {
    client: reqwest::Client,
    documents_url: String,
    collection: String,
    bearer_token: Option<String>,
    refresh_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    document: Option<FirestoreDocument>,
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    name: String,

    #[serde(default)]
    fields: Map<String, Value>,

    #[serde(rename = "createTime")]
    create_time: Option<String>,
}

impl FirestoreStore {
    pub fn new(config: &FirestoreConfig, collection: &str) -> Result<Self> {
        if config.project_id.trim().is_empty() {
            return Err(SnapshotError::Config("firestore.project_id is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            documents_url: format!(
                "{}/projects/{}/databases/{}/documents",
                config.base_url.trim_end_matches('/'),
                config.project_id,
                config.database
            ),
            collection: collection.to_string(),
            bearer_token: config.bearer_token.clone(),
            refresh_interval: Duration::from_millis(config.refresh_interval_ms.max(100)),
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn query_body(&self, limit: usize) -> Value {
        json!({
            "structuredQuery": {
                "from": [{ "collectionId": self.collection }],
                "orderBy": [{
                    "field": { "fieldPath": "created_at" },
                    "direction": "DESCENDING"
                }],
                "limit": limit
            }
        })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SnapshotError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn recent(&self, limit: usize) -> Result<Vec<ReadingDocument>> {
        let url = format!("{}:runQuery", self.documents_url);
        let response = self
            .authorized(self.client.post(&url))
            .json(&self.query_body(limit))
            .send()
            .await?;
        let items: Vec<RunQueryItem> = Self::check(response).await?.json().await?;

        let documents = items
            .into_iter()
            .filter_map(|item| item.document)
            .filter_map(|doc| match parse_document(&doc) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    debug!(document = %doc.name, error = %e, "Skipping malformed document");
                    None
                }
            })
            .collect();
        Ok(documents)
    }

    async fn add(&self, document: ReadingDocument) -> Result<()> {
        let url = format!("{}/{}", self.documents_url, self.collection);
        let response = self
            .authorized(self.client.post(&url))
            .json(&json!({ "fields": encode_fields(&document)? }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    fn watch(&self, limit: usize) -> WindowSubscription {
        let store = self.clone();
        let (tx, rx) = mpsc::channel(8);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(store.refresh_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_window: Option<Vec<ReadingDocument>> = None;
            let mut last_error: Option<String> = None;

            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    _ = ticker.tick() => {}
                }

                let update = match store.recent(limit).await {
                    Ok(window) => {
                        last_error = None;
                        if last_window.as_ref() == Some(&window) {
                            continue;
                        }
                        last_window = Some(window.clone());
                        Ok(window)
                    }
                    Err(e) => {
                        let reason = e.to_string();
                        last_window = None;
                        if last_error.as_deref() == Some(reason.as_str()) {
                            continue;
                        }
                        warn!(error = %reason, "Firestore query failed");
                        last_error = Some(reason);
                        Err(e)
                    }
                };

                if tx.send(update).await.is_err() {
                    break;
                }
            }
            debug!("Firestore watch ended");
        });

        WindowSubscription::new(rx, task)
    }

    fn name(&self) -> &str {
        "firestore"
    }
}

fn parse_document(doc: &FirestoreDocument) -> Result<ReadingDocument> {
    let value = doc
        .fields
        .get("value")
        .and_then(decode_number)
        .ok_or_else(|| SnapshotError::Malformed("missing numeric value".to_string()))?;

    let kind = doc
        .fields
        .get("type")
        .and_then(|v| v.get("stringValue"))
        .and_then(Value::as_str)
        .ok_or_else(|| SnapshotError::Malformed("missing type".to_string()))?;

    let created_at = doc
        .fields
        .get("created_at")
        .and_then(|v| v.get("timestampValue"))
        .and_then(Value::as_str)
        .or(doc.create_time.as_deref())
        .ok_or_else(|| SnapshotError::Malformed("missing created_at".to_string()))?;
    let created_at = DateTime::parse_from_rfc3339(created_at)
        .map_err(|e| SnapshotError::Malformed(format!("created_at: {}", e)))?
        .with_timezone(&Utc);

    Ok(ReadingDocument::new(kind, value, created_at))
}

fn decode_number(value: &Value) -> Option<f64> {
    if let Some(v) = value.get("doubleValue") {
        return v.as_f64();
    }
    if let Some(v) = value.get("integerValue") {
        return match v {
            Value::String(s) => s.parse::<i64>().ok().map(|n| n as f64),
            other => other.as_f64(),
        };
    }
    value
        .get("booleanValue")
        .and_then(Value::as_bool)
        .map(|b| if b { 1.0 } else { 0.0 })
}

fn encode_fields(document: &ReadingDocument) -> Result<Value> {
    let created_at = document
        .created_at
        .to_datetime()
        .ok_or_else(|| SnapshotError::Malformed("created_at out of range".to_string()))?;

    Ok(json!({
        "value": { "doubleValue": document.value },
        "type": { "stringValue": document.kind },
        "created_at": { "timestampValue": created_at.to_rfc3339_opts(SecondsFormat::Nanos, true) }
    }))
}
