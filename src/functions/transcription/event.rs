//! CloudEvent decoding for storage object-finalized notifications

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::FunctionError;
use crate::Result;

/// Metadata of the Cloud Storage object that triggered the event
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageObjectData {
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "int_or_string")]
    pub generation: Option<i64>,
    #[serde(default, deserialize_with = "int_or_string")]
    pub metageneration: Option<i64>,
    #[serde(default)]
    pub time_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default, deserialize_with = "int_or_string")]
    pub size: Option<i64>,
}

/// A storage event with its envelope attributes
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct StorageEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub data: StorageObjectData,
}

/// Storage APIs encode 64-bit counters as JSON strings
fn int_or_string<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Str(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Int(value)) => Ok(Some(value)),
        Some(Raw::Str(value)) if value.is_empty() => Ok(None),
        Some(Raw::Str(value)) => value
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("not an integer: {}", value))),
    }
}

impl StorageEvent {
    /// Decode a structured-mode CloudEvent (`application/cloudevents+json`)
    pub fn from_structured(body: &[u8]) -> Result<Self> {
        let event: StorageEvent = serde_json::from_slice(body)
            .map_err(|e| FunctionError::validation(format!("invalid event payload: {}", e)))?;
        event.check()
    }

    /// Decode an HTTP delivery in either binary or structured mode
    pub fn from_http(headers: &HeaderMap, body: &[u8]) -> Result<Self> {
        let content_type = header(headers, "content-type").unwrap_or_default();
        if content_type.starts_with("application/cloudevents") {
            return Self::from_structured(body);
        }

        let data: StorageObjectData = serde_json::from_slice(body)
            .map_err(|e| FunctionError::validation(format!("invalid event payload: {}", e)))?;

        StorageEvent {
            id: header(headers, "ce-id").unwrap_or_default(),
            event_type: header(headers, "ce-type").unwrap_or_default(),
            source: header(headers, "ce-source").unwrap_or_default(),
            subject: header(headers, "ce-subject"),
            data,
        }
        .check()
    }

    fn check(self) -> Result<Self> {
        if self.data.bucket.is_empty() || self.data.name.is_empty() {
            return Err(FunctionError::validation("event data is missing bucket or object name"));
        }
        Ok(self)
    }

    /// Log every envelope and object field
    pub fn log(&self) {
        tracing::info!(
            event_id = %self.id,
            event_type = %self.event_type,
            source = %self.source,
            bucket = %self.data.bucket,
            file = %self.data.name,
            generation = ?self.data.generation,
            metageneration = ?self.data.metageneration,
            created = ?self.data.time_created,
            updated = ?self.data.updated,
            "Storage event received"
        );
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
