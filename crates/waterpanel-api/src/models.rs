// Wire models for both data sources.
//
// Field names follow the remote systems exactly (PascalCase for the tag
// web service, camelCase for the MQTT raw-data payload).

use serde::{Deserialize, Serialize};

// ── REST tag service ─────────────────────────────────────────────────

/// Request body for a tag read: `{"Tags":[{"Name":"Flow_1"}, ...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagReadRequest {
    #[serde(rename = "Tags")]
    pub tags: Vec<TagName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagName {
    #[serde(rename = "Name")]
    pub name: String,
}

impl TagReadRequest {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: names
                .into_iter()
                .map(|n| TagName { name: n.into() })
                .collect(),
        }
    }
}

/// Response body of a tag read.
///
/// `Values` is the one accepted shape. Older service revisions answered with
/// a `Tags` array instead; such bodies fail to deserialize on purpose.
#[derive(Debug, Clone, Deserialize)]
pub struct TagValuesResponse {
    #[serde(rename = "Values")]
    pub values: Vec<TagValue>,
}

impl TagValuesResponse {
    /// Look up a tag by exact name.
    pub fn find(&self, name: &str) -> Option<&TagValue> {
        self.values.iter().find(|t| t.name == name)
    }
}

/// One `{Name, Value}` entry. The value is kept as raw JSON because status
/// tags are not always numeric.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TagValue {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value", default)]
    pub value: serde_json::Value,
}

impl TagValue {
    pub fn as_f64(&self) -> Option<f64> {
        self.value.as_f64()
    }
}

// ── MQTT raw data ────────────────────────────────────────────────────

/// Payload published on `/v1/device/+/rawdata`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDataMessage {
    #[serde(rename = "dataBA")]
    pub data: Vec<RawDataPoint>,
}

impl RawDataMessage {
    pub fn find(&self, label: &str) -> Option<&RawDataPoint> {
        self.data.iter().find(|p| p.label == label)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawDataPoint {
    pub label: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl RawDataPoint {
    pub fn as_f64(&self) -> Option<f64> {
        self.value.as_f64()
    }
}
