//! Publishable series sets.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesHistory {
    pub start: DateTime<FixedOffset>,
    pub last: DateTime<FixedOffset>,
    pub interval: String,
    pub data: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSeries {
    pub id: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub units: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_tech: Option<String>,
    pub history: SeriesHistory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSet {
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub created_at: DateTime<FixedOffset>,
    pub version: String,
    pub data: Vec<OutputSeries>,
}

impl OutputSet {
    /// Appends `other`'s series after this set's series. Ids are not deduplicated.
    pub fn append(&mut self, other: OutputSet) {
        self.data.extend(other.data);
    }

    pub fn series_by_id(&self, id: &str) -> Option<&OutputSeries> {
        self.data.iter().find(|series| series.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.data.iter().map(|series| series.id.as_str()).collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
