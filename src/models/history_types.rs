use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One stored prediction event. Only `label` is checked; `dataUrl`, `t` and
/// any other members are kept exactly as the client sent them.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HistoryEntry {
    pub label: String,
    #[serde(rename = "dataUrl", default, skip_serializing_if = "Option::is_none")]
    pub data_url: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HistoryEntry {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data_url: None,
            t: None,
            extra: Map::new(),
        }
    }

    pub fn at(mut self, t: i64) -> Self {
        self.t = Some(Value::from(t));
        self
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntry>,
}
