use serde::{Deserialize, Serialize};

/// `?key=` query for viewing-history operations.
#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryKeysResponse {
    pub keys: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntryResponse {
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct PutConfigRequest {
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ConfigValueResponse {
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct SavedResponse {
    pub message: &'static str,
}
