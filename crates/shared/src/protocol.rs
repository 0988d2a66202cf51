use serde::{Deserialize, Serialize};

use crate::domain::{McNumber, PhoneNumber};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Success,
    Error,
}

/// Envelope status of a bulk attempt. `PartialSuccess` is a valid outcome,
/// not a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Success,
    PartialSuccess,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub count: usize,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PlaceCallRequest {
    pub phone_number: PhoneNumber,
    pub mc_number: McNumber,
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceCallResponse {
    pub status: CallStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voicemail: Option<String>,
}

/// One target of a bulk attempt, derived at submit time by joining the
/// selection against the carrier store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BulkCallItem {
    pub phone_number: PhoneNumber,
    pub mc_number: McNumber,
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkCallRequest {
    pub items: Vec<BulkCallItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkItemResult {
    pub item: BulkCallItem,
    pub status: CallStatus,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkCallResponse {
    pub status: BatchStatus,
    pub results: Vec<BulkItemResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LogCallRequest {
    pub phone_number: PhoneNumber,
    pub mc_number: McNumber,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogCallAck {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScrapeRequest {
    pub start_id: u64,
    pub end_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResponse {
    pub message: String,
}
