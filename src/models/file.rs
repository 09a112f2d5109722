use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Processing,
    Ready,
    Error,
}

/// Record returned by the peripheral file-upload endpoint. Uploaded files
/// carry a 30-day expiry; cleanup itself is a storage policy, not ours.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FileRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub status: FileStatus,
    #[serde(rename = "uploadDate")]
    pub upload_date: DateTime<Utc>,
    #[serde(rename = "expiryDate")]
    pub expiry_date: DateTime<Utc>,
    pub transaction_id: String,
}
