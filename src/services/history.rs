use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::services::store::{StateStore, StoreError};

fn user_key(user_id: &str) -> String {
    format!("user:{}", user_id)
}

/// One upload summary in a user's history. Metadata only, never file content.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntry {
    pub transaction_id: String,
    pub filename: Option<String>,
    pub status: String,
    pub duration: Option<f64>,
    pub sample_rate: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

/// Per-user upload history, kept under `user:<id>` with one field per
/// transaction. Writes are best-effort from the background processor's
/// point of view: a failure here never reverts a terminal transaction status.
#[derive(Clone)]
pub struct UserHistory {
    store: StateStore,
}

impl UserHistory {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }

    pub async fn record(&self, user_id: &str, entry: &HistoryEntry) -> Result<(), StoreError> {
        let value = serde_json::to_string(entry)
            .map_err(|e| StoreError(format!("failed to serialize history entry: {}", e)))?;
        self.store
            .put_field(&user_key(user_id), &entry.transaction_id, value)
            .await
    }

    /// All history entries for a user, newest first. Entries that fail to
    /// parse are skipped rather than failing the whole listing.
    pub async fn list(&self, user_id: &str) -> Result<Vec<HistoryEntry>, StoreError> {
        let fields = self.store.get_fields(&user_key(user_id)).await?;
        let mut entries: Vec<HistoryEntry> = fields
            .values()
            .filter_map(|raw| serde_json::from_str(raw).ok())
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tx: &str, ts: DateTime<Utc>) -> HistoryEntry {
        HistoryEntry {
            transaction_id: tx.to_string(),
            filename: Some("clip.wav".to_string()),
            status: "completed".to_string(),
            duration: Some(2.0),
            sample_rate: Some(16000),
            timestamp: ts,
        }
    }

    #[tokio::test]
    async fn record_and_list_round_trip() {
        let history = UserHistory::new(StateStore::memory());
        let now = Utc::now();

        history.record("u1", &entry("tx-1", now)).await.unwrap();
        history
            .record("u1", &entry("tx-2", now + chrono::Duration::seconds(5)))
            .await
            .unwrap();

        let entries = history.list("u1").await.unwrap();
        assert_eq!(entries.len(), 2);
        // Newest first
        assert_eq!(entries[0].transaction_id, "tx-2");
        assert_eq!(entries[1].transaction_id, "tx-1");

        assert!(history.list("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_entries_are_skipped() {
        let store = StateStore::memory();
        let history = UserHistory::new(store.clone());

        history.record("u1", &entry("tx-1", Utc::now())).await.unwrap();
        store
            .put_field(&user_key("u1"), "tx-bad", "not json".to_string())
            .await
            .unwrap();

        let entries = history.list("u1").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].transaction_id, "tx-1");
    }
}
