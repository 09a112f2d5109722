use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::transaction::{Status, StatusRecord};
use crate::services::store::StateStore;

fn transaction_key(id: Uuid) -> String {
    format!("transaction:{}", id)
}

/// Owns the mapping from transaction id to transaction state.
///
/// Writes are verified by an immediate read-back: the store is reached over a
/// network and a write that cannot be confirmed is reported as
/// `StoreUnavailable` rather than assumed successful. Status writes are
/// infrequent relative to request volume, so the extra round trip is cheap.
///
/// The tracker also enforces transition legality: a write that would regress
/// the ordering `pending < processing < {completed, error}`, or flip one
/// terminal state into the other, is rejected with `IllegalTransition`.
/// Re-writing the current status (a metadata refresh) is allowed.
#[derive(Clone)]
pub struct TransactionTracker {
    store: StateStore,
}

impl TransactionTracker {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }

    /// Idempotently write the full status record for `transaction_id`,
    /// creating it on first call. `metadata` replaces the previous metadata
    /// wholesale; `None` writes an empty object.
    pub async fn create_or_update(
        &self,
        transaction_id: Uuid,
        status: Status,
        metadata: Option<serde_json::Value>,
    ) -> Result<(), AppError> {
        let key = transaction_key(transaction_id);

        let current = self.store.get_fields(&key).await?;
        if let Some(existing) = current.get("status").and_then(|s| Status::parse(s)) {
            let illegal = status.rank() < existing.rank()
                || (existing.is_terminal() && status != existing);
            if illegal {
                return Err(AppError::IllegalTransition(format!(
                    "Illegal status transition for transaction {}: {} -> {}",
                    transaction_id, existing, status
                )));
            }
        }

        let metadata_json = match metadata {
            Some(value) => value.to_string(),
            None => "{}".to_string(),
        };
        let fields = [
            ("status", status.as_str().to_string()),
            ("updated_at", Utc::now().to_rfc3339()),
            ("metadata", metadata_json),
        ];
        self.store.put_fields(&key, &fields).await?;

        // Read-back verification: silent write loss is a real failure mode.
        let stored = self.store.get_fields(&key).await?;
        if stored.get("status").map(String::as_str) != Some(status.as_str()) {
            return Err(AppError::StoreUnavailable(format!(
                "write for transaction {} could not be confirmed",
                transaction_id
            )));
        }

        tracing::debug!(
            transaction_id = %transaction_id,
            status = %status,
            "Transaction status updated"
        );
        Ok(())
    }

    /// Current status record, or `NotFound` for ids never written.
    ///
    /// Malformed stored metadata degrades to an empty object and a malformed
    /// timestamp degrades to the Unix epoch; neither hides a valid status.
    pub async fn read(&self, transaction_id: Uuid) -> Result<StatusRecord, AppError> {
        let key = transaction_key(transaction_id);

        if !self.store.exists(&key).await? {
            return Err(AppError::NotFound(format!(
                "Transaction not found: {}",
                transaction_id
            )));
        }

        let fields = self.store.get_fields(&key).await?;
        if fields.is_empty() {
            // Key existed a moment ago but holds no fields; treat as never written.
            return Err(AppError::NotFound(format!(
                "Transaction not found: {}",
                transaction_id
            )));
        }

        let status = fields
            .get("status")
            .and_then(|s| Status::parse(s))
            .ok_or_else(|| {
                AppError::InternalServerError(format!(
                    "transaction {} has no valid status field",
                    transaction_id
                ))
            })?;

        let updated_at = fields
            .get("updated_at")
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| {
                tracing::warn!(
                    transaction_id = %transaction_id,
                    "Stored updated_at is missing or unparseable"
                );
                DateTime::<Utc>::UNIX_EPOCH
            });

        let metadata = fields
            .get("metadata")
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_else(|| {
                tracing::warn!(
                    transaction_id = %transaction_id,
                    "Stored metadata is not valid JSON, returning empty object"
                );
                serde_json::json!({})
            });

        Ok(StatusRecord { status, updated_at, metadata })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tracker() -> (TransactionTracker, StateStore) {
        let store = StateStore::memory();
        (TransactionTracker::new(store.clone()), store)
    }

    #[tokio::test]
    async fn first_write_creates_the_record() {
        let (tracker, _) = tracker();
        let id = Uuid::new_v4();

        tracker
            .create_or_update(id, Status::Pending, Some(json!({"filename": "a.wav"})))
            .await
            .unwrap();

        let record = tracker.read(id).await.unwrap();
        assert_eq!(record.status, Status::Pending);
        assert_eq!(record.metadata["filename"], "a.wav");
    }

    #[tokio::test]
    async fn unknown_id_reports_not_found() {
        let (tracker, _) = tracker();
        match tracker.read(Uuid::new_v4()).await {
            Err(AppError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other.map(|r| r.status)),
        }
    }

    #[tokio::test]
    async fn metadata_round_trips() {
        let (tracker, _) = tracker();
        let id = Uuid::new_v4();

        tracker
            .create_or_update(id, Status::Completed, Some(json!({"a": 1})))
            .await
            .unwrap();

        let record = tracker.read(id).await.unwrap();
        assert_eq!(record.metadata, json!({"a": 1}));
    }

    #[tokio::test]
    async fn corrupt_metadata_degrades_to_empty_object() {
        let (tracker, store) = tracker();
        let id = Uuid::new_v4();

        tracker.create_or_update(id, Status::Pending, None).await.unwrap();
        store
            .put_field(&transaction_key(id), "metadata", "{not json".to_string())
            .await
            .unwrap();

        let record = tracker.read(id).await.unwrap();
        assert_eq!(record.status, Status::Pending);
        assert_eq!(record.metadata, json!({}));
    }

    #[tokio::test]
    async fn metadata_is_replaced_wholesale() {
        let (tracker, _) = tracker();
        let id = Uuid::new_v4();

        tracker
            .create_or_update(id, Status::Pending, Some(json!({"filename": "a.wav"})))
            .await
            .unwrap();
        tracker
            .create_or_update(id, Status::Processing, Some(json!({"step": 1})))
            .await
            .unwrap();

        let record = tracker.read(id).await.unwrap();
        assert_eq!(record.metadata, json!({"step": 1}));
    }

    #[tokio::test]
    async fn regressions_are_rejected() {
        let (tracker, _) = tracker();
        let id = Uuid::new_v4();

        tracker.create_or_update(id, Status::Processing, None).await.unwrap();
        match tracker.create_or_update(id, Status::Pending, None).await {
            Err(AppError::IllegalTransition(_)) => {}
            other => panic!("expected IllegalTransition, got {:?}", other),
        }

        tracker.create_or_update(id, Status::Completed, None).await.unwrap();
        match tracker.create_or_update(id, Status::Error, None).await {
            Err(AppError::IllegalTransition(_)) => {}
            other => panic!("expected IllegalTransition, got {:?}", other),
        }

        // The terminal state is still observable and unchanged.
        assert_eq!(tracker.read(id).await.unwrap().status, Status::Completed);
    }

    #[tokio::test]
    async fn same_status_rewrite_is_idempotent() {
        let (tracker, _) = tracker();
        let id = Uuid::new_v4();

        tracker.create_or_update(id, Status::Error, Some(json!({"error": "x"}))).await.unwrap();
        tracker.create_or_update(id, Status::Error, Some(json!({"error": "y"}))).await.unwrap();

        let record = tracker.read(id).await.unwrap();
        assert_eq!(record.status, Status::Error);
        assert_eq!(record.metadata["error"], "y");
    }

    #[tokio::test]
    async fn updated_at_is_monotonic() {
        let (tracker, _) = tracker();
        let id = Uuid::new_v4();

        tracker.create_or_update(id, Status::Pending, None).await.unwrap();
        let first = tracker.read(id).await.unwrap().updated_at;

        tracker.create_or_update(id, Status::Processing, None).await.unwrap();
        let second = tracker.read(id).await.unwrap().updated_at;

        assert!(second >= first);
    }
}
