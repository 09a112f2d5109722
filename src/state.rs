use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::{Config, StateStoreBackend, StorageBackend};
use crate::error::AppError;
use crate::services::classifier::Classifier;
use crate::services::history::UserHistory;
use crate::services::storage::BlobStore;
use crate::services::store::StateStore;
use crate::services::tracker::TransactionTracker;
use crate::services::worker::ProcessingJob;

/// Shared application state, constructed once at startup and passed by
/// reference to handlers and the background dispatcher.
pub struct AppState {
    pub config: Config,
    pub store: StateStore,
    pub tracker: TransactionTracker,
    pub storage: BlobStore,
    pub classifier: Classifier,
    pub history: UserHistory,
    pub jobs: mpsc::Sender<ProcessingJob>,
}

impl AppState {
    /// Build all services and the bounded background queue. Returns the
    /// receiving end of the queue for the dispatcher to drain.
    pub async fn build(
        config: Config,
    ) -> Result<(Arc<Self>, mpsc::Receiver<ProcessingJob>), AppError> {
        let store = match config.state_store {
            StateStoreBackend::Redis => StateStore::connect_redis(&config).await?,
            StateStoreBackend::Memory => {
                tracing::warn!("Using in-memory state store; transaction state will not survive restarts");
                StateStore::memory()
            }
        };

        let storage = match config.storage_backend {
            StorageBackend::Local => BlobStore::local(&config.storage_path).await?,
            StorageBackend::S3 => BlobStore::s3(&config).await?,
        };

        let classifier = Classifier::from_config(&config);
        let (jobs, rx) = mpsc::channel(config.queue_capacity);

        let state = Arc::new(Self {
            tracker: TransactionTracker::new(store.clone()),
            history: UserHistory::new(store.clone()),
            store,
            storage,
            classifier,
            jobs,
            config,
        });

        Ok((state, rx))
    }
}
