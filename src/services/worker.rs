use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use uuid::Uuid;

use crate::error::ProcessError;
use crate::models::transaction::Status;
use crate::services::history::HistoryEntry;
use crate::state::AppState;
use crate::utils::audio_processor;

const TERMINAL_WRITE_ATTEMPTS: u32 = 3;
const TERMINAL_WRITE_BACKOFF: Duration = Duration::from_millis(500);

/// One unit of background work, handed off by the upload handler.
#[derive(Debug)]
pub struct ProcessingJob {
    pub transaction_id: Uuid,
    pub file_path: String,
    pub user_id: String,
    pub filename: String,
}

/// Drain the bounded job queue, running up to `worker_concurrency` jobs at a
/// time. Jobs for different transactions are independent; each job is
/// sequential within itself.
pub fn spawn_dispatcher(
    state: Arc<AppState>,
    mut rx: mpsc::Receiver<ProcessingJob>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let permits = Arc::new(Semaphore::new(state.config.worker_concurrency));
        tracing::info!(
            concurrency = state.config.worker_concurrency,
            "Background processor started"
        );

        while let Some(job) = rx.recv().await {
            let permit = match permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let state = state.clone();
            tokio::spawn(async move {
                let _permit = permit;
                process_job(&state, job).await;
            });
        }
    })
}

/// Run one job to a terminal state. Every pipeline failure, including the
/// wall-clock deadline, is converted into a status-`error` write; only a
/// failure of the status-write mechanism itself can leave the transaction
/// in `processing`, and that is retried and then logged at error level.
pub async fn process_job(state: &AppState, job: ProcessingJob) {
    let transaction_id = job.transaction_id;
    tracing::info!(
        transaction_id = %transaction_id,
        file_path = %job.file_path,
        user_id = %job.user_id,
        "Processing | job started"
    );

    if let Err(e) = state
        .tracker
        .create_or_update(transaction_id, Status::Processing, None)
        .await
    {
        // The job still has to end in a terminal state; hand the failure to
        // the retrying terminal writer rather than leaving the transaction
        // in pending.
        tracing::error!(
            transaction_id = %transaction_id,
            error = %e,
            "Failed to mark transaction as processing, aborting job"
        );
        write_terminal(
            state,
            transaction_id,
            Status::Error,
            json!({ "error": format!("Processing could not be started: {}", e) }),
        )
        .await;
        return;
    }

    let deadline = Duration::from_secs(state.config.processing_timeout);
    let (status, metadata) =
        match tokio::time::timeout(deadline, run_pipeline(state, &job)).await {
            Ok(Ok(metadata)) => (Status::Completed, metadata),
            Ok(Err(e)) => {
                tracing::warn!(transaction_id = %transaction_id, error = %e, "Processing failed");
                (Status::Error, json!({ "error": e.to_string() }))
            }
            Err(_) => {
                let e = ProcessError::Timeout(state.config.processing_timeout);
                tracing::warn!(transaction_id = %transaction_id, error = %e, "Processing timed out");
                (Status::Error, json!({ "error": e.to_string() }))
            }
        };

    write_terminal(state, transaction_id, status, metadata.clone()).await;

    // Best-effort history notification; never reverts the terminal status.
    let entry = HistoryEntry {
        transaction_id: transaction_id.to_string(),
        filename: Some(job.filename.clone()),
        status: status.as_str().to_string(),
        duration: metadata.get("duration").and_then(|v| v.as_f64()),
        sample_rate: metadata
            .get("sample_rate")
            .and_then(|v| v.as_u64())
            .map(|v| v as u32),
        timestamp: Utc::now(),
    };
    if let Err(e) = state.history.record(&job.user_id, &entry).await {
        tracing::warn!(
            transaction_id = %transaction_id,
            user_id = %job.user_id,
            error = %e,
            "Failed to record upload history"
        );
    }

    tracing::info!(transaction_id = %transaction_id, status = %status, "Processing | job finished");
}

/// decode -> validate duration -> resample -> persist WAV -> classify.
/// Partial artifacts from a failed run are not cleaned up.
async fn run_pipeline(
    state: &AppState,
    job: &ProcessingJob,
) -> Result<serde_json::Value, ProcessError> {
    let bytes = state
        .storage
        .read(&job.file_path)
        .await
        .map_err(|e| ProcessError::Storage(e.to_string()))?;

    let extension = Path::new(&job.file_path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_string());

    let decoded = tokio::task::spawn_blocking(move || {
        audio_processor::decode_audio(bytes, extension.as_deref())
    })
    .await
    .map_err(|e| ProcessError::Decode(format!("decode task failed: {}", e)))??;

    let duration = decoded.duration_seconds;
    let source_channels = decoded.channels;
    let max = state.config.max_duration_seconds;
    if duration > max {
        return Err(ProcessError::DurationExceeded { actual: duration, max });
    }

    let source_rate = decoded.sample_rate;
    let target_rate = state.config.sample_rate;
    let classifier = state.classifier.clone();
    let samples = decoded.samples;

    let (wav, predictions) = tokio::task::spawn_blocking(
        move || -> Result<(Vec<u8>, Option<Vec<f32>>), ProcessError> {
            let resampled = audio_processor::resample(&samples, source_rate, target_rate)?;
            let wav = audio_processor::encode_wav(&resampled, target_rate)?;
            let predictions = classifier.classify(&resampled, target_rate);
            Ok((wav, predictions))
        },
    )
    .await
    .map_err(|e| ProcessError::Resample(format!("transform task failed: {}", e)))??;

    let processed_path = state
        .storage
        .save(&wav, "processed.wav", "audio/wav")
        .await
        .map_err(|e| ProcessError::Storage(e.to_string()))?;

    let mut metadata = json!({
        "filename": job.filename,
        "duration": duration,
        "sample_rate": target_rate,
        "channels": source_channels,
        "processed_path": processed_path,
    });
    if let Some(sequence) = predictions {
        metadata["predictions"] = json!({
            "length": sequence.len(),
            "sequence": sequence,
        });
    }

    Ok(metadata)
}

/// Bounded retry for the terminal status write; exhaustion is the
/// log-and-alert escalation path for an unreachable store.
async fn write_terminal(
    state: &AppState,
    transaction_id: Uuid,
    status: Status,
    metadata: serde_json::Value,
) {
    for attempt in 1..=TERMINAL_WRITE_ATTEMPTS {
        match state
            .tracker
            .create_or_update(transaction_id, status, Some(metadata.clone()))
            .await
        {
            Ok(()) => return,
            Err(e) => {
                tracing::warn!(
                    transaction_id = %transaction_id,
                    status = %status,
                    attempt,
                    error = %e,
                    "Terminal status write failed"
                );
                if attempt < TERMINAL_WRITE_ATTEMPTS {
                    sleep(TERMINAL_WRITE_BACKOFF).await;
                }
            }
        }
    }
    tracing::error!(
        transaction_id = %transaction_id,
        status = %status,
        "Giving up on terminal status write; transaction may appear stuck in processing"
    );
}
