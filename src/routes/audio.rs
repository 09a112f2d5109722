use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::transaction::Status;
use crate::services::validation;
use crate::services::worker::ProcessingJob;
use crate::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub transaction_id: Uuid,
    pub filename: String,
    pub timestamp: DateTime<Utc>,
    pub status: Status,
}

#[derive(Serialize, ToSchema)]
pub struct TransactionStatusResponse {
    pub transaction_id: Uuid,
    pub status: Status,
    pub updated_at: DateTime<Utc>,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
}

#[utoipa::path(
    post,
    path = "/api/v1/audio/upload",
    tag = "Audio",
    request_body(content = Vec<u8>, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Upload accepted, processing scheduled", body = UploadResponse),
        (status = 401, description = "Unauthorized"),
        (status = 413, description = "File too large"),
        (status = 415, description = "Unsupported audio format"),
        (status = 503, description = "State store unavailable or processing queue full")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_audio(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::BadRequest("Invalid multipart data".to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("unknown").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field.bytes().await.map_err(|_| {
                AppError::InternalServerError("Failed to read file bytes".to_string())
            })?;

            validation::validate_upload(&state.config, &content_type, data.len())?;

            let transaction_id = Uuid::new_v4();
            let timestamp = Utc::now();

            // The pending record must exist before the background task is
            // scheduled, so a client polling right after this returns never
            // sees NotFound.
            state
                .tracker
                .create_or_update(
                    transaction_id,
                    Status::Pending,
                    Some(json!({
                        "filename": filename,
                        "user_id": user.id,
                        "upload_time": timestamp.to_rfc3339(),
                    })),
                )
                .await?;

            let file_path = state
                .storage
                .save(&data, &filename, &content_type)
                .await?;

            let job = ProcessingJob {
                transaction_id,
                file_path,
                user_id: user.id.clone(),
                filename: filename.clone(),
            };
            if state.jobs.try_send(job).is_err() {
                // Bounded-queue policy: reject the upload rather than block,
                // and don't leave a dangling pending record behind.
                let _ = state
                    .tracker
                    .create_or_update(
                        transaction_id,
                        Status::Error,
                        Some(json!({ "error": "Upload rejected: processing queue is full" })),
                    )
                    .await;
                tracing::warn!(
                    transaction_id = %transaction_id,
                    "Audio | POST /audio/upload | res=503 | queue full"
                );
                return Err(AppError::ServiceUnavailable(
                    "Processing queue is full, try again later".to_string(),
                ));
            }

            tracing::info!(
                "Audio | POST /audio/upload | user={} | file={} | tx={} | res=200",
                user.id,
                filename,
                transaction_id
            );
            return Ok(Json(UploadResponse {
                transaction_id,
                filename,
                timestamp,
                status: Status::Pending,
            }));
        }
    }

    tracing::info!("Audio | POST /audio/upload | user={} | res=400 | No file field found", user.id);
    Err(AppError::BadRequest("No file field found".to_string()))
}

#[utoipa::path(
    get,
    path = "/api/v1/audio/status/{transaction_id}",
    tag = "Audio",
    params(
        ("transaction_id" = Uuid, Path, description = "Transaction id returned by the upload endpoint")
    ),
    responses(
        (status = 200, description = "Current transaction status", body = TransactionStatusResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Transaction not found"),
        (status = 503, description = "State store unavailable")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<TransactionStatusResponse>, AppError> {
    let record = state.tracker.read(transaction_id).await?;

    tracing::info!(
        "Audio | GET /audio/status/{} | user={} | status={} | res=200",
        transaction_id,
        user.id,
        record.status
    );
    Ok(Json(TransactionStatusResponse {
        transaction_id,
        status: record.status,
        updated_at: record.updated_at,
        metadata: record.metadata,
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::routes::create_routes;
    use crate::state::AppState;
    use crate::services::worker::ProcessingJob;
    use crate::utils::audio_processor::tests::sine_wav;

    const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

    #[derive(serde::Serialize)]
    struct TestClaims {
        sub: String,
        exp: usize,
    }

    fn bearer_token(secret: &str) -> String {
        let claims = TestClaims {
            sub: "user-1".to_string(),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_ref()),
        )
        .unwrap();
        format!("Bearer {}", token)
    }

    fn multipart_body(filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(token: &str, data: &[u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/audio/upload")
            .header(header::AUTHORIZATION, token)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body("clip.wav", "audio/wav", data)))
            .unwrap()
    }

    fn status_request(token: &str, transaction_id: &str) -> Request<Body> {
        Request::builder()
            .uri(format!("/api/v1/audio/status/{}", transaction_id))
            .header(header::AUTHORIZATION, token)
            .body(Body::empty())
            .unwrap()
    }

    // The dispatcher is deliberately not spawned: the queue receiver is held
    // so uploaded jobs sit in the channel and transactions stay pending.
    async fn test_app(
        dir: &tempfile::TempDir,
        queue_capacity: usize,
    ) -> (Router, tokio::sync::mpsc::Receiver<ProcessingJob>, String) {
        let mut config = Config::for_tests(dir.path().to_str().unwrap());
        config.queue_capacity = queue_capacity;
        let token = bearer_token(&config.jwt_secret);

        let (state, rx) = AppState::build(config).await.unwrap();
        (create_routes(state), rx, token)
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn status_read_right_after_upload_is_pending() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _rx, token) = test_app(&dir, 8).await;

        let response = app
            .clone()
            .oneshot(upload_request(&token, &sine_wav(1.0, 8000)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let upload = json_body(response).await;
        assert_eq!(upload["status"], "pending");
        let transaction_id = upload["transaction_id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(status_request(&token, &transaction_id))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let status = json_body(response).await;
        assert_eq!(status["status"], "pending");
        assert_eq!(status["metadata"]["user_id"], "user-1");
    }

    #[tokio::test]
    async fn upload_without_token_is_unauthorized() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _rx, _token) = test_app(&dir, 8).await;

        let mut request = upload_request("ignored", &sine_wav(1.0, 8000));
        request.headers_mut().remove(header::AUTHORIZATION);

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn full_queue_rejects_the_upload() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _rx, token) = test_app(&dir, 1).await;
        let wav = sine_wav(1.0, 8000);

        let first = app.clone().oneshot(upload_request(&token, &wav)).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let first_id = json_body(first).await["transaction_id"]
            .as_str()
            .unwrap()
            .to_string();

        let second = app.clone().oneshot(upload_request(&token, &wav)).await.unwrap();
        assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
        let error = json_body(second).await;
        assert!(error["error"].as_str().unwrap().contains("queue is full"));

        // The queued upload is untouched by the rejection.
        let response = app.oneshot(status_request(&token, &first_id)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "pending");
    }
}
