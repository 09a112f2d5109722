use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    response::Json,
    Extension,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::file::{FileRecord, FileStatus, FileType};
use crate::state::AppState;

fn file_type_for(content_type: &str) -> Result<FileType, AppError> {
    if content_type.starts_with("audio/") {
        Ok(FileType::Audio)
    } else if content_type.starts_with("video/") {
        Ok(FileType::Video)
    } else {
        Err(AppError::BadRequest(
            "Unsupported file type. Only audio and video files are allowed.".to_string(),
        ))
    }
}

fn short_id(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &id[..8])
}

#[utoipa::path(
    post,
    path = "/api/v1/files/upload",
    tag = "Files",
    request_body(content = Vec<u8>, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File uploaded successfully", body = FileRecord),
        (status = 400, description = "Bad Request"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<FileRecord>, AppError> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut title: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::BadRequest("Invalid multipart data".to_string()))?
    {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("unknown").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(|_| {
                    AppError::InternalServerError("Failed to read file bytes".to_string())
                })?;
                file = Some((filename, content_type, data.to_vec()));
            }
            Some("title") => {
                title = field.text().await.ok();
            }
            _ => {}
        }
    }

    let (filename, content_type, data) =
        file.ok_or_else(|| AppError::BadRequest("No file field found".to_string()))?;
    let title = title.ok_or_else(|| AppError::BadRequest("No title field found".to_string()))?;

    let file_type = file_type_for(&content_type)?;
    if data.len() > state.config.max_upload_size {
        return Err(AppError::FileTooLarge(format!(
            "File size ({:.2}MB) exceeds maximum allowed size ({:.0}MB)",
            data.len() as f64 / (1024.0 * 1024.0),
            state.config.max_upload_size as f64 / (1024.0 * 1024.0)
        )));
    }

    state.storage.save(&data, &filename, &content_type).await?;

    let now = Utc::now();
    let record = FileRecord {
        id: short_id("file"),
        title,
        file_type,
        status: FileStatus::Processing,
        upload_date: now,
        expiry_date: now + Duration::days(30),
        transaction_id: short_id("tx_upload"),
    };

    tracing::info!(
        "Files | POST /files/upload | user={} | file={} | res=200",
        user.id,
        record.id
    );
    Ok(Json(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_and_video_types_are_accepted() {
        assert_eq!(file_type_for("audio/mpeg").unwrap(), FileType::Audio);
        assert_eq!(file_type_for("video/mp4").unwrap(), FileType::Video);
        assert!(file_type_for("image/png").is_err());
    }

    #[test]
    fn short_ids_carry_the_prefix() {
        let id = short_id("file");
        assert!(id.starts_with("file_"));
        assert_eq!(id.len(), "file_".len() + 8);
    }
}
