use std::sync::Arc;

use axum::{extract::State, response::Json, Extension};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::services::history::HistoryEntry;
use crate::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    pub user_id: String,
    pub uploads: Vec<HistoryEntry>,
}

#[utoipa::path(
    get,
    path = "/api/v1/users/history",
    tag = "Users",
    responses(
        (status = 200, description = "Upload history for the authenticated user, newest first", body = HistoryResponse),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "State store unavailable")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<HistoryResponse>, AppError> {
    let uploads = state.history.list(&user.id).await?;

    tracing::info!(
        "Users | GET /users/history | user={} | count={} | res=200",
        user.id,
        uploads.len()
    );
    Ok(Json(HistoryResponse {
        user_id: user.id,
        uploads,
    }))
}
