mod audio;
mod files;
mod home;
mod users;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

// Define the OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // General endpoints
        home::root,
        home::health,
        // Audio processing endpoints
        audio::upload_audio,
        audio::get_status,
        // User endpoints
        users::get_history,
        // Peripheral file endpoints
        files::upload_file,
    ),
    components(
        schemas(
            home::RootResponse,
            home::HealthResponse,
            audio::UploadResponse,
            audio::TransactionStatusResponse,
            users::HistoryResponse,
            crate::models::transaction::Status,
            crate::models::file::FileRecord,
            crate::models::file::FileType,
            crate::models::file::FileStatus,
            crate::services::history::HistoryEntry,
        )
    ),
    tags(
        (name = "General", description = "Service banner and health checks"),
        (name = "Audio", description = "Audio upload and transaction status tracking"),
        (name = "Users", description = "Per-user upload history"),
        (name = "Files", description = "Generic audio/video file uploads")
    ),
    info(
        title = "SoundGate API",
        version = "0.1.0",
        description = "Audio upload and classification backend with transactional processing-state tracking",
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

// Add security scheme for JWT Bearer tokens
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(
                utoipa::openapi::security::Http::new(
                    utoipa::openapi::security::HttpAuthScheme::Bearer
                )
            ),
        );
    }
}

pub fn create_routes(state: Arc<AppState>) -> Router {
    // Swagger UI (stateless)
    let swagger_router: Router = SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into();

    // API routes that require a verified bearer token
    let api_routes = Router::new()
        .route("/audio/upload", post(audio::upload_audio))
        .route("/audio/status/{transaction_id}", get(audio::get_status))
        .route("/users/history", get(users::get_history))
        .route("/files/upload", post(files::upload_file))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Public routes (no auth required) and merge all together.
    // Uploads can exceed axum's default body limit, so raise it to the
    // configured maximum plus multipart framing slack.
    let app_routes = Router::new()
        .route("/", get(home::root))
        .route("/health", get(home::health))
        .nest("/api/v1", api_routes)
        .layer(DefaultBodyLimit::max(state.config.max_upload_size + 1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Merge Swagger UI (which has no state) with the rest
    Router::new()
        .merge(swagger_router)
        .merge(app_routes)
}
