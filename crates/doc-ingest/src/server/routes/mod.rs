//! API routes for the ingestion server

pub mod files;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/files",
            get(files::list_files)
                .post(files::upload_file)
                .layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/files/all", delete(files::delete_all_files))
        .route("/files/:id", get(files::get_file).delete(files::delete_file))
        .route("/files/:id/content", get(files::get_file_content))
}
