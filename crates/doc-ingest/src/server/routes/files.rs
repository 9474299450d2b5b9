//! File upload and management endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::service::Upload;
use crate::types::FileRecord;

/// Header carrying the caller identity
pub const USER_ID_HEADER: &str = "x-user-id";

fn user_id(headers: &HeaderMap) -> String {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("anonymous")
        .to_string()
}

/// Unknown or malformed ids are both reported as not found
fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).map_err(|_| Error::NotFound(id.to_string()))
}

/// POST /api/v1/files - Upload one file (multipart field `file`)
pub async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<FileRecord>> {
    let user = user_id(&headers);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidRequest(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| Error::InvalidRequest("file field has no filename".to_string()))?;
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidRequest(format!("Failed to read file: {}", e)))?;

        let record = state
            .service()
            .upload(
                &user,
                Upload {
                    filename,
                    content_type,
                    data: data.to_vec(),
                },
            )
            .await?;
        return Ok(Json(record));
    }

    Err(Error::InvalidRequest("missing multipart field `file`".to_string()))
}

/// GET /api/v1/files - List all file records
pub async fn list_files(State(state): State<AppState>) -> Json<Vec<FileRecord>> {
    Json(state.service().list())
}

/// GET /api/v1/files/:id - Get one file record
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FileRecord>> {
    let id = parse_id(&id)?;
    state.service().get(&id).map(Json)
}

/// GET /api/v1/files/:id/content - Logical content of a file
pub async fn get_file_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = parse_id(&id)?;
    let record = state.service().get(&id)?;
    let path = state.service().content_path(&id)?;
    let data = tokio::fs::read(&path).await?;

    let content_type = record
        .meta
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let disposition = format!("inline; filename=\"{}\"", record.meta.name.replace('"', ""));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    ))
}

/// DELETE /api/v1/files/:id - Unregister a file
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let id = parse_id(&id)?;
    state.service().delete(&id)?;
    Ok(Json(json!({ "message": "File deleted successfully" })))
}

/// DELETE /api/v1/files/all - Remove every record and stored file
pub async fn delete_all_files(State(state): State<AppState>) -> Result<Json<Value>> {
    let deleted = state.service().delete_all().await?;
    Ok(Json(json!({
        "message": "All files deleted successfully",
        "deleted": deleted
    })))
}
