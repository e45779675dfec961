//! File storage handlers

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::{
    error::{BaseError, Result},
    models::{DeleteResponse, FileListQuery, FileListResponse, UploadResponse},
    security::Principal,
    storage::{ContentKind, FileMetadata, UploadContent},
    AppState,
};

pub const READ_PERMISSION: &str = "READ";
pub const WRITE_PERMISSION: &str = "WRITE";
pub const DELETE_PERMISSION: &str = "DELETE";

pub const CHECKSUM_HEADER: &str = "x-checksum";
/// Headers starting with this prefix are stored as tags, minus the prefix.
pub const TAG_HEADER_PREFIX: &str = "x-tag-";

#[derive(Debug, Deserialize)]
pub struct CopyRequest {
    pub source: String,
    pub target: String,
}

fn require_permission(state: &AppState, principal: &Principal, permission: &str) -> Result<()> {
    if principal.is_admin() {
        return Ok(());
    }
    state.authorization.check_permission(principal, permission)
}

/// Builds the caller-declared metadata from request headers. Returns `None`
/// when the request declares nothing beyond the defaults.
fn declared_metadata(file_id: &str, headers: &HeaderMap) -> Result<Option<FileMetadata>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let checksum = headers
        .get(CHECKSUM_HEADER)
        .and_then(|value| value.to_str().ok());
    let tags: Vec<(String, String)> = headers
        .iter()
        .filter_map(|(name, value)| {
            let key = name.as_str().strip_prefix(TAG_HEADER_PREFIX)?;
            Some((key.to_string(), value.to_str().ok()?.to_string()))
        })
        .collect();

    if content_type.is_empty() && checksum.is_none() && tags.is_empty() {
        return Ok(None);
    }

    let now = Utc::now();
    let mut metadata = FileMetadata::new(file_id, content_type, 0, now, now)?;
    if let Some(checksum) = checksum {
        metadata = metadata.with_checksum(checksum);
    }
    for (key, value) in tags {
        metadata = metadata.with_tag(key, value);
    }
    Ok(Some(metadata))
}

pub async fn upload_file(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(file_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    require_permission(&state, &principal, WRITE_PERMISSION)?;

    let storage = state.default_storage()?;
    let declared = declared_metadata(&file_id, &headers)?;
    let result = storage
        .upload(file_id.clone(), UploadContent::Bytes(body.to_vec()), declared)
        .await?;

    if !result.is_success() {
        return Err(BaseError::Internal(
            result.error_message.unwrap_or_else(|| "Upload failed".to_string()),
        ));
    }

    info!(
        "User {} uploaded {} ({} bytes)",
        principal.username,
        file_id,
        body.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            file_id,
            provider: storage.provider_name().to_string(),
            metadata: result.metadata,
        }),
    ))
}

pub async fn download_file(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(file_id): Path<String>,
) -> Result<Response> {
    require_permission(&state, &principal, READ_PERMISSION)?;

    let downloaded = state
        .default_storage()?
        .download(file_id, ContentKind::Bytes)
        .await?;

    let content_type = downloaded
        .metadata
        .as_ref()
        .and_then(|metadata| HeaderValue::from_str(metadata.content_type()).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    let data = downloaded.into_bytes()?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(data.len()));

    Ok((StatusCode::OK, headers, data).into_response())
}

pub async fn delete_file(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(file_id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    require_permission(&state, &principal, DELETE_PERMISSION)?;

    let deleted = state.default_storage()?.delete(file_id.clone()).await?;
    if deleted {
        info!("User {} deleted {}", principal.username, file_id);
    }

    Ok(Json(DeleteResponse { file_id, deleted }))
}

pub async fn file_exists(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(file_id): Path<String>,
) -> Result<StatusCode> {
    require_permission(&state, &principal, READ_PERMISSION)?;

    let exists = state.default_storage()?.exists(file_id).await?;
    Ok(if exists {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    })
}

pub async fn get_metadata(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(file_id): Path<String>,
) -> Result<Json<FileMetadata>> {
    require_permission(&state, &principal, READ_PERMISSION)?;

    state
        .default_storage()?
        .get_metadata(file_id.clone())
        .await?
        .map(Json)
        .ok_or_else(|| BaseError::NotFound(format!("File not found: {}", file_id)))
}

pub async fn list_files(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<FileListQuery>,
) -> Result<Json<FileListResponse>> {
    require_permission(&state, &principal, READ_PERMISSION)?;

    let prefix = query.prefix.unwrap_or_default();
    let max_results = query.max_results.unwrap_or(state.max_list_results);
    let files = state
        .default_storage()?
        .list_files(prefix.clone(), max_results)
        .await?;

    Ok(Json(FileListResponse {
        count: files.len(),
        files,
        prefix,
        max_results,
    }))
}

pub async fn copy_file(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CopyRequest>,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    require_permission(&state, &principal, READ_PERMISSION)?;
    require_permission(&state, &principal, WRITE_PERMISSION)?;

    let storage = state.default_storage()?;
    let result = storage
        .copy(request.source.clone(), request.target.clone())
        .await?;

    info!(
        "User {} copied {} to {}",
        principal.username, request.source, request.target
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            file_id: request.target,
            provider: storage.provider_name().to_string(),
            metadata: result.metadata,
        }),
    ))
}

pub async fn current_principal(Extension(principal): Extension<Principal>) -> Json<Principal> {
    Json(principal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_metadata_from_headers() {
        let mut headers = HeaderMap::new();
        assert!(declared_metadata("a.bin", &headers).unwrap().is_none());

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"));
        headers.insert(CHECKSUM_HEADER, HeaderValue::from_static("abc123"));
        headers.insert("x-tag-owner", HeaderValue::from_static("ops"));

        let metadata = declared_metadata("a.bin", &headers).unwrap().unwrap();
        assert_eq!(metadata.content_type(), "text/csv");
        assert_eq!(metadata.checksum(), Some("abc123"));
        assert_eq!(metadata.tag("owner"), Some("ops"));
    }
}
