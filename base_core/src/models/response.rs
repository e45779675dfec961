//! Response bodies for the HTTP facade

use serde::{Deserialize, Serialize};

use crate::storage::FileMetadata;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileListQuery {
    pub prefix: Option<String>,
    pub max_results: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<FileMetadata>,
    pub count: usize,
    pub prefix: String,
    pub max_results: i64,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_id: String,
    pub provider: String,
    pub metadata: Option<FileMetadata>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub file_id: String,
    pub deleted: bool,
}
