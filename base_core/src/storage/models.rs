use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{BaseError, Result};

/// Snapshot of a stored file's attributes, read fresh from the backing
/// store each time it is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetadata {
    file_name: String,
    content_type: String,
    size_bytes: i64,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    checksum: Option<String>,
    tags: BTreeMap<String, String>,
}

impl FileMetadata {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        size_bytes: i64,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
    ) -> Result<Self> {
        let file_name = file_name.into();
        if file_name.trim().is_empty() {
            return Err(BaseError::InvalidArgument(
                "File name cannot be blank".to_string(),
            ));
        }
        if size_bytes < 0 {
            return Err(BaseError::InvalidArgument(format!(
                "File size cannot be negative: {}",
                size_bytes
            )));
        }

        let content_type = content_type.into();
        let content_type = if content_type.trim().is_empty() {
            mime::APPLICATION_OCTET_STREAM.to_string()
        } else {
            content_type
        };

        Ok(Self {
            file_name,
            content_type,
            size_bytes,
            created_at,
            modified_at,
            checksum: None,
            tags: BTreeMap::new(),
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size_bytes(&self) -> i64 {
        self.size_bytes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn with_file_name(&self, file_name: impl Into<String>) -> Result<Self> {
        let file_name = file_name.into();
        if file_name.trim().is_empty() {
            return Err(BaseError::InvalidArgument(
                "File name cannot be blank".to_string(),
            ));
        }
        Ok(Self {
            file_name,
            ..self.clone()
        })
    }

    pub fn with_content_type(&self, content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            ..self.clone()
        }
    }

    pub fn with_checksum(&self, checksum: impl Into<String>) -> Self {
        Self {
            checksum: Some(checksum.into()),
            ..self.clone()
        }
    }

    pub fn with_tag(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut tags = self.tags.clone();
        tags.insert(key.into(), value.into());
        Self {
            tags,
            ..self.clone()
        }
    }

    /// Returns a copy whose tags are the union of the existing and the given
    /// tags; given tags win on key collisions.
    pub fn with_tags(&self, tags: &BTreeMap<String, String>) -> Self {
        let mut merged = self.tags.clone();
        merged.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self {
            tags: merged,
            ..self.clone()
        }
    }

    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
    }

    pub fn is_empty(&self) -> bool {
        self.size_bytes == 0
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    pub fn is_text(&self) -> bool {
        self.content_type.starts_with("text/")
            || self.content_type == mime::APPLICATION_JSON.essence_str()
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type == mime::APPLICATION_PDF.essence_str()
    }

    pub fn has_checksum(&self) -> bool {
        self.checksum.as_deref().is_some_and(|c| !c.is_empty())
    }

    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }
}

/// Content handed to an upload.
pub enum UploadContent {
    Bytes(Vec<u8>),
    Stream(Box<dyn Read + Send>),
    File(PathBuf),
}

impl fmt::Debug for UploadContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadContent::Bytes(data) => write!(f, "Bytes({} bytes)", data.len()),
            UploadContent::Stream(_) => write!(f, "Stream"),
            UploadContent::File(path) => write!(f, "File({})", path.display()),
        }
    }
}

impl From<Vec<u8>> for UploadContent {
    fn from(data: Vec<u8>) -> Self {
        UploadContent::Bytes(data)
    }
}

impl From<&[u8]> for UploadContent {
    fn from(data: &[u8]) -> Self {
        UploadContent::Bytes(data.to_vec())
    }
}

impl From<PathBuf> for UploadContent {
    fn from(path: PathBuf) -> Self {
        UploadContent::File(path)
    }
}

/// Representation a download should be materialised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Bytes,
    Stream,
    File,
}

pub enum DownloadContent {
    Bytes(Vec<u8>),
    Stream(Box<dyn Read + Send>),
    File(PathBuf),
}

impl fmt::Debug for DownloadContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadContent::Bytes(data) => write!(f, "Bytes({} bytes)", data.len()),
            DownloadContent::Stream(_) => write!(f, "Stream"),
            DownloadContent::File(path) => write!(f, "File({})", path.display()),
        }
    }
}

impl DownloadContent {
    pub fn kind(&self) -> ContentKind {
        match self {
            DownloadContent::Bytes(_) => ContentKind::Bytes,
            DownloadContent::Stream(_) => ContentKind::Stream,
            DownloadContent::File(_) => ContentKind::File,
        }
    }

    /// Reads the content fully into memory whatever its representation.
    pub fn into_bytes(self) -> std::io::Result<Vec<u8>> {
        match self {
            DownloadContent::Bytes(data) => Ok(data),
            DownloadContent::Stream(mut reader) => {
                let mut data = Vec::new();
                reader.read_to_end(&mut data)?;
                Ok(data)
            }
            DownloadContent::File(path) => std::fs::read(path),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub success: bool,
    pub file_id: String,
    pub location: Option<PathBuf>,
    pub metadata: Option<FileMetadata>,
    pub error_message: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl UploadResult {
    pub fn success(file_id: impl Into<String>, location: PathBuf, metadata: FileMetadata) -> Self {
        Self {
            success: true,
            file_id: file_id.into(),
            location: Some(location),
            metadata: Some(metadata),
            error_message: None,
            uploaded_at: Utc::now(),
        }
    }

    pub fn failure(file_id: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            file_id: file_id.into(),
            location: None,
            metadata: None,
            error_message: Some(error_message.into()),
            uploaded_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success && self.error_message.is_none()
    }
}

#[derive(Debug)]
pub struct DownloadResult {
    pub success: bool,
    pub file_id: String,
    pub content: Option<DownloadContent>,
    pub metadata: Option<FileMetadata>,
    pub error_message: Option<String>,
}

impl DownloadResult {
    pub fn success(file_id: impl Into<String>, content: DownloadContent, metadata: FileMetadata) -> Self {
        Self {
            success: true,
            file_id: file_id.into(),
            content: Some(content),
            metadata: Some(metadata),
            error_message: None,
        }
    }

    pub fn failure(file_id: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            file_id: file_id.into(),
            content: None,
            metadata: None,
            error_message: Some(error_message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success && self.content.is_some()
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.content {
            Some(DownloadContent::Bytes(data)) => Some(data),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Result<Vec<u8>> {
        let file_id = self.file_id;
        let content = self.content.ok_or_else(|| {
            BaseError::NotFound(format!("No content downloaded for {}", file_id))
        })?;
        content
            .into_bytes()
            .map_err(|e| BaseError::storage(format!("Failed to read content of {}", file_id), e))
    }
}
