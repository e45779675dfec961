//! Derives [`FileMetadata`] from what the filesystem reports about a path.

use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::Path;

use super::models::FileMetadata;

/// Content type for a file name, looked up by extension. Unknown or missing
/// extensions map to `application/octet-stream`.
pub fn content_type_for(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Reads size and timestamps for `path` and labels the result `file_name`.
///
/// Filesystems that do not record a creation time report the modification
/// time in its place.
pub fn derive_metadata(path: &Path, file_name: &str) -> io::Result<FileMetadata> {
    let fs_meta = fs::metadata(path)?;

    let modified_at: DateTime<Utc> = fs_meta
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    let created_at: DateTime<Utc> = fs_meta
        .created()
        .map(DateTime::<Utc>::from)
        .unwrap_or(modified_at);

    let size_bytes = i64::try_from(fs_meta.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "file size exceeds i64"))?;

    FileMetadata::new(
        file_name,
        content_type_for(file_name),
        size_bytes,
        created_at,
        modified_at,
    )
    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_type_lookup() {
        assert_eq!(content_type_for("photo.png"), "image/png");
        assert_eq!(content_type_for("photo.JPG"), "image/jpeg");
        assert_eq!(content_type_for("notes.txt"), "text/plain");
        assert_eq!(content_type_for("report.pdf"), "application/pdf");
        assert_eq!(content_type_for("nested/dir/data.json"), "application/json");
        assert_eq!(content_type_for("doc1"), "application/octet-stream");
        assert_eq!(content_type_for("blob.unknownext"), "application/octet-stream");
    }

    #[test]
    fn test_derive_metadata() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hello.txt");
        fs::write(&path, b"hello").unwrap();

        let metadata = derive_metadata(&path, "hello.txt").unwrap();
        assert_eq!(metadata.file_name(), "hello.txt");
        assert_eq!(metadata.content_type(), "text/plain");
        assert_eq!(metadata.size_bytes(), 5);
        assert!(metadata.created_at() <= Utc::now());
        assert!(metadata.checksum().is_none());
        assert!(metadata.tags().is_empty());
    }

    #[test]
    fn test_derive_metadata_missing_path() {
        let dir = TempDir::new().unwrap();
        let err = derive_metadata(&dir.path().join("missing"), "missing").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
