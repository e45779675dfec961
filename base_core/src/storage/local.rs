use std::fs;
use std::io::{self, BufReader};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::metadata::derive_metadata;
use super::models::{
    ContentKind, DownloadContent, DownloadResult, FileMetadata, UploadContent, UploadResult,
};
use super::FileStorage;
use crate::config::StorageConfig;
use crate::error::{BaseError, Result};

pub const LOCAL_PROVIDER: &str = "local";

/// Stores each file at `base_path/file_id`.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    base_path: PathBuf,
    auto_create_directories: bool,
    file_mode: Option<u32>,
    directory_mode: Option<u32>,
}

/// Parses a symbolic `rwxr-xr-x` style permission string into a mode.
pub fn parse_permissions(symbolic: &str) -> Result<u32> {
    let bytes = symbolic.as_bytes();
    if bytes.len() != 9 {
        return Err(BaseError::InvalidArgument(format!(
            "Permissions must have 9 characters: {}",
            symbolic
        )));
    }

    bytes.iter().zip(b"rwxrwxrwx").enumerate().try_fold(0u32, |mode, (i, (&c, &expected))| {
        match c {
            b'-' => Ok(mode),
            c if c == expected => Ok(mode | 1 << (8 - i)),
            _ => Err(BaseError::InvalidArgument(format!(
                "Invalid permission string: {}",
                symbolic
            ))),
        }
    })
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    match mode {
        Some(mode) => fs::set_permissions(path, fs::Permissions::from_mode(mode)),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: Option<u32>) -> io::Result<()> {
    Ok(())
}

impl LocalFileStorage {
    pub fn new(base_path: impl Into<PathBuf>, auto_create_directories: bool) -> Result<Self> {
        let base_path = base_path.into();

        if auto_create_directories && !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                BaseError::storage(
                    format!("Failed to create base directory {}", base_path.display()),
                    e,
                )
            })?;
        }

        info!(
            "Local file storage initialized at {} (auto_create_directories={})",
            base_path.display(),
            auto_create_directories
        );

        Ok(Self {
            base_path,
            auto_create_directories,
            file_mode: None,
            directory_mode: None,
        })
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let file_mode = parse_permissions(&config.file_permissions)?;
        let directory_mode = parse_permissions(&config.directory_permissions)?;
        Ok(Self::new(config.base_path.clone(), config.auto_create_directories)?
            .with_permissions(file_mode, directory_mode))
    }

    /// Modes applied to written files and to directories created for them.
    pub fn with_permissions(mut self, file_mode: u32, directory_mode: u32) -> Self {
        self.file_mode = Some(file_mode);
        self.directory_mode = Some(directory_mode);
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Maps a file id onto a path beneath the base directory. Ids that could
    /// leave the base directory are rejected.
    pub fn resolve(&self, file_id: &str) -> Result<PathBuf> {
        if file_id.trim().is_empty() {
            return Err(BaseError::InvalidArgument("File id cannot be blank".to_string()));
        }

        let relative = Path::new(file_id);
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(BaseError::InvalidArgument(format!(
                "File id must be a relative path without '..': {}",
                file_id
            )));
        }

        Ok(self.base_path.join(relative))
    }

    pub fn size(&self, file_id: &str) -> Result<i64> {
        self.get_metadata(file_id)?
            .map(|m| m.size_bytes())
            .ok_or_else(|| BaseError::NotFound(format!("File not found: {}", file_id)))
    }

    fn prepare_parent(&self, path: &Path, file_id: &str) -> Result<()> {
        if !self.auto_create_directories {
            return Ok(());
        }
        let Some(parent) = path.parent() else {
            return Ok(());
        };
        let missing: Vec<&Path> = parent.ancestors().take_while(|dir| !dir.exists()).collect();
        if missing.is_empty() {
            return Ok(());
        }

        fs::create_dir_all(parent).map_err(|e| {
            BaseError::storage(format!("Failed to create directories for {}", file_id), e)
        })?;

        for dir in missing {
            apply_mode(dir, self.directory_mode).map_err(|e| {
                BaseError::storage(format!("Failed to set permissions on {}", dir.display()), e)
            })?;
        }
        Ok(())
    }

    /// Writes into a sibling temporary file and renames it over `path`, so
    /// the previous content stays intact until the new content is complete.
    fn write_staged(&self, path: &Path, content: UploadContent) -> io::Result<()> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload");
        let staging = path.with_file_name(format!(".{}.{}.part", file_name, Uuid::new_v4()));

        let written = match content {
            UploadContent::Bytes(data) => fs::write(&staging, &data),
            UploadContent::Stream(mut reader) => fs::File::create(&staging).and_then(|mut file| {
                io::copy(&mut reader, &mut file)?;
                file.sync_all()
            }),
            UploadContent::File(source) => fs::copy(&source, &staging).map(|_| ()),
        }
        .and_then(|_| apply_mode(&staging, self.file_mode))
        .and_then(|_| fs::rename(&staging, path));

        if written.is_err() && staging.exists() {
            if let Err(e) = fs::remove_file(&staging) {
                warn!("Failed to remove staging file {}: {}", staging.display(), e);
            }
        }
        written
    }

    fn read_metadata(&self, path: &Path, file_id: &str) -> Result<FileMetadata> {
        derive_metadata(path, file_id)
            .map_err(|e| BaseError::storage(format!("Failed to read metadata for {}", file_id), e))
    }

    fn relative_name(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base_path).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        Some(parts.join("/"))
    }
}

/// Merges what the caller declared about an upload into the metadata read
/// back from disk. Size and timestamps always come from disk.
fn merge_declared(derived: FileMetadata, declared: Option<FileMetadata>) -> FileMetadata {
    let Some(declared) = declared else {
        return derived;
    };

    let mut merged = derived.with_tags(declared.tags());
    if let Some(checksum) = declared.checksum() {
        merged = merged.with_checksum(checksum);
    }
    if declared.content_type() != mime::APPLICATION_OCTET_STREAM.essence_str() {
        merged = merged.with_content_type(declared.content_type());
    }
    merged
}

/// Collects regular files below `dir`. Symlinked directories are not
/// descended into; other symlinks are kept so a broken one surfaces when its
/// metadata is read.
fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            if let Err(e) = collect_files(&path, files) {
                warn!("Skipping unreadable directory {}: {}", path.display(), e);
            }
        } else if file_type.is_file() || (file_type.is_symlink() && !path.is_dir()) {
            files.push(path);
        }
    }
    Ok(())
}

impl FileStorage for LocalFileStorage {
    fn provider_name(&self) -> &str {
        LOCAL_PROVIDER
    }

    fn upload(
        &self,
        file_id: &str,
        content: UploadContent,
        metadata: Option<FileMetadata>,
    ) -> Result<UploadResult> {
        let path = self.resolve(file_id)?;
        debug!("Uploading {} to {} ({:?})", file_id, path.display(), content);

        self.prepare_parent(&path, file_id)?;

        self.write_staged(&path, content)
            .map_err(|e| BaseError::storage(format!("Failed to upload {}", file_id), e))?;

        let derived = self.read_metadata(&path, file_id)?;
        let metadata = merge_declared(derived, metadata);

        Ok(UploadResult::success(file_id, path, metadata))
    }

    fn download(&self, file_id: &str, kind: ContentKind) -> Result<DownloadResult> {
        let path = self.resolve(file_id)?;
        if !path.is_file() {
            return Err(BaseError::NotFound(format!("File not found: {}", file_id)));
        }
        debug!("Downloading {} as {:?}", file_id, kind);

        let metadata = self.read_metadata(&path, file_id)?;
        let content = match kind {
            ContentKind::Bytes => fs::read(&path).map(DownloadContent::Bytes),
            ContentKind::Stream => fs::File::open(&path)
                .map(|file| DownloadContent::Stream(Box::new(BufReader::new(file)))),
            ContentKind::File => Ok(DownloadContent::File(path.clone())),
        }
        .map_err(|e| BaseError::storage(format!("Failed to download {}", file_id), e))?;

        Ok(DownloadResult::success(file_id, content, metadata))
    }

    fn delete(&self, file_id: &str) -> Result<bool> {
        let path = self.resolve(file_id)?;
        if !path.is_file() {
            return Ok(false);
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Deleted {}", file_id);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BaseError::storage(format!("Failed to delete {}", file_id), e)),
        }
    }

    fn exists(&self, file_id: &str) -> Result<bool> {
        Ok(self.resolve(file_id)?.is_file())
    }

    fn get_metadata(&self, file_id: &str) -> Result<Option<FileMetadata>> {
        let path = self.resolve(file_id)?;
        if !path.is_file() {
            return Ok(None);
        }
        self.read_metadata(&path, file_id).map(Some)
    }

    fn list_files(&self, prefix: &str, max_results: i64) -> Result<Vec<FileMetadata>> {
        let root = if prefix.trim().is_empty() {
            self.base_path.clone()
        } else {
            self.resolve(prefix)?
        };

        let mut paths = Vec::new();
        if root.is_file() {
            paths.push(root);
        } else if root.is_dir() {
            collect_files(&root, &mut paths).map_err(|e| {
                BaseError::storage(format!("Failed to list files under '{}'", prefix), e)
            })?;
        }
        paths.sort();

        let limit = usize::try_from(max_results)
            .ok()
            .filter(|&n| n > 0)
            .unwrap_or(usize::MAX);

        let files: Vec<FileMetadata> = paths
            .iter()
            .filter_map(|path| {
                let name = self.relative_name(path)?;
                match derive_metadata(path, &name) {
                    Ok(metadata) => Some(metadata),
                    Err(e) => {
                        warn!("Skipping {} while listing: {}", path.display(), e);
                        None
                    }
                }
            })
            .take(limit)
            .collect();

        debug!("Listed {} files under '{}'", files.len(), prefix);
        Ok(files)
    }

    fn copy(&self, source_id: &str, target_id: &str) -> Result<UploadResult> {
        let source = self.resolve(source_id)?;
        if !source.is_file() {
            return Err(BaseError::NotFound(format!("File not found: {}", source_id)));
        }

        let target = self.resolve(target_id)?;
        if target == source {
            debug!("Copy of {} onto itself, leaving it untouched", source_id);
            let metadata = self.read_metadata(&source, target_id)?;
            return Ok(UploadResult::success(target_id, target, metadata));
        }

        self.upload(target_id, UploadContent::File(source), None)
    }
}
