use anyhow::{anyhow, Context, Result};
use chrono::Local;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::capture::MimeGuess;
use crate::error::SaveError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    pub mime: MimeGuess,
    /// Album hint; platforms without albums ignore it
    pub album: String,
}

/// Generic share/export call, configured to write to device storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub mime: MimeGuess,
    pub save_to_device: bool,
    pub show_share_sheet: bool,
}

impl ExportRequest {
    pub fn save_to_device(mime: MimeGuess) -> Self {
        Self {
            mime,
            save_to_device: true,
            show_share_sheet: false,
        }
    }
}

/// Platform media-library save API
#[async_trait::async_trait]
pub trait MediaLibrary: Send + Sync {
    /// Returns where the library stored the file
    async fn save(&self, path: &Path, options: &SaveOptions) -> Result<PathBuf>;
}

#[async_trait::async_trait]
pub trait ShareExporter: Send + Sync {
    async fn export(&self, path: &Path, request: &ExportRequest) -> Result<PathBuf>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavedTo {
    Library(PathBuf),
    Export(PathBuf),
}

/// Persists captured images into the shared media store.
///
/// The export fallback is only used when the platform has no media-library
/// API at all; a library that exists but fails is reported as a failed save.
pub struct GalleryWriter {
    primary: Option<Arc<dyn MediaLibrary>>,
    fallback: Option<Arc<dyn ShareExporter>>,
    album: String,
}

impl GalleryWriter {
    pub fn new(
        primary: Option<Arc<dyn MediaLibrary>>,
        fallback: Option<Arc<dyn ShareExporter>>,
        album: impl Into<String>,
    ) -> Self {
        Self {
            primary,
            fallback,
            album: album.into(),
        }
    }

    pub fn album(&self) -> &str {
        &self.album
    }

    /// `true` when the image ended up in device storage. Never fails.
    pub async fn save(&self, path: &Path) -> bool {
        match self.try_save(path).await {
            Ok(SavedTo::Library(dest)) => {
                info!("Saved {} to album '{}' ({})", path.display(), self.album, dest.display());
                true
            }
            Ok(SavedTo::Export(dest)) => {
                info!("Exported {} to device storage ({})", path.display(), dest.display());
                true
            }
            Err(e) => {
                warn!("Could not save {}: {}", path.display(), e);
                false
            }
        }
    }

    pub async fn try_save(&self, path: &Path) -> Result<SavedTo, SaveError> {
        if let Some(library) = &self.primary {
            let options = SaveOptions {
                mime: MimeGuess::from_path(path),
                album: self.album.clone(),
            };
            return library
                .save(path, &options)
                .await
                .map(SavedTo::Library)
                .map_err(|e| SaveError::Library(format!("{:#}", e)));
        }

        warn!("Media library API unavailable, falling back to export");
        let exporter = self.fallback.as_ref().ok_or(SaveError::NoBackend)?;
        let request = ExportRequest::save_to_device(MimeGuess::from_path(path));
        exporter
            .export(path, &request)
            .await
            .map(SavedTo::Export)
            .map_err(|e| SaveError::Export(format!("{:#}", e)))
    }
}

/// Library backed by a directory tree: `<root>/<album>/<file>`
pub struct AlbumDirectory {
    root: PathBuf,
}

impl AlbumDirectory {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl MediaLibrary for AlbumDirectory {
    async fn save(&self, path: &Path, options: &SaveOptions) -> Result<PathBuf> {
        if !options.mime.is_image() {
            return Err(anyhow!("Not an image: {}", path.display()));
        }
        let album_dir = self.root.join(&options.album);
        tokio::fs::create_dir_all(&album_dir)
            .await
            .with_context(|| format!("Failed to create album directory {}", album_dir.display()))?;

        let dest = album_dir.join(album_file_name(path));
        tokio::fs::copy(path, &dest)
            .await
            .with_context(|| format!("Failed to copy {} into {}", path.display(), album_dir.display()))?;
        Ok(dest)
    }
}

/// Export target that drops files into a device folder instead of opening a share sheet
pub struct FileExport {
    export_dir: PathBuf,
}

impl FileExport {
    pub fn new<P: AsRef<Path>>(export_dir: P) -> Self {
        Self {
            export_dir: export_dir.as_ref().to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl ShareExporter for FileExport {
    async fn export(&self, path: &Path, request: &ExportRequest) -> Result<PathBuf> {
        if !request.save_to_device || request.show_share_sheet {
            return Err(anyhow!("Only save-to-device exports are supported"));
        }
        if !request.mime.is_image() {
            return Err(anyhow!("Refusing to export non-image file {}", path.display()));
        }
        tokio::fs::create_dir_all(&self.export_dir)
            .await
            .with_context(|| format!("Failed to create export directory {}", self.export_dir.display()))?;

        let dest = self.export_dir.join(album_file_name(path));
        tokio::fs::copy(path, &dest)
            .await
            .with_context(|| format!("Failed to export {} to {}", path.display(), dest.display()))?;
        Ok(dest)
    }
}

fn album_file_name(path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("capture");
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("jpg");
    format!("{}_{}.{}", stem, Local::now().format("%Y%m%d_%H%M%S"), extension)
}
