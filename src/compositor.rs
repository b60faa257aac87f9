use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::camera::{temp_capture_path, write_jpeg, CameraFacing, PreviewSurface};
use crate::overlay::{composite, OverlayPosition};
use crate::template::Template;

/// What the capture view shows at the moment of the screenshot
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayScene {
    pub template: Template,
    pub position: OverlayPosition,
    pub facing: CameraFacing,
}

/// Screenshot of the on-screen camera view, overlay included
#[async_trait::async_trait]
pub trait ViewCompositor: Send + Sync {
    async fn capture_view(&self, scene: &OverlayScene) -> Result<PathBuf>;
}

/// Composites the mounted preview frame with the template icon in-process
pub struct FrameCompositor {
    preview: PreviewSurface,
    icon_size: u32,
    margin: u32,
    quality: u8,
    temp_dir: PathBuf,
    shots: AtomicU32,
}

impl FrameCompositor {
    pub fn new(preview: PreviewSurface, icon_size: u32, margin: u32, quality: u8, temp_dir: &Path) -> Self {
        Self {
            preview,
            icon_size,
            margin,
            quality,
            temp_dir: temp_dir.to_path_buf(),
            shots: AtomicU32::new(0),
        }
    }
}

#[async_trait::async_trait]
impl ViewCompositor for FrameCompositor {
    async fn capture_view(&self, scene: &OverlayScene) -> Result<PathBuf> {
        let frame = self
            .preview
            .latest_frame()
            .ok_or_else(|| anyhow!("Camera view is not mounted"))?;
        let icon = scene
            .template
            .icon
            .resolve(self.icon_size)
            .with_context(|| format!("Failed to render overlay '{}'", scene.template.name))?;

        let output = composite(&frame, &icon, scene.position, self.margin);

        tokio::fs::create_dir_all(&self.temp_dir)
            .await
            .with_context(|| format!("Failed to create temp directory {}", self.temp_dir.display()))?;
        let shot = self.shots.fetch_add(1, Ordering::SeqCst) + 1;
        let path = temp_capture_path(&self.temp_dir, "composite", shot, "jpg");
        write_jpeg(&output, &path, self.quality).await?;

        log::debug!(
            "Composited '{}' at {} onto {}x{} frame -> {}",
            scene.template.name,
            scene.position,
            output.width(),
            output.height(),
            path.display()
        );
        Ok(path)
    }
}
