use anyhow::{anyhow, Context, Result};
use chrono::Local;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraFacing {
    Front,
    Back,
}

impl CameraFacing {
    pub fn toggled(&self) -> CameraFacing {
        match self {
            CameraFacing::Front => CameraFacing::Back,
            CameraFacing::Back => CameraFacing::Front,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashMode {
    #[default]
    Off,
    On,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityPrioritization {
    Speed,
    #[default]
    Balanced,
    Quality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhotoOptions {
    pub flash: FlashMode,
    pub quality_prioritization: QualityPrioritization,
}

/// A physical camera as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDescriptor {
    pub id: String,
    pub facing: CameraFacing,
}

/// A photo written to temporary storage by the camera
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoFile {
    pub path: PathBuf,
}

#[async_trait::async_trait]
pub trait CameraDevice: Send + Sync {
    fn descriptor(&self) -> &CameraDescriptor;
    async fn take_photo(&self, options: &PhotoOptions) -> Result<PhotoFile>;
}

#[async_trait::async_trait]
pub trait CameraProvider: Send + Sync {
    fn devices(&self) -> Vec<CameraDescriptor>;
    async fn open(&self, device: &CameraDescriptor) -> Result<Box<dyn CameraDevice>>;
}

/// The camera handle owned by the capture screen.
///
/// Only one logical camera is bound at a time; switching facing drops the
/// current device before opening the other one.
pub struct CameraBinding {
    provider: Arc<dyn CameraProvider>,
    facing: CameraFacing,
    device: Option<Box<dyn CameraDevice>>,
}

impl CameraBinding {
    pub fn new(provider: Arc<dyn CameraProvider>, facing: CameraFacing) -> Self {
        Self {
            provider,
            facing,
            device: None,
        }
    }

    pub async fn bind(&mut self) -> Result<()> {
        self.unbind();

        let descriptor = self
            .provider
            .devices()
            .into_iter()
            .find(|d| d.facing == self.facing)
            .ok_or_else(|| anyhow!("No {:?} camera available", self.facing))?;

        let device = self
            .provider
            .open(&descriptor)
            .await
            .with_context(|| format!("Failed to open camera {}", descriptor.id))?;
        log::info!("Camera {} bound ({:?})", descriptor.id, descriptor.facing);
        self.device = Some(device);
        Ok(())
    }

    pub fn unbind(&mut self) {
        if let Some(device) = self.device.take() {
            log::debug!("Camera {} released", device.descriptor().id);
        }
    }

    pub async fn switch_facing(&mut self) -> Result<CameraFacing> {
        self.unbind();
        self.facing = self.facing.toggled();
        self.bind().await?;
        Ok(self.facing)
    }

    pub fn facing(&self) -> CameraFacing {
        self.facing
    }

    pub fn is_bound(&self) -> bool {
        self.device.is_some()
    }

    pub fn device(&self) -> Option<&dyn CameraDevice> {
        self.device.as_deref()
    }
}

/// What is currently rendered in the camera preview view.
/// Empty while no camera is mounted.
#[derive(Clone, Default)]
pub struct PreviewSurface {
    frame: Arc<RwLock<Option<RgbaImage>>>,
}

impl PreviewSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame: RgbaImage) {
        if let Ok(mut slot) = self.frame.write() {
            *slot = Some(frame);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.frame.write() {
            *slot = None;
        }
    }

    pub fn latest_frame(&self) -> Option<RgbaImage> {
        self.frame.read().ok().and_then(|slot| slot.clone())
    }

    pub fn is_mounted(&self) -> bool {
        self.frame.read().map(|slot| slot.is_some()).unwrap_or(false)
    }
}

/// Desktop stand-in for a phone camera: renders a test pattern and writes it as a JPEG
pub struct TestPatternCamera {
    descriptor: CameraDescriptor,
    width: u32,
    height: u32,
    quality: u8,
    temp_dir: PathBuf,
    preview: PreviewSurface,
    shots: AtomicU32,
}

impl TestPatternCamera {
    pub fn new(
        descriptor: CameraDescriptor,
        width: u32,
        height: u32,
        quality: u8,
        temp_dir: &Path,
        preview: PreviewSurface,
    ) -> Self {
        let camera = Self {
            descriptor,
            width,
            height,
            quality: quality.min(100),
            temp_dir: temp_dir.to_path_buf(),
            preview,
            shots: AtomicU32::new(0),
        };
        camera.preview.publish(camera.render_frame(0));
        camera
    }

    fn render_frame(&self, shot: u32) -> RgbaImage {
        let (width, height) = (self.width.max(1), self.height.max(1));
        let tint = match self.descriptor.facing {
            CameraFacing::Back => 0u8,
            CameraFacing::Front => 80u8,
        };
        ImageBuffer::from_fn(width, height, |x, y| {
            let r = (x * 255 / width) as u8;
            let g = (y * 255 / height) as u8;
            let b = ((x + y) * 255 / (width + height)) as u8;
            Rgba([r, g.wrapping_add((shot % 8) as u8 * 16), b.saturating_add(tint), 255])
        })
    }
}

impl Drop for TestPatternCamera {
    fn drop(&mut self) {
        self.preview.clear();
        log::debug!("Test pattern camera {} dropped", self.descriptor.id);
    }
}

#[async_trait::async_trait]
impl CameraDevice for TestPatternCamera {
    fn descriptor(&self) -> &CameraDescriptor {
        &self.descriptor
    }

    async fn take_photo(&self, options: &PhotoOptions) -> Result<PhotoFile> {
        let shot = self.shots.fetch_add(1, Ordering::SeqCst) + 1;
        log::info!(
            "Taking photo with {} (flash {:?}, {:?})",
            self.descriptor.id,
            options.flash,
            options.quality_prioritization
        );

        let frame = self.render_frame(shot);
        let path = temp_capture_path(&self.temp_dir, "photo", shot, "jpg");
        let quality = match options.quality_prioritization {
            QualityPrioritization::Speed => self.quality.min(70),
            _ => self.quality,
        };
        write_jpeg(&frame, &path, quality).await?;
        self.preview.publish(frame);

        log::info!("Photo captured: {}", path.display());
        Ok(PhotoFile { path })
    }
}

/// Opens [`TestPatternCamera`]s for the configured devices
pub struct TestPatternProvider {
    devices: Vec<CameraDescriptor>,
    width: u32,
    height: u32,
    quality: u8,
    temp_dir: PathBuf,
    preview: PreviewSurface,
}

impl TestPatternProvider {
    pub fn new(
        devices: Vec<CameraDescriptor>,
        (width, height): (u32, u32),
        quality: u8,
        temp_dir: &Path,
        preview: PreviewSurface,
    ) -> Self {
        Self {
            devices,
            width,
            height,
            quality,
            temp_dir: temp_dir.to_path_buf(),
            preview,
        }
    }
}

#[async_trait::async_trait]
impl CameraProvider for TestPatternProvider {
    fn devices(&self) -> Vec<CameraDescriptor> {
        self.devices.clone()
    }

    async fn open(&self, device: &CameraDescriptor) -> Result<Box<dyn CameraDevice>> {
        tokio::fs::create_dir_all(&self.temp_dir)
            .await
            .with_context(|| format!("Failed to create temp directory {}", self.temp_dir.display()))?;
        Ok(Box::new(TestPatternCamera::new(
            device.clone(),
            self.width,
            self.height,
            self.quality,
            &self.temp_dir,
            self.preview.clone(),
        )))
    }
}

/// `<dir>/<prefix>_<timestamp>_<n>.<ext>`, unique per process
pub fn temp_capture_path(dir: &Path, prefix: &str, n: u32, extension: &str) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S_%3f");
    dir.join(format!("{}_{}_{:03}.{}", prefix, stamp, n, extension))
}

/// Encodes `frame` as JPEG (alpha dropped) into `path`
pub async fn write_jpeg(frame: &RgbaImage, path: &Path, quality: u8) -> Result<()> {
    let rgb = image::DynamicImage::ImageRgba8(frame.clone()).to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .encode_image(&rgb)
        .context("Failed to encode JPEG")?;
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write image to {}", path.display()))?;
    Ok(())
}
