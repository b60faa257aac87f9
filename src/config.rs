use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::camera::{CameraDescriptor, CameraFacing, FlashMode, PhotoOptions, QualityPrioritization};
use crate::overlay::OverlayPosition;
use crate::permission::{PermissionStatus, Platform};
use crate::template::MIN_ICON_SIZE;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub platform: Platform,
    pub camera: CameraConfig,
    pub overlay: OverlayConfig,
    pub gallery: GalleryConfig,
    pub permissions: PermissionConfig,
    pub paths: PathConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub flash: FlashMode,
    pub quality_prioritization: QualityPrioritization,
    pub default_facing: CameraFacing,
    pub devices: Vec<CameraDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    pub icon_size: u32,
    pub margin: u32,
    pub default_position: OverlayPosition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryConfig {
    pub album: String,
    /// When false the media-library API is treated as absent and exports are used
    pub library_available: bool,
    pub export_enabled: bool,
}

/// Simulated OS grants for the desktop driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionConfig {
    pub camera: PermissionStatus,
    pub storage: PermissionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    pub temp_dir: PathBuf,
    pub library_dir: PathBuf,
    pub export_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub config_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            platform: Platform::Desktop,
            camera: CameraConfig {
                width: 1080,
                height: 1920,
                quality: 90,
                flash: FlashMode::Off,
                quality_prioritization: QualityPrioritization::Balanced,
                default_facing: CameraFacing::Back,
                devices: vec![
                    CameraDescriptor {
                        id: "back-wide".to_string(),
                        facing: CameraFacing::Back,
                    },
                    CameraDescriptor {
                        id: "front".to_string(),
                        facing: CameraFacing::Front,
                    },
                ],
            },
            overlay: OverlayConfig {
                icon_size: 160,
                margin: 32,
                default_position: OverlayPosition::TopRight,
            },
            gallery: GalleryConfig {
                album: "OverlayCam".to_string(),
                library_available: true,
                export_enabled: true,
            },
            permissions: PermissionConfig {
                camera: PermissionStatus::Granted,
                storage: PermissionStatus::Granted,
            },
            paths: PathConfig {
                temp_dir: std::env::temp_dir().join("overlay_cam"),
                library_dir: PathBuf::from("gallery"),
                export_dir: PathBuf::from("exports"),
                templates_dir: PathBuf::from("templates"),
                config_file: PathBuf::from("overlay_cam.toml"),
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from("overlay_cam.toml");

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            log::info!("Config file not found, creating default configuration");
            let default_config = Self::default();
            default_config.save()?;
            Ok(default_config)
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| "Failed to parse configuration file")?;
        config.validate()?;

        log::info!("Configuration loaded from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to_file(&self.paths.config_file)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        std::fs::write(path.as_ref(), contents)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        log::info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow::anyhow!("Invalid camera resolution"));
        }

        if self.camera.quality == 0 || self.camera.quality > 100 {
            return Err(anyhow::anyhow!("Invalid JPEG quality: {}", self.camera.quality));
        }

        if !self.camera.devices.iter().any(|d| d.facing == self.camera.default_facing) {
            return Err(anyhow::anyhow!(
                "No {:?} camera configured for the default facing",
                self.camera.default_facing
            ));
        }

        for (i, a) in self.camera.devices.iter().enumerate() {
            if self.camera.devices.iter().skip(i + 1).any(|b| b.id == a.id) {
                return Err(anyhow::anyhow!("Duplicate camera id: {}", a.id));
            }
        }

        if self.overlay.icon_size < MIN_ICON_SIZE {
            return Err(anyhow::anyhow!("Overlay icon size must be at least {}", MIN_ICON_SIZE));
        }

        let footprint = self
            .overlay
            .margin
            .saturating_mul(2)
            .saturating_add(self.overlay.icon_size);
        if footprint > self.camera.width.min(self.camera.height) {
            return Err(anyhow::anyhow!("Overlay does not fit inside the camera frame"));
        }

        if self.gallery.album.trim().is_empty() {
            return Err(anyhow::anyhow!("Album name must not be empty"));
        }

        if !self.gallery.library_available && !self.gallery.export_enabled {
            return Err(anyhow::anyhow!("Neither the media library nor the export fallback is enabled"));
        }

        Ok(())
    }

    pub fn create_directories(&self) -> Result<()> {
        for dir in [&self.paths.temp_dir, &self.paths.library_dir, &self.paths.export_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }

        log::info!("Created necessary directories");
        Ok(())
    }

    pub fn photo_options(&self) -> PhotoOptions {
        PhotoOptions {
            flash: self.camera.flash,
            quality_prioritization: self.camera.quality_prioritization,
        }
    }
}

// Configuration builder for easier setup
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.config.platform = platform;
        self
    }

    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.config.camera.width = width;
        self.config.camera.height = height;
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.config.camera.quality = quality;
        self
    }

    pub fn default_facing(mut self, facing: CameraFacing) -> Self {
        self.config.camera.default_facing = facing;
        self
    }

    pub fn overlay(mut self, icon_size: u32, margin: u32) -> Self {
        self.config.overlay.icon_size = icon_size;
        self.config.overlay.margin = margin;
        self
    }

    pub fn album(mut self, album: &str) -> Self {
        self.config.gallery.album = album.to_string();
        self
    }

    pub fn library_available(mut self, available: bool) -> Self {
        self.config.gallery.library_available = available;
        self
    }

    pub fn root_dir<P: AsRef<Path>>(mut self, root: P) -> Self {
        let root = root.as_ref();
        self.config.paths = PathConfig {
            temp_dir: root.join("tmp"),
            library_dir: root.join("gallery"),
            export_dir: root.join("exports"),
            templates_dir: root.join("templates"),
            config_file: root.join("overlay_cam.toml"),
        };
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// Platform presets
impl Config {
    pub fn android_modern() -> Self {
        Config {
            platform: Platform::Android { api_level: 34 },
            ..Default::default()
        }
    }

    pub fn android_legacy() -> Self {
        Config {
            platform: Platform::Android { api_level: 29 },
            gallery: GalleryConfig {
                library_available: false,
                ..Config::default().gallery
            },
            ..Default::default()
        }
    }

    pub fn ios() -> Self {
        Config {
            platform: Platform::Ios,
            camera: CameraConfig {
                quality_prioritization: QualityPrioritization::Quality,
                ..Config::default().camera
            },
            ..Default::default()
        }
    }

    pub fn development_desktop() -> Self {
        Config {
            camera: CameraConfig {
                width: 640,
                height: 480,
                ..Config::default().camera
            },
            overlay: OverlayConfig {
                icon_size: 96,
                margin: 16,
                default_position: OverlayPosition::TopRight,
            },
            ..Default::default()
        }
    }
}
