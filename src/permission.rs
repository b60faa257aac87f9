use anyhow::Result;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// OS answer for a single permission, normalized across platforms and OS versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// Denied and the OS will no longer show a dialog; only settings can fix it
    Blocked,
    /// The permission does not exist on this device
    Unavailable,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

/// Platform-level permission identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionId {
    Camera,
    /// Scoped media access on Android 13+
    ReadMediaImages,
    /// Broad storage access on older Android
    WriteExternalStorage,
}

/// First Android API level with scoped media permissions
pub const SCOPED_MEDIA_API_LEVEL: u32 = 33;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "os", rename_all = "snake_case")]
pub enum Platform {
    Android { api_level: u32 },
    Ios,
    Desktop,
}

impl Platform {
    /// The permission guarding writes to the shared media store, if any has to be checked.
    /// `None` means the OS handles library access itself at save time.
    pub fn storage_permission(&self) -> Option<PermissionId> {
        match self {
            Platform::Android { api_level } if *api_level >= SCOPED_MEDIA_API_LEVEL => {
                Some(PermissionId::ReadMediaImages)
            }
            Platform::Android { .. } => Some(PermissionId::WriteExternalStorage),
            Platform::Ios | Platform::Desktop => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionState {
    pub camera_granted: bool,
    pub storage_granted: bool,
}

/// OS permission API
#[async_trait::async_trait]
pub trait PermissionBackend: Send + Sync {
    async fn check(&self, id: PermissionId) -> Result<PermissionStatus>;
    /// May show a system dialog
    async fn request(&self, id: PermissionId) -> Result<PermissionStatus>;
}

/// Answers "may we use the camera / the gallery right now".
///
/// Every query goes to the backend; nothing is cached, so a grant revoked while
/// the app was in the background is seen on the next call. Backend errors count
/// as "not granted".
pub struct PermissionGate {
    backend: Arc<dyn PermissionBackend>,
    platform: Platform,
}

impl PermissionGate {
    pub fn new(backend: Arc<dyn PermissionBackend>, platform: Platform) -> Self {
        Self { backend, platform }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub async fn check_camera_permission(&self) -> bool {
        self.check(PermissionId::Camera).await
    }

    pub async fn request_camera_permission(&self) -> bool {
        self.request(PermissionId::Camera).await
    }

    pub async fn check_storage_permission(&self) -> bool {
        match self.platform.storage_permission() {
            Some(id) => self.check(id).await,
            None => true,
        }
    }

    pub async fn request_storage_permission(&self) -> bool {
        match self.platform.storage_permission() {
            Some(id) => self.request(id).await,
            None => true,
        }
    }

    /// Re-reads both grants
    pub async fn refresh(&self) -> PermissionState {
        let state = PermissionState {
            camera_granted: self.check_camera_permission().await,
            storage_granted: self.check_storage_permission().await,
        };
        debug!("Permission state refreshed: {:?}", state);
        state
    }

    async fn check(&self, id: PermissionId) -> bool {
        match self.backend.check(id).await {
            Ok(status) => status.is_granted(),
            Err(e) => {
                warn!("Permission check for {:?} failed: {}", id, e);
                false
            }
        }
    }

    async fn request(&self, id: PermissionId) -> bool {
        match self.backend.request(id).await {
            Ok(status) => status.is_granted(),
            Err(e) => {
                warn!("Permission request for {:?} failed: {}", id, e);
                false
            }
        }
    }
}

/// Fixed grants read from the configuration, used by the desktop driver
pub struct StaticPermissions {
    camera: PermissionStatus,
    storage: PermissionStatus,
}

impl StaticPermissions {
    pub fn new(camera: PermissionStatus, storage: PermissionStatus) -> Self {
        Self { camera, storage }
    }

    pub fn granted() -> Self {
        Self::new(PermissionStatus::Granted, PermissionStatus::Granted)
    }
}

#[async_trait::async_trait]
impl PermissionBackend for StaticPermissions {
    async fn check(&self, id: PermissionId) -> Result<PermissionStatus> {
        Ok(match id {
            PermissionId::Camera => self.camera,
            _ => self.storage,
        })
    }

    async fn request(&self, id: PermissionId) -> Result<PermissionStatus> {
        // There is no dialog to show; a request answers like a check.
        self.check(id).await
    }
}
