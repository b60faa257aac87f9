use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use crate::camera::{CameraBinding, CameraFacing, PhotoOptions};
use crate::compositor::{OverlayScene, ViewCompositor};
use crate::error::{CaptureError, CompositingError, NotReadyReason};
use crate::overlay::OverlayPosition;
use crate::permission::PermissionGate;
use crate::template::Template;

/// Best guess of an image's type from its file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeGuess {
    Jpeg,
    Png,
    Heic,
    Unknown,
}

impl MimeGuess {
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some("jpg") | Some("jpeg") => MimeGuess::Jpeg,
            Some("png") => MimeGuess::Png,
            Some("heic") | Some("heif") => MimeGuess::Heic,
            _ => MimeGuess::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MimeGuess::Jpeg => "image/jpeg",
            MimeGuess::Png => "image/png",
            MimeGuess::Heic => "image/heic",
            MimeGuess::Unknown => "application/octet-stream",
        }
    }

    pub fn is_image(&self) -> bool {
        !matches!(self, MimeGuess::Unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub path: PathBuf,
    pub mime: MimeGuess,
}

impl CapturedImage {
    pub fn new(path: PathBuf) -> Self {
        let mime = MimeGuess::from_path(&path);
        Self { path, mime }
    }
}

/// How the image was produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureKind {
    /// Screenshot of preview plus overlay
    Composited {
        template_name: String,
        position: OverlayPosition,
    },
    /// Native camera photo. `overlay_dropped` is set when a template was active
    /// but compositing failed.
    Plain { overlay_dropped: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutcome {
    pub image: CapturedImage,
    pub kind: CaptureKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing,
    Captured,
    Failed,
}

/// A finished capture waiting for the save step.
///
/// The engine stays in `Captured` and refuses new captures until the ticket is
/// dropped, which deletes the temp image and returns the engine to `Idle`.
pub struct CaptureTicket<'a> {
    outcome: CaptureOutcome,
    _guard: CaptureGuard<'a>,
}

impl CaptureTicket<'_> {
    pub fn outcome(&self) -> &CaptureOutcome {
        &self.outcome
    }

    pub fn path(&self) -> &Path {
        &self.outcome.image.path
    }
}

impl Drop for CaptureTicket<'_> {
    fn drop(&mut self) {
        let path = &self.outcome.image.path;
        if path.exists() {
            match std::fs::remove_file(path) {
                Ok(()) => debug!("Removed temp capture {}", path.display()),
                Err(e) => warn!("Could not remove temp capture {}: {}", path.display(), e),
            }
        }
    }
}

/// Clears the in-flight flag on every exit path
struct CaptureGuard<'a> {
    engine: &'a CaptureEngine,
}

impl Drop for CaptureGuard<'_> {
    fn drop(&mut self) {
        self.engine.set_state(CaptureState::Idle);
        self.engine.in_flight.store(false, Ordering::SeqCst);
    }
}

pub struct CaptureEngine {
    camera: RwLock<CameraBinding>,
    compositor: Arc<dyn ViewCompositor>,
    gate: Arc<PermissionGate>,
    options: PhotoOptions,
    in_flight: AtomicBool,
    state: Mutex<CaptureState>,
}

impl CaptureEngine {
    pub fn new(
        camera: CameraBinding,
        compositor: Arc<dyn ViewCompositor>,
        gate: Arc<PermissionGate>,
        options: PhotoOptions,
    ) -> Self {
        Self {
            camera: RwLock::new(camera),
            compositor,
            gate,
            options,
            in_flight: AtomicBool::new(false),
            state: Mutex::new(CaptureState::Idle),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state.lock().map(|s| *s).unwrap_or(CaptureState::Idle)
    }

    pub fn is_taking_photo(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn set_state(&self, next: CaptureState) {
        if let Ok(mut state) = self.state.lock() {
            if *state != next {
                debug!("Capture state {:?} -> {:?}", *state, next);
            }
            *state = next;
        }
    }

    /// Binds the configured camera
    pub async fn initialize(&self) -> anyhow::Result<()> {
        self.camera.write().await.bind().await
    }

    pub async fn is_camera_bound(&self) -> bool {
        self.camera.read().await.is_bound()
    }

    pub async fn release(&self) {
        self.camera.write().await.unbind();
    }

    pub async fn facing(&self) -> CameraFacing {
        self.camera.read().await.facing()
    }

    /// Tears down the current device and binds the opposite facing one
    pub async fn switch_camera(&self) -> Result<CameraFacing, CaptureError> {
        if self.is_taking_photo() {
            return Err(CaptureError::CameraNotReady(NotReadyReason::CaptureInProgress));
        }
        let mut camera = self
            .camera
            .try_write()
            .map_err(|_| CaptureError::CameraNotReady(NotReadyReason::CaptureInProgress))?;
        camera.switch_facing().await.map_err(|e| {
            warn!("Camera switch failed: {:#}", e);
            CaptureError::CameraNotReady(NotReadyReason::NotInitialized)
        })
    }

    /// Takes one photo, compositing `template` in when one is active.
    ///
    /// A compositing failure silently falls back to the native photo call;
    /// only a failure of that call fails the attempt.
    pub async fn capture(
        &self,
        template: Option<&Template>,
        position: OverlayPosition,
    ) -> Result<CaptureTicket<'_>, CaptureError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Capture ignored: another capture is in flight");
            return Err(CaptureError::CameraNotReady(NotReadyReason::CaptureInProgress));
        }
        let guard = CaptureGuard { engine: self };
        self.set_state(CaptureState::Capturing);

        if !self.gate.check_camera_permission().await {
            warn!("Capture refused: camera permission not granted");
            self.set_state(CaptureState::Failed);
            return Err(CaptureError::CameraNotReady(NotReadyReason::PermissionMissing));
        }

        let camera = self.camera.read().await;
        let device = match camera.device() {
            Some(device) => device,
            None => {
                warn!("Capture refused: camera not initialized");
                self.set_state(CaptureState::Failed);
                return Err(CaptureError::CameraNotReady(NotReadyReason::NotInitialized));
            }
        };

        let mut overlay_dropped = false;
        if let Some(template) = template {
            let scene = OverlayScene {
                template: template.clone(),
                position,
                facing: camera.facing(),
            };
            match self.compositor.capture_view(&scene).await {
                Ok(path) => {
                    info!("Captured '{}' overlay at {}: {}", template.name, position, path.display());
                    self.set_state(CaptureState::Captured);
                    return Ok(CaptureTicket {
                        outcome: CaptureOutcome {
                            image: CapturedImage::new(path),
                            kind: CaptureKind::Composited {
                                template_name: template.name.clone(),
                                position,
                            },
                        },
                        _guard: guard,
                    });
                }
                Err(e) => {
                    let err = CompositingError(format!("{:#}", e));
                    warn!("{}; falling back to plain photo", err);
                    overlay_dropped = true;
                }
            }
        }

        match device.take_photo(&self.options).await {
            Ok(photo) => {
                info!("Captured plain photo: {}", photo.path.display());
                self.set_state(CaptureState::Captured);
                Ok(CaptureTicket {
                    outcome: CaptureOutcome {
                        image: CapturedImage::new(photo.path),
                        kind: CaptureKind::Plain { overlay_dropped },
                    },
                    _guard: guard,
                })
            }
            Err(e) => {
                warn!("Photo capture failed: {:#}", e);
                self.set_state(CaptureState::Failed);
                Err(CaptureError::PlainCaptureFailed(format!("{:#}", e)))
            }
        }
    }
}
