use log::{info, warn};
use std::sync::Arc;

use crate::capture::{CaptureEngine, CaptureKind};
use crate::error::{CaptureError, NotReadyReason, PermissionKind};
use crate::gallery::GalleryWriter;
use crate::lifecycle::{is_foreground_transition, AppLifecycle, AppState, LifecycleSubscription};
use crate::overlay::{cycle_position, OverlayPosition};
use crate::permission::{PermissionGate, PermissionState};
use crate::template::{RouteParams, Template};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAction {
    OpenSettings,
    Cancel,
}

/// What the user is shown after an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    Saved { message: String },
    CapturedNotSaved { message: String },
    PermissionRequired {
        permission: PermissionKind,
        actions: [PromptAction; 2],
    },
    Notice { message: String },
    Alert { title: String, message: String },
}

impl Feedback {
    fn permission_required(permission: PermissionKind) -> Self {
        Feedback::PermissionRequired {
            permission,
            actions: [PromptAction::OpenSettings, PromptAction::Cancel],
        }
    }

    pub fn message(&self) -> String {
        match self {
            Feedback::Saved { message }
            | Feedback::CapturedNotSaved { message }
            | Feedback::Notice { message } => message.clone(),
            Feedback::PermissionRequired { permission, .. } => {
                format!("{} access is required. Open settings to allow it.", capitalize(permission.name()))
            }
            Feedback::Alert { title, message } => format!("{}: {}", title, message),
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// View-model of the camera screen: template selection, overlay placement,
/// capture and save, driven by explicit events.
pub struct CaptureScreen {
    engine: Arc<CaptureEngine>,
    gallery: GalleryWriter,
    gate: Arc<PermissionGate>,
    template: Option<Template>,
    position: OverlayPosition,
    permissions: PermissionState,
    app_state: AppState,
    subscription: Option<LifecycleSubscription>,
}

impl CaptureScreen {
    pub fn new(
        engine: Arc<CaptureEngine>,
        gallery: GalleryWriter,
        gate: Arc<PermissionGate>,
        position: OverlayPosition,
    ) -> Self {
        Self {
            engine,
            gallery,
            gate,
            template: None,
            position,
            permissions: PermissionState::default(),
            app_state: AppState::Active,
            subscription: None,
        }
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    pub fn position(&self) -> OverlayPosition {
        self.position
    }

    pub fn permissions(&self) -> PermissionState {
        self.permissions
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    /// Subscribes to app state, asks for camera access and binds the camera
    pub async fn mount(&mut self, lifecycle: &AppLifecycle) -> Option<Feedback> {
        self.subscription = Some(lifecycle.subscribe());
        self.app_state = lifecycle.state();
        self.permissions = self.gate.refresh().await;

        if let Err(e) = self.ensure_camera_permission().await {
            warn!("Camera permission denied on mount");
            return Some(capture_error_feedback(e));
        }
        self.bind_camera().await
    }

    pub async fn unmount(&mut self) {
        self.subscription = None;
        self.engine.release().await;
        info!("Capture screen unmounted");
    }

    /// Picks up a template handed over by the selector, once
    pub fn on_focus(&mut self, params: &mut RouteParams) -> bool {
        match params.take_selected_template() {
            Some(template) => {
                info!("Using template '{}'", template.name);
                self.template = Some(template);
                true
            }
            None => false,
        }
    }

    pub fn clear_template(&mut self) {
        self.template = None;
    }

    pub fn cycle_overlay(&mut self) -> OverlayPosition {
        self.position = cycle_position(self.position);
        self.position
    }

    pub async fn switch_camera(&mut self) -> Option<Feedback> {
        match self.engine.switch_camera().await {
            Ok(facing) => {
                info!("Switched to {:?} camera", facing);
                None
            }
            Err(e) => Some(capture_error_feedback(e)),
        }
    }

    /// Applies pending lifecycle transitions from the subscription
    pub async fn sync_lifecycle(&mut self) -> Option<Feedback> {
        let (_, current) = self.subscription.as_mut()?.poll()?;
        self.on_app_state_change(current).await
    }

    /// Re-reads permissions when the app comes back to the foreground and binds
    /// the camera if access was granted in the meantime
    pub async fn on_app_state_change(&mut self, state: AppState) -> Option<Feedback> {
        let previous = std::mem::replace(&mut self.app_state, state);
        if !is_foreground_transition(previous, state) {
            return None;
        }

        self.permissions = self.gate.refresh().await;
        if !self.permissions.camera_granted {
            warn!("Camera permission missing after returning to the foreground");
            return Some(capture_error_feedback(CaptureError::PermissionDenied(PermissionKind::Camera)));
        }
        if !self.is_mounted() {
            return None;
        }
        self.bind_camera().await
    }

    async fn ensure_camera_permission(&mut self) -> Result<(), CaptureError> {
        if !self.permissions.camera_granted {
            self.permissions.camera_granted = self.gate.request_camera_permission().await;
        }
        if self.permissions.camera_granted {
            Ok(())
        } else {
            Err(CaptureError::PermissionDenied(PermissionKind::Camera))
        }
    }

    async fn ensure_storage_permission(&mut self) -> Result<(), CaptureError> {
        let mut granted = self.gate.check_storage_permission().await;
        if !granted {
            granted = self.gate.request_storage_permission().await;
        }
        self.permissions.storage_granted = granted;
        if granted {
            Ok(())
        } else {
            Err(CaptureError::PermissionDenied(PermissionKind::Storage))
        }
    }

    async fn bind_camera(&self) -> Option<Feedback> {
        if self.engine.is_camera_bound().await {
            return None;
        }
        if let Err(e) = self.engine.initialize().await {
            warn!("Camera initialization failed: {:#}", e);
            return Some(camera_not_ready(NotReadyReason::NotInitialized));
        }
        None
    }

    /// Capture, then save; every outcome ends as user feedback
    pub async fn press_capture(&mut self) -> Feedback {
        let engine = Arc::clone(&self.engine);
        let ticket = match engine.capture(self.template.as_ref(), self.position).await {
            Ok(ticket) => ticket,
            Err(e) => {
                if e == CaptureError::CameraNotReady(NotReadyReason::PermissionMissing) {
                    self.permissions.camera_granted = false;
                }
                return capture_error_feedback(e);
            }
        };
        self.permissions.camera_granted = true;

        if let Err(e) = self.ensure_storage_permission().await {
            warn!("Storage permission denied; discarding {}", ticket.path().display());
            return capture_error_feedback(e);
        }

        if !self.gallery.save(ticket.path()).await {
            return Feedback::CapturedNotSaved {
                message: "Photo captured but could not be saved to the gallery".to_string(),
            };
        }

        match &ticket.outcome().kind {
            CaptureKind::Composited { template_name, position } => Feedback::Saved {
                message: format!("Photo with \"{}\" overlay ({}) saved to gallery", template_name, position),
            },
            CaptureKind::Plain { overlay_dropped } => {
                if *overlay_dropped {
                    info!("Overlay was not baked into the saved photo");
                }
                Feedback::Saved {
                    message: "Photo saved to gallery".to_string(),
                }
            }
        }
    }
}

fn camera_not_ready(reason: NotReadyReason) -> Feedback {
    Feedback::Notice {
        message: format!("Camera not ready ({})", reason),
    }
}

fn capture_error_feedback(error: CaptureError) -> Feedback {
    match error {
        CaptureError::PermissionDenied(kind) => Feedback::permission_required(kind),
        CaptureError::CameraNotReady(reason) => camera_not_ready(reason),
        CaptureError::PlainCaptureFailed(message) => Feedback::Alert {
            title: "Capture failed".to_string(),
            message,
        },
    }
}
