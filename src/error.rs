use thiserror::Error;

/// Which OS permission a failure refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionKind {
    Camera,
    Storage,
}

impl PermissionKind {
    pub fn name(&self) -> &'static str {
        match self {
            PermissionKind::Camera => "camera",
            PermissionKind::Storage => "photo library",
        }
    }
}

impl std::fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Why the camera refused to take a photo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotReadyReason {
    /// Camera permission is missing at the moment of the tap
    PermissionMissing,
    /// No device is bound yet (or it is being rebound)
    NotInitialized,
    /// Another capture is still in flight
    CaptureInProgress,
}

impl std::fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            NotReadyReason::PermissionMissing => "camera permission not granted",
            NotReadyReason::NotInitialized => "camera not initialized",
            NotReadyReason::CaptureInProgress => "a capture is already in progress",
        };
        write!(f, "{}", reason)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CaptureError {
    #[error("{0} permission denied")]
    PermissionDenied(PermissionKind),

    #[error("camera not ready: {0}")]
    CameraNotReady(NotReadyReason),

    #[error("photo capture failed: {0}")]
    PlainCaptureFailed(String),
}

/// Raised by the screenshot path; always recovered inside the capture engine.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("overlay compositing failed: {0}")]
pub struct CompositingError(pub String);

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SaveError {
    #[error("media library save failed: {0}")]
    Library(String),

    #[error("export fallback failed: {0}")]
    Export(String),

    #[error("no media library or export fallback available")]
    NoBackend,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CaptureError::CameraNotReady(NotReadyReason::CaptureInProgress);
        assert_eq!(err.to_string(), "camera not ready: a capture is already in progress");

        let err = CaptureError::PermissionDenied(PermissionKind::Storage);
        assert_eq!(err.to_string(), "photo library permission denied");

        let err = SaveError::Export("disk full".to_string());
        assert!(err.to_string().contains("disk full"));
    }
}
