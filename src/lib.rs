//! Capture-with-template workflow for a short-video camera screen.
//!
//! The user picks a template overlay, moves it between the corners of the
//! preview and taps the shutter. The photo is taken as a screenshot of preview
//! plus overlay, or as a plain camera photo when compositing is unavailable,
//! and then written to the device gallery. Every platform service sits behind
//! a trait so the workflow runs the same against phones, desktops and tests.

pub mod camera;
pub mod capture;
pub mod compositor;
pub mod config;
pub mod error;
pub mod gallery;
pub mod lifecycle;
pub mod overlay;
pub mod permission;
pub mod screen;
pub mod session;
pub mod template;

#[cfg(test)]
mod testing;

pub use capture::{CaptureEngine, CaptureKind, CaptureOutcome, CaptureState, CapturedImage};
pub use config::Config;
pub use error::{CaptureError, PermissionKind};
pub use gallery::GalleryWriter;
pub use overlay::OverlayPosition;
pub use permission::PermissionGate;
pub use screen::{CaptureScreen, Feedback};
pub use template::{Template, TemplateCatalog, TemplateSelector};
