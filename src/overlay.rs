use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};

/// Corner of the camera preview the template overlay is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayPosition {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

impl std::fmt::Display for OverlayPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl OverlayPosition {
    pub fn all() -> &'static [OverlayPosition] {
        &[
            OverlayPosition::TopLeft,
            OverlayPosition::TopRight,
            OverlayPosition::BottomLeft,
            OverlayPosition::BottomRight,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            OverlayPosition::TopLeft => "top-left",
            OverlayPosition::TopRight => "top-right",
            OverlayPosition::BottomLeft => "bottom-left",
            OverlayPosition::BottomRight => "bottom-right",
        }
    }

    pub fn next(&self) -> OverlayPosition {
        let all = Self::all();
        let current_index = all.iter().position(|p| p == self).unwrap_or(0);
        all[(current_index + 1) % all.len()]
    }

    /// Top-left pixel where an `overlay`-sized image goes inside `frame`.
    /// Oversized overlays are clamped to the frame origin.
    pub fn anchor(&self, frame: (u32, u32), overlay: (u32, u32), margin: u32) -> (i64, i64) {
        let right = frame.0.saturating_sub(overlay.0).saturating_sub(margin);
        let bottom = frame.1.saturating_sub(overlay.1).saturating_sub(margin);
        let left = margin.min(right);
        let top = margin.min(bottom);

        let (x, y) = match self {
            OverlayPosition::TopLeft => (left, top),
            OverlayPosition::TopRight => (right, top),
            OverlayPosition::BottomLeft => (left, bottom),
            OverlayPosition::BottomRight => (right, bottom),
        };
        (x as i64, y as i64)
    }
}

/// Overlay Positioner: the position after one tap
pub fn cycle_position(current: OverlayPosition) -> OverlayPosition {
    current.next()
}

/// Bakes `icon` into a copy of `frame` at the given corner
pub fn composite(frame: &RgbaImage, icon: &RgbaImage, position: OverlayPosition, margin: u32) -> RgbaImage {
    let mut output = frame.clone();
    let (x, y) = position.anchor(frame.dimensions(), icon.dimensions(), margin);
    imageops::overlay(&mut output, icon, x, y);
    output
}
