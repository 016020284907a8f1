use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::window::Window;

/// A shader submission: the fragment program plus optional compute stage.
///
/// The fragment text is shared behind an `Arc` so that callers can tell one
/// submission from another by identity rather than by content.
#[derive(Debug, Clone)]
pub struct ShaderPayload {
    pub fragment: Arc<str>,
    /// Accepted and carried along but never dispatched.
    pub compute: Option<String>,
    pub description: String,
}

impl ShaderPayload {
    pub fn new(fragment: impl Into<Arc<str>>) -> Self {
        Self {
            fragment: fragment.into(),
            compute: None,
            description: String::new(),
        }
    }

    pub fn with_compute(mut self, compute: Option<String>) -> Self {
        self.compute = compute;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Where frames are drawn.
#[derive(Debug, Clone)]
pub enum RenderTarget {
    /// A window surface, presented every frame.
    Window(Arc<Window>),
    /// An offscreen texture sized from the canvas metrics; frames can be read back.
    Offscreen,
}

/// Logical (CSS) size of the canvas plus the scale it is displayed at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasMetrics {
    pub css_width: f64,
    pub css_height: f64,
    pub device_pixel_ratio: f64,
}

impl CanvasMetrics {
    pub fn new(css_width: f64, css_height: f64, device_pixel_ratio: f64) -> Self {
        Self {
            css_width,
            css_height,
            device_pixel_ratio,
        }
    }

    /// Metrics for a window whose physical size and scale factor are known.
    pub fn from_physical(size: PhysicalSize<u32>, scale_factor: f64) -> Self {
        let scale = if scale_factor > 0.0 { scale_factor } else { 1.0 };
        Self::new(
            f64::from(size.width) / scale,
            f64::from(size.height) / scale,
            scale,
        )
    }

    /// Backing pixel buffer size: `round(css * dpr)` per axis, at least 1.
    pub fn backing_size(&self) -> PhysicalSize<u32> {
        let scale = |css: f64| -> u32 {
            let pixels = (css * self.device_pixel_ratio).round();
            if pixels.is_finite() && pixels >= 1.0 {
                pixels.min(f64::from(u32::MAX)) as u32
            } else {
                1
            }
        };
        PhysicalSize::new(scale(self.css_width), scale(self.css_height))
    }

    /// Converts a pointer position in CSS units, relative to the canvas
    /// origin, into backing-buffer pixels.
    pub fn pointer_to_backing(&self, client_x: f64, client_y: f64) -> [f32; 2] {
        let backing = self.backing_size();
        let ratio = |backing: u32, css: f64| {
            if css > 0.0 {
                f64::from(backing) / css
            } else {
                self.device_pixel_ratio
            }
        };
        [
            (client_x * ratio(backing.width, self.css_width)) as f32,
            (client_y * ratio(backing.height, self.css_height)) as f32,
        ]
    }
}

/// Shared flag telling async initialisation whether its owner still exists.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn tear_down(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of handing a payload to [`crate::ShaderRunner::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The new pipeline is current.
    Applied { generation: u64 },
    /// Compilation failed; the previous pipeline (if any) keeps rendering.
    Rejected { message: String },
    /// The engine was destroyed; nothing was compiled.
    Detached,
}

impl SubmitOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, SubmitOutcome::Applied { .. })
    }
}

/// What a call to [`crate::ShaderRunner::render_frame`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Drawn,
    /// Paused, no pipeline yet, or the loop is not armed.
    Skipped,
    /// The surface was lost or outdated and has been reconfigured.
    Reconfigured,
    /// The device is gone; rendering has stopped.
    Halted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backing_size_scales_css_box_by_pixel_ratio() {
        let metrics = CanvasMetrics::new(800.0, 600.0, 2.0);
        assert_eq!(metrics.backing_size(), PhysicalSize::new(1600, 1200));
    }

    #[test]
    fn backing_size_rounds_fractional_pixels() {
        let metrics = CanvasMetrics::new(333.3, 100.2, 1.5);
        assert_eq!(metrics.backing_size(), PhysicalSize::new(500, 150));
    }

    #[test]
    fn backing_size_never_collapses_to_zero() {
        let metrics = CanvasMetrics::new(0.0, 0.2, 1.0);
        assert_eq!(metrics.backing_size(), PhysicalSize::new(1, 1));
    }

    #[test]
    fn from_physical_round_trips_window_size() {
        let metrics = CanvasMetrics::from_physical(PhysicalSize::new(1920, 1080), 1.25);
        assert_eq!(metrics.backing_size(), PhysicalSize::new(1920, 1080));
        assert!((metrics.css_width - 1536.0).abs() < 1e-9);
    }

    #[test]
    fn pointer_is_scaled_into_backing_pixels() {
        let metrics = CanvasMetrics::new(800.0, 600.0, 2.0);
        assert_eq!(metrics.pointer_to_backing(100.0, 50.0), [200.0, 100.0]);
    }

    #[test]
    fn liveness_flips_once_torn_down() {
        let liveness = Liveness::new();
        let observer = liveness.clone();
        assert!(observer.is_alive());
        liveness.tear_down();
        assert!(!observer.is_alive());
    }
}
