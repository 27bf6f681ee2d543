//! Zoom state and display scale
//!
//! The user controls a zoom factor; the effective on-screen scale also
//! depends on how the page fits the container. Both live here so the
//! policy (bounds, step, fit rules) stays in one place.

/// Horizontal padding the layout reserves around a page, in layout px
pub const PAGE_PADDING: f32 = 32.0;

/// Width/height ratio above which a page is treated as landscape
const LANDSCAPE_ASPECT: f32 = 1.3;

/// Zoom level above which a landscape page follows the user's zoom
/// directly instead of the fit-width scale
const LANDSCAPE_ZOOM_OVERRIDE: f32 = 0.8;

/// Bounds and step for the user zoom factor
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomPolicy {
    pub min_factor: f32,
    pub max_factor: f32,
    pub step: f32,
    pub initial: f32,
}

impl Default for ZoomPolicy {
    fn default() -> Self {
        Self {
            min_factor: 0.25,
            max_factor: 3.0,
            step: 0.25,
            initial: 1.0,
        }
    }
}

/// User zoom factor under a policy
#[derive(Clone, Debug, PartialEq)]
pub struct Zoom {
    factor: f32,
    policy: ZoomPolicy,
}

impl Zoom {
    #[must_use]
    pub fn new(policy: ZoomPolicy) -> Self {
        let factor = policy.initial;
        let mut zoom = Self { factor, policy };
        zoom.factor = zoom.clamp_factor(factor);
        zoom
    }

    /// Zoom restored from a remembered factor
    #[must_use]
    pub fn with_factor(policy: ZoomPolicy, factor: f32) -> Self {
        let mut zoom = Self::new(policy);
        zoom.factor = zoom.clamp_factor(factor);
        zoom
    }

    /// Current zoom factor (1.0 = 100%)
    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Current zoom as a whole percent
    pub fn percent(&self) -> u16 {
        (self.factor * 100.0).round() as u16
    }

    pub fn at_min(&self) -> bool {
        self.factor <= self.policy.min_factor
    }

    pub fn at_max(&self) -> bool {
        self.factor >= self.policy.max_factor
    }

    /// One step in. Returns whether the factor changed.
    pub fn step_in(&mut self) -> bool {
        self.set_factor(self.factor + self.policy.step)
    }

    /// One step out. Returns whether the factor changed.
    pub fn step_out(&mut self) -> bool {
        self.set_factor(self.factor - self.policy.step)
    }

    /// Back to the policy's initial factor
    pub fn reset(&mut self) -> bool {
        self.set_factor(self.policy.initial)
    }

    fn set_factor(&mut self, factor: f32) -> bool {
        let clamped = self.clamp_factor(factor);
        if (clamped - self.factor).abs() < f32::EPSILON {
            return false;
        }
        self.factor = clamped;
        true
    }

    /// Clamp a factor into the policy bounds, repairing non-finite input
    pub fn clamp_factor(&self, factor: f32) -> f32 {
        if !factor.is_finite() {
            return self.policy.initial;
        }
        factor.clamp(self.policy.min_factor, self.policy.max_factor)
    }
}

/// Container and page dimensions in layout px
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewportGeometry {
    pub container_width: f32,
    /// Natural width of the first page; stands in for every page
    pub page_width: f32,
    /// Natural height of the first page
    pub page_height: f32,
}

impl ViewportGeometry {
    /// Returns true once page dimensions are known
    pub fn has_page(&self) -> bool {
        self.page_width > 0.0 && self.page_height > 0.0
    }

    /// Width over height
    pub fn aspect_ratio(&self) -> f32 {
        self.page_width / self.page_height
    }
}

/// Effective on-screen scale for the current zoom and geometry.
///
/// Portrait-ish pages are fit to the container width (never upscaled past
/// natural size) and the user zoom multiplies that fit. Wide landscape
/// pages follow the zoom factor directly once the user has zoomed past
/// 0.8, since fit-width would shrink them too aggressively. The result is
/// clamped to the zoom policy bounds.
pub fn display_scale(zoom: &Zoom, viewport: ViewportGeometry) -> f32 {
    let factor = zoom.factor();
    if !viewport.has_page() || viewport.container_width <= PAGE_PADDING {
        return factor;
    }
    let fit_width = (viewport.container_width - PAGE_PADDING) / viewport.page_width;
    let scale = if viewport.aspect_ratio() > LANDSCAPE_ASPECT && factor > LANDSCAPE_ZOOM_OVERRIDE {
        factor
    } else {
        fit_width.min(1.0) * factor
    };
    zoom.clamp_factor(scale)
}

/// Returns true when the scaled page is wider than the padded container,
/// so the shell should offer horizontal panning
pub fn horizontal_overflow(scale: f32, viewport: ViewportGeometry) -> bool {
    viewport.has_page() && viewport.page_width * scale > viewport.container_width - PAGE_PADDING
}
