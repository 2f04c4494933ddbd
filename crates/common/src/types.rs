use glam::Vec2;

/// Viewport size in pixels.
///
/// Both axes are always at least one pixel. A zero-sized window (minimized,
/// or a resize event reporting 0) is clamped on construction so that the
/// pixel-to-ray transform never divides by zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent {
    width: u32,
    height: u32,
}

impl Extent {
    /// Build an extent, clamping each axis to a minimum of 1 pixel.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// True if `Extent::new(width, height)` would have to clamp.
    pub fn is_degenerate(width: u32, height: u32) -> bool {
        width == 0 || height == 0
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width over height.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

impl Default for Extent {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_axes_clamp_to_one() {
        let e = Extent::new(0, 0);
        assert_eq!(e.width(), 1);
        assert_eq!(e.height(), 1);
        assert!(Extent::is_degenerate(0, 720));
        assert!(Extent::is_degenerate(1280, 0));
        assert!(!Extent::is_degenerate(1, 1));
    }

    #[test]
    fn aspect_is_width_over_height() {
        let e = Extent::new(1280, 720);
        assert!((e.aspect() - 16.0 / 9.0).abs() < 1e-6);
        assert_eq!(e.as_vec2(), Vec2::new(1280.0, 720.0));
    }

    #[test]
    fn clamped_extent_has_finite_aspect() {
        let e = Extent::new(640, 0);
        assert!(e.aspect().is_finite());
        assert_eq!(e.aspect(), 640.0);
    }

    #[test]
    fn default_extent_is_720p() {
        assert_eq!(Extent::default(), Extent::new(1280, 720));
    }
}
