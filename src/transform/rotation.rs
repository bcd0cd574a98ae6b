//! Progressive rotation, optionally shrunk so no corner leaves the canvas.

use std::fmt;

use crate::{
    error::{Result, TransformError},
    transform::{
        affine::{is_quarter_turn, warp_affine, AffineMatrix},
        FrameTransform, ProgressConvention,
    },
    video::types::{Frame, FramePixel},
};

/// Default sweep: one full turn over the clip
pub const DEFAULT_FINAL_ANGLE: f64 = 360.0;

/// Which of the two rotation outputs to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationVariant {
    /// Scale 1.0; corners may be clipped
    Normal,
    /// Shrunk so the whole rotated frame stays visible
    Scaled,
}

impl fmt::Display for RotationVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotationVariant::Normal => write!(f, "normal"),
            RotationVariant::Scaled => write!(f, "scaled"),
        }
    }
}

/// Angle reached at the given progress
pub fn rotation_angle(final_angle: f64, progress: f64) -> f64 {
    final_angle * progress
}

/// Uniform scale that keeps a `width` x `height` rectangle rotated by
/// `degrees` inside the original canvas
///
/// Quarter turns always return exactly 1.0.
pub fn scale_to_fit(degrees: f64, width: u32, height: u32) -> f64 {
    if is_quarter_turn(degrees) || width == 0 || height == 0 {
        return 1.0;
    }

    let (w, h) = (f64::from(width), f64::from(height));
    let radians = degrees.to_radians();
    let (c, s) = (radians.cos().abs(), radians.sin().abs());
    let bounding_width = w * c + h * s;
    let bounding_height = w * s + h * c;

    (w / bounding_width).min(h / bounding_height)
}

/// Center used when none is given: `(width / 2, height / 2)` in whole pixels
pub fn default_center(width: u32, height: u32) -> (f64, f64) {
    (f64::from(width / 2), f64::from(height / 2))
}

/// Rotate `frame` about `center` by `degrees` with uniform `scale`
///
/// Uncovered areas are filled black.
pub fn rotate_frame<P: FramePixel>(
    frame: &Frame<P>,
    center: (f64, f64),
    degrees: f64,
    scale: f64,
) -> Result<Frame<P>> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(TransformError::InvalidParameters {
            details: format!("rotation scale must be positive, got {}", scale),
        }
        .into());
    }
    if !degrees.is_finite() {
        return Err(TransformError::InvalidParameters {
            details: format!("rotation angle must be finite, got {}", degrees),
        }
        .into());
    }

    let matrix = AffineMatrix::rotation(center, degrees, scale);
    warp_affine(frame, &matrix, P::black())
}

/// Angle and scales for one frame, shared by both variants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationStep {
    pub angle: f64,
    pub fit_scale: f64,
}

impl RotationStep {
    pub fn scale_for(&self, variant: RotationVariant) -> f64 {
        match variant {
            RotationVariant::Normal => 1.0,
            RotationVariant::Scaled => self.fit_scale,
        }
    }
}

/// Rotation sweeping from 0 to `final_angle` across the clip
#[derive(Debug, Clone)]
pub struct RotationScaler {
    final_angle: f64,
    center: Option<(f64, f64)>,
    variant: RotationVariant,
    name: String,
}

impl RotationScaler {
    pub fn new(final_angle: f64, variant: RotationVariant) -> Self {
        Self {
            final_angle,
            center: None,
            variant,
            name: format!("rotate-{}", variant),
        }
    }

    /// Rotate about a fixed point instead of the frame center
    pub fn with_center(mut self, center: (f64, f64)) -> Self {
        self.center = Some(center);
        self
    }

    /// Rotation center for a canvas of the given size
    pub fn center_for(&self, width: u32, height: u32) -> (f64, f64) {
        self.center.unwrap_or_else(|| default_center(width, height))
    }

    /// Angle and fit scale at the given progress
    pub fn step(&self, progress: f64, width: u32, height: u32) -> RotationStep {
        let angle = rotation_angle(self.final_angle, progress);
        RotationStep {
            angle,
            fit_scale: scale_to_fit(angle, width, height),
        }
    }

    /// Render one variant of an already computed step
    pub fn render<P: FramePixel>(
        &self,
        frame: &Frame<P>,
        step: &RotationStep,
        variant: RotationVariant,
    ) -> Result<Frame<P>> {
        let center = self.center_for(frame.width(), frame.height());
        rotate_frame(frame, center, step.angle, step.scale_for(variant))
    }
}

impl<P: FramePixel> FrameTransform<P> for RotationScaler {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        match self.variant {
            RotationVariant::Normal => "Gradual rotation; corners may be clipped",
            RotationVariant::Scaled => "Gradual rotation shrunk to keep the whole frame visible",
        }
    }

    fn apply(&self, frame: &Frame<P>, progress: f64) -> Result<Frame<P>> {
        let step = self.step(progress, frame.width(), frame.height());
        self.render(frame, &step, self.variant)
    }

    fn progress_convention(&self) -> ProgressConvention {
        ProgressConvention::OverLastIndex
    }

    fn validate(&self, _width: u32, _height: u32) -> Result<()> {
        if !self.final_angle.is_finite() {
            return Err(TransformError::InvalidParameters {
                details: format!("final angle must be finite, got {}", self.final_angle),
            }
            .into());
        }
        if let Some((cx, cy)) = self.center {
            if !(cx.is_finite() && cy.is_finite()) {
                return Err(TransformError::InvalidParameters {
                    details: format!("rotation center ({}, {}) is not finite", cx, cy),
                }
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::types::RgbFrame;
    use image::Rgb;
    use std::f64::consts::FRAC_1_SQRT_2;

    fn pattern(width: u32, height: u32) -> RgbFrame {
        let mut frame = RgbFrame::new_black(width, height);
        for y in 0..height {
            for x in 0..width {
                frame.set_pixel(x, y, Rgb([(x * 5) as u8, (y * 7) as u8, ((x + y) * 3) as u8]));
            }
        }
        frame
    }

    #[test]
    fn test_quarter_turns_never_scale() {
        for angle in [0.0, 90.0, 180.0, 270.0, 360.0, -90.0, 720.0] {
            assert_eq!(scale_to_fit(angle, 640, 480), 1.0, "angle {}", angle);
        }
    }

    #[test]
    fn test_square_canvas_at_45_degrees() {
        let scale = scale_to_fit(45.0, 100, 100);
        assert!((scale - FRAC_1_SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn test_fit_scale_keeps_bounding_box_inside() {
        let (w, h) = (640u32, 480u32);
        for tenth in 1..3600 {
            let angle = tenth as f64 / 10.0;
            if is_quarter_turn(angle) {
                continue;
            }
            let scale = scale_to_fit(angle, w, h);
            assert!(scale > 0.0 && scale <= 1.0, "scale {} at {}", scale, angle);

            let r = angle.to_radians();
            let (c, s) = (r.cos().abs(), r.sin().abs());
            let bw = scale * (640.0 * c + 480.0 * s);
            let bh = scale * (640.0 * s + 480.0 * c);
            assert!(bw <= 640.0 + 1e-9 && bh <= 480.0 + 1e-9, "angle {}", angle);
        }
    }

    #[test]
    fn test_angle_sweep() {
        assert_eq!(rotation_angle(360.0, 0.0), 0.0);
        assert_eq!(rotation_angle(360.0, 0.5), 180.0);
        assert_eq!(rotation_angle(360.0, 1.0), 360.0);
    }

    #[test]
    fn test_default_center_uses_whole_pixels() {
        assert_eq!(default_center(641, 481), (320.0, 240.0));
    }

    #[test]
    fn test_zero_and_full_turn_are_identity() {
        let frame = pattern(40, 30);
        for variant in [RotationVariant::Normal, RotationVariant::Scaled] {
            let scaler = RotationScaler::new(DEFAULT_FINAL_ANGLE, variant);
            assert_eq!(scaler.apply(&frame, 0.0).unwrap(), frame);
            assert_eq!(scaler.apply(&frame, 1.0).unwrap(), frame);
        }
    }

    #[test]
    fn test_scaled_variant_keeps_corners_visible() {
        // Bright frame: after a 45 degree turn the normal variant covers the
        // canvas center but the scaled one leaves every canvas corner empty
        // while keeping all source corners inside.
        let frame = RgbFrame::new_filled(64, 32, Rgb([255, 255, 255]));
        let normal = RotationScaler::new(90.0, RotationVariant::Normal);
        let scaled = RotationScaler::new(90.0, RotationVariant::Scaled);

        let step = scaled.step(0.5, 64, 32);
        assert_eq!(step.angle, 45.0);
        assert!(step.fit_scale < 1.0);

        let n = normal.apply(&frame, 0.5).unwrap();
        let s = scaled.apply(&frame, 0.5).unwrap();
        assert_eq!(n.dimensions(), (64, 32));
        assert_eq!(s.dimensions(), (64, 32));

        let lit = |f: &RgbFrame| f.samples().iter().filter(|&&v| v > 0).count();
        assert!(lit(&s) < lit(&n));
        assert_eq!(s.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(s.get_pixel(32, 16), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_variants_share_step() {
        let scaler = RotationScaler::new(360.0, RotationVariant::Normal);
        let step = scaler.step(0.3, 640, 480);
        assert_eq!(step.scale_for(RotationVariant::Normal), 1.0);
        assert_eq!(step.scale_for(RotationVariant::Scaled), scale_to_fit(step.angle, 640, 480));
    }

    #[test]
    fn test_invalid_scale_rejected() {
        let frame = pattern(4, 4);
        assert!(rotate_frame(&frame, (2.0, 2.0), 10.0, 0.0).is_err());
        assert!(rotate_frame(&frame, (2.0, 2.0), f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_custom_center() {
        let scaler = RotationScaler::new(360.0, RotationVariant::Normal).with_center((0.0, 0.0));
        assert_eq!(scaler.center_for(100, 50), (0.0, 0.0));
        assert!(FrameTransform::<Rgb<u8>>::validate(&scaler, 100, 50).is_ok());
    }
}
