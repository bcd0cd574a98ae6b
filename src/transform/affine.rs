//! 2x3 affine matrices and inverse-mapped bilinear resampling.

use crate::{
    error::{Result, TransformError},
    video::types::{Frame, FramePixel},
};

/// Angles closer than this to a quarter turn are treated as exact
pub(crate) const QUARTER_TURN_EPSILON: f64 = 1e-9;

/// Row-major 2x3 affine matrix mapping `(x, y)` to
/// `(m[0]x + m[1]y + m[2], m[3]x + m[4]y + m[5])`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineMatrix {
    m: [f64; 6],
}

impl AffineMatrix {
    pub const IDENTITY: AffineMatrix = AffineMatrix {
        m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
    };

    pub fn from_rows(m: [f64; 6]) -> Self {
        Self { m }
    }

    /// Rotation by `degrees` about `center` combined with uniform `scale`
    ///
    /// Positive angles turn the picture counter-clockwise on screen (y axis
    /// pointing down), matching the usual image-processing convention.
    pub fn rotation(center: (f64, f64), degrees: f64, scale: f64) -> Self {
        let (sin, cos) = exact_sin_cos(degrees);
        let a = scale * cos;
        let b = scale * sin;
        let (cx, cy) = center;

        #[rustfmt::skip]
        let m = [
            a, b, (1.0 - a) * cx - b * cy,
            -b, a, b * cx + (1.0 - a) * cy,
        ];
        Self { m }
    }

    pub fn rows(&self) -> [f64; 6] {
        self.m
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let m = &self.m;
        (m[0] * x + m[1] * y + m[2], m[3] * x + m[4] * y + m[5])
    }

    /// Inverse transform, or `None` when the linear part is singular
    pub fn invert(&self) -> Option<Self> {
        let [a, b, c, d, e, f] = self.m;
        let det = a * e - b * d;
        if det.abs() < f64::EPSILON || !det.is_finite() {
            return None;
        }
        let inv_det = 1.0 / det;
        let ia = e * inv_det;
        let ib = -b * inv_det;
        let id = -d * inv_det;
        let ie = a * inv_det;

        Some(Self {
            m: [ia, ib, -(ia * c + ib * f), id, ie, -(id * c + ie * f)],
        })
    }
}

/// `true` when `degrees` is a whole multiple of 90
pub fn is_quarter_turn(degrees: f64) -> bool {
    let rem = degrees.rem_euclid(90.0);
    rem < QUARTER_TURN_EPSILON || 90.0 - rem < QUARTER_TURN_EPSILON
}

/// `(sin, cos)` of an angle in degrees, exact at quarter turns
fn exact_sin_cos(degrees: f64) -> (f64, f64) {
    if is_quarter_turn(degrees) {
        let quarter = (degrees / 90.0).round().rem_euclid(4.0) as u8;
        return match quarter {
            0 => (0.0, 1.0),
            1 => (1.0, 0.0),
            2 => (0.0, -1.0),
            _ => (-1.0, 0.0),
        };
    }
    degrees.to_radians().sin_cos()
}

/// Warp `frame` through `matrix` into a canvas of the same size
///
/// Every output pixel is mapped back into the source with the inverse matrix
/// and sampled bilinearly. Neighbours that fall outside the source read as
/// `background`, so edges fade smoothly into the fill.
pub fn warp_affine<P: FramePixel>(
    frame: &Frame<P>,
    matrix: &AffineMatrix,
    background: P,
) -> Result<Frame<P>> {
    let inverse = matrix.invert().ok_or_else(|| TransformError::InvalidParameters {
        details: format!("affine matrix {:?} is not invertible", matrix.rows()),
    })?;

    let (width, height) = frame.dimensions();
    let mut output = Frame::new_filled(width, height, background);

    for y in 0..height {
        for x in 0..width {
            let (sx, sy) = inverse.apply(f64::from(x), f64::from(y));
            if let Some(pixel) = sample_bilinear(frame, sx, sy, background) {
                output.set_pixel(x, y, pixel);
            }
        }
    }

    Ok(output)
}

/// Bilinear sample at a fractional source position
///
/// Returns `None` when no neighbour lies inside the frame.
fn sample_bilinear<P: FramePixel>(frame: &Frame<P>, x: f64, y: f64, background: P) -> Option<P> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }

    let (width, height) = frame.dimensions();
    let x0 = x.floor();
    let y0 = y.floor();
    if x0 < -1.0 || y0 < -1.0 || x0 >= f64::from(width) || y0 >= f64::from(height) {
        return None;
    }

    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let fetch = |px: i64, py: i64| -> P {
        if px >= 0 && py >= 0 && px < i64::from(width) && py < i64::from(height) {
            frame.get_pixel(px as u32, py as u32)
        } else {
            background
        }
    };

    let neighbours = [
        (fetch(x0, y0), (1.0 - fx) * (1.0 - fy)),
        (fetch(x0 + 1, y0), fx * (1.0 - fy)),
        (fetch(x0, y0 + 1), (1.0 - fx) * fy),
        (fetch(x0 + 1, y0 + 1), fx * fy),
    ];

    let channels = P::CHANNEL_COUNT as usize;
    let mut acc = [0.0f64; 4];
    for (pixel, weight) in &neighbours {
        for (sum, &sample) in acc.iter_mut().zip(pixel.channels()) {
            *sum += weight * f64::from(sample);
        }
    }

    let mut samples = [0u8; 4];
    for (out, sum) in samples.iter_mut().zip(&acc).take(channels) {
        *out = sum.round().clamp(0.0, 255.0) as u8;
    }

    Some(*P::from_slice(&samples[..channels]))
}
