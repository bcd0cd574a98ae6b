//! Global contrast stretch around each frame's own mean.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::{
    error::Result,
    transform::{FrameTransform, ProgressConvention},
    video::types::{Frame, FramePixel},
};

const LINEAR_START: f64 = 0.8;
const LINEAR_END: f64 = 1.5;
const SINE_CENTER: f64 = 1.15;
const SINE_AMPLITUDE: f64 = 0.35;
/// Full sine periods over the clip
const SINE_CYCLES: f64 = 2.0;

/// Maps clip progress onto a contrast gain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContrastCurve {
    /// Ramp from 0.8x to 1.5x over the clip
    Linear,
    /// Oscillate twice around 1.15x with amplitude 0.35
    Sine,
    /// Leave contrast untouched
    Identity,
}

impl ContrastCurve {
    /// Resolve a mode name; anything unrecognized means identity
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "linear" => ContrastCurve::Linear,
            "sine" => ContrastCurve::Sine,
            "identity" | "none" => ContrastCurve::Identity,
            other => {
                warn!("Unknown contrast mode '{}', leaving contrast unchanged", other);
                ContrastCurve::Identity
            }
        }
    }

    /// Contrast gain at the given progress
    pub fn alpha(self, progress: f64) -> f64 {
        match self {
            ContrastCurve::Linear => LINEAR_START + (LINEAR_END - LINEAR_START) * progress,
            ContrastCurve::Sine => {
                SINE_CENTER + SINE_AMPLITUDE * (2.0 * PI * progress * SINE_CYCLES).sin()
            }
            ContrastCurve::Identity => 1.0,
        }
    }
}

impl FromStr for ContrastCurve {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

impl fmt::Display for ContrastCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContrastCurve::Linear => write!(f, "linear"),
            ContrastCurve::Sine => write!(f, "sine"),
            ContrastCurve::Identity => write!(f, "identity"),
        }
    }
}

/// Scale every sample's distance from the frame mean by `alpha`
///
/// Results are rounded to the nearest integer and clamped to `[0, 255]`, so
/// `alpha == 1.0` reproduces the input exactly.
pub fn adjust_contrast<P: FramePixel>(frame: &Frame<P>, alpha: f64) -> Frame<P> {
    let mean = frame.mean();
    let mut output = frame.clone();

    for sample in output.samples_mut() {
        let stretched = alpha * (f64::from(*sample) - mean) + mean;
        *sample = stretched.round().clamp(0.0, 255.0) as u8;
    }

    output
}

/// Contrast transform following a [`ContrastCurve`] over the clip
#[derive(Debug, Clone)]
pub struct ContrastAdjuster {
    curve: ContrastCurve,
    name: String,
}

impl ContrastAdjuster {
    pub fn new(curve: ContrastCurve) -> Self {
        Self {
            curve,
            name: format!("contrast-{}", curve),
        }
    }
}

impl<P: FramePixel> FrameTransform<P> for ContrastAdjuster {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        match self.curve {
            ContrastCurve::Linear => "Contrast ramping from 0.8x to 1.5x across the clip",
            ContrastCurve::Sine => "Contrast pulsing twice between 0.8x and 1.5x",
            ContrastCurve::Identity => "Unchanged contrast",
        }
    }

    fn apply(&self, frame: &Frame<P>, progress: f64) -> Result<Frame<P>> {
        Ok(adjust_contrast(frame, self.curve.alpha(progress)))
    }

    fn progress_convention(&self) -> ProgressConvention {
        ProgressConvention::OverTotal
    }
}
