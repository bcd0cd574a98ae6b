//! # Frame-Sweep
//!
//! Apply transforms that evolve across a video clip: a contrast stretch that
//! follows a ramp or pulse, and a gradual rotation with an optional
//! shrink-to-fit variant.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use frame_sweep::{config::Config, pipeline, transform::ContrastCurve};
//!
//! # fn main() -> frame_sweep::Result<()> {
//! let config = Config::default();
//! pipeline::contrast_video(
//!     Path::new("input.mp4"),
//!     Path::new("output_linear.mp4"),
//!     ContrastCurve::Linear,
//!     &config,
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`video`] - Frames, sources, sinks and the ffmpeg plumbing
//! - [`transform`] - Per-frame transforms driven by clip progress
//! - [`pipeline`] - Source to transform to sink runs
//! - [`fixture`] - Synthetic test clip
//! - [`config`] - Configuration management
//!
//! ## Custom Transforms
//!
//! Anything implementing [`FrameTransform`](transform::FrameTransform) can be
//! run by a [`TransformJob`](pipeline::TransformJob):
//!
//! ```rust
//! use frame_sweep::transform::FrameTransform;
//! use frame_sweep::video::{Frame, FramePixel};
//! use frame_sweep::Result;
//!
//! struct FadeToBlack;
//!
//! impl<P: FramePixel> FrameTransform<P> for FadeToBlack {
//!     fn name(&self) -> &str {
//!         "fade"
//!     }
//!
//!     fn description(&self) -> &str {
//!         "Darkens the clip towards its end"
//!     }
//!
//!     fn apply(&self, frame: &Frame<P>, progress: f64) -> Result<Frame<P>> {
//!         let mut out = frame.clone();
//!         for v in out.samples_mut() {
//!             *v = (f64::from(*v) * (1.0 - progress)).round() as u8;
//!         }
//!         Ok(out)
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod fixture;
pub mod pipeline;
pub mod transform;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    config::Config,
    error::{Result, SweepError},
    pipeline::{RotationJob, TransformJob},
    transform::{ContrastCurve, FrameTransform, RotationScaler, RotationVariant},
};
