//! # Pipeline Module
//!
//! Drives a frame source through a transform into one or two sinks, one frame
//! at a time.

pub mod engine;
pub mod files;
pub mod jobs;

pub use engine::{FrameTick, RunSummary};
pub use files::{contrast_video, rotate_video, transform_video};
pub use jobs::{RotationJob, RotationOutputs, TransformJob};
