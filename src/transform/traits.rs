use crate::{
    error::Result,
    transform::ProgressConvention,
    video::types::{Frame, FramePixel},
};

/// Core trait for per-frame transforms driven by clip progress
pub trait FrameTransform<P: FramePixel>: Send + Sync {
    /// Returns the unique name of this transform
    fn name(&self) -> &str;

    /// Returns a human-readable description of this transform
    fn description(&self) -> &str;

    /// Produce a new frame from `frame` at the given progress
    ///
    /// # Arguments
    ///
    /// * `frame` - The source frame, left untouched
    /// * `progress` - Position of the frame within the clip, in `[0, 1]`
    ///
    /// The returned frame always has the dimensions of the input.
    fn apply(&self, frame: &Frame<P>, progress: f64) -> Result<Frame<P>>;

    /// Progress normalization this transform is designed around
    fn progress_convention(&self) -> ProgressConvention {
        ProgressConvention::OverTotal
    }

    /// Check the transform can run on frames of the given size
    fn validate(&self, width: u32, height: u32) -> Result<()> {
        let _ = (width, height);
        Ok(())
    }
}
