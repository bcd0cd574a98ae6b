use tracing::{debug, warn};

use crate::{
    error::{Result, VideoError},
    transform::ProgressConvention,
    video::{Frame, FramePixel, FrameSource},
};

/// Position of the frame currently being processed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Zero-based index within the run
    pub index: u64,
    /// Frame count declared by the source (0 when unknown)
    pub total: u64,
    /// Normalized position in `[0, 1]`
    pub progress: f64,
    /// Whether this frame falls on a progress-report boundary; never set
    /// when the frame count is unknown
    pub report: bool,
}

impl FrameTick {
    /// Percentage of declared frames already handled, for log lines
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.index as f64 / self.total as f64 * 100.0
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary<O> {
    /// Frames read, transformed and written
    pub frames_processed: u64,
    /// Frames the source declared up front
    pub declared_frames: u64,
    /// What the sink(s) handed back on finish
    pub output: O,
}

impl<O> RunSummary<O> {
    /// The shortfall, when the stream stopped before its declared length
    pub fn premature_end(&self) -> Option<VideoError> {
        (self.declared_frames > 0 && self.frames_processed < self.declared_frames).then(|| {
            VideoError::PrematureEndOfStream {
                expected: self.declared_frames,
                delivered: self.frames_processed,
            }
        })
    }
}

/// Pull every frame from `source` and hand it to `step` with its tick
///
/// The frame index lives here and nowhere else. Returns the number of frames
/// processed; running out of frames early is not an error.
pub(crate) fn drive<P, S, F>(
    source: &mut S,
    convention: ProgressConvention,
    report_steps: u32,
    mut step: F,
) -> Result<u64>
where
    P: FramePixel,
    S: FrameSource<P>,
    F: FnMut(Frame<P>, FrameTick) -> Result<()>,
{
    let total = source.metadata().total_frames;
    let report_every = (total / u64::from(report_steps.max(1))).max(1);
    let mut index = 0u64;

    while let Some(frame) = source.next_frame()? {
        let tick = FrameTick {
            index,
            total,
            progress: convention.progress(index, total),
            report: total > 0 && index % report_every == 0,
        };
        step(frame, tick)?;
        index += 1;
    }

    if total > 0 && index < total {
        warn!(
            "{} ended after {} of {} declared frames",
            source.describe(),
            index,
            total
        );
    } else {
        debug!("Processed {} frames from {}", index, source.describe());
    }

    Ok(index)
}
