use tracing::{debug, info};

use crate::{
    error::Result,
    pipeline::engine::{drive, RunSummary},
    transform::{FrameTransform, ProgressConvention, RotationScaler, RotationVariant},
    video::{FramePixel, FrameSink, FrameSource, PrimedSource, VideoMetadata},
};

const DEFAULT_REPORT_STEPS: u32 = 10;

/// Runs one transform from a source into a single sink
pub struct TransformJob<T> {
    transform: T,
    convention: Option<ProgressConvention>,
    report_steps: u32,
}

impl<T> TransformJob<T> {
    pub fn new(transform: T) -> Self {
        Self {
            transform,
            convention: None,
            report_steps: DEFAULT_REPORT_STEPS,
        }
    }

    /// Override the transform's own progress convention
    pub fn with_convention(mut self, convention: ProgressConvention) -> Self {
        self.convention = Some(convention);
        self
    }

    /// Number of progress log lines over the clip
    pub fn with_report_steps(mut self, steps: u32) -> Self {
        self.report_steps = steps.max(1);
        self
    }

    /// Process the whole stream
    ///
    /// `open_sink` is called only after the first frame has been read, so a
    /// source that fails or is empty never creates an output.
    pub fn run<P, Src, Snk, F>(&self, source: Src, open_sink: F) -> Result<RunSummary<Snk::Output>>
    where
        P: FramePixel,
        T: FrameTransform<P>,
        Src: FrameSource<P>,
        Snk: FrameSink<P>,
        F: FnOnce(&VideoMetadata) -> Result<Snk>,
    {
        let mut source = PrimedSource::prime(source)?;
        let metadata = *source.metadata();
        self.transform.validate(metadata.width, metadata.height)?;

        let convention = self
            .convention
            .unwrap_or_else(|| self.transform.progress_convention());

        info!(
            "Applying {} to {} ({}x{}, {:.2} fps, {} frames, progress {})",
            self.transform.name(),
            source.describe(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.total_frames,
            convention
        );
        debug!("{}: {}", self.transform.name(), self.transform.description());

        let mut sink = open_sink(&metadata)?;

        let frames = drive(&mut source, convention, self.report_steps, |frame, tick| {
            let transformed = self.transform.apply(&frame, tick.progress)?;
            if tick.report {
                info!(
                    "Processing: {}/{} frames ({:.1}%)",
                    tick.index, tick.total, tick.percent()
                );
            }
            sink.write_frame(&transformed)
        })?;

        debug!("Closing output after {} frames", sink.frames_written());
        let output = sink.finish()?;
        info!("Finished {} over {} frames", self.transform.name(), frames);

        Ok(RunSummary {
            frames_processed: frames,
            declared_frames: metadata.total_frames,
            output,
        })
    }
}

/// Both rotation outputs of one run
#[derive(Debug, Clone, PartialEq)]
pub struct RotationOutputs<O> {
    pub normal: O,
    pub scaled: O,
}

/// Gradual rotation writing the normal and scaled variants side by side
pub struct RotationJob {
    final_angle: f64,
    center: Option<(f64, f64)>,
    convention: ProgressConvention,
    report_steps: u32,
}

impl RotationJob {
    pub fn new(final_angle: f64) -> Self {
        Self {
            final_angle,
            center: None,
            convention: ProgressConvention::OverLastIndex,
            report_steps: DEFAULT_REPORT_STEPS,
        }
    }

    pub fn with_center(mut self, center: (f64, f64)) -> Self {
        self.center = Some(center);
        self
    }

    pub fn with_convention(mut self, convention: ProgressConvention) -> Self {
        self.convention = convention;
        self
    }

    pub fn with_report_steps(mut self, steps: u32) -> Self {
        self.report_steps = steps.max(1);
        self
    }

    fn scaler(&self) -> RotationScaler {
        let scaler = RotationScaler::new(self.final_angle, RotationVariant::Normal);
        match self.center {
            Some(center) => scaler.with_center(center),
            None => scaler,
        }
    }

    /// Process the whole stream into a (normal, scaled) pair of sinks
    ///
    /// Each frame's angle is computed once and fed to both variants.
    pub fn run<P, Src, Snk, F>(
        &self,
        source: Src,
        open_sinks: F,
    ) -> Result<RunSummary<RotationOutputs<Snk::Output>>>
    where
        P: FramePixel,
        Src: FrameSource<P>,
        Snk: FrameSink<P>,
        F: FnOnce(&VideoMetadata) -> Result<(Snk, Snk)>,
    {
        let mut source = PrimedSource::prime(source)?;
        let metadata = *source.metadata();
        let scaler = self.scaler();
        FrameTransform::<P>::validate(&scaler, metadata.width, metadata.height)?;

        info!(
            "Video info: {}x{}, {:.2} FPS, {} total frames; rotating to {}° about {:?}",
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.total_frames,
            self.final_angle,
            scaler.center_for(metadata.width, metadata.height)
        );

        let (mut normal, mut scaled) = open_sinks(&metadata)?;

        let frames = drive(&mut source, self.convention, self.report_steps, |frame, tick| {
            let step = scaler.step(tick.progress, frame.width(), frame.height());

            normal.write_frame(&scaler.render(&frame, &step, RotationVariant::Normal)?)?;
            scaled.write_frame(&scaler.render(&frame, &step, RotationVariant::Scaled)?)?;

            if tick.report {
                info!(
                    "Processing: {}/{} frames ({:.1}%), Angle: {:.1}°, Scale: {:.3}",
                    tick.index,
                    tick.total,
                    tick.percent(),
                    step.angle,
                    step.fit_scale
                );
            } else {
                debug!(
                    "Frame {}: angle {:.3}°, scale {:.4}",
                    tick.index, step.angle, step.fit_scale
                );
            }
            Ok(())
        })?;

        let normal = normal.finish()?;
        let scaled = scaled.finish()?;

        Ok(RunSummary {
            frames_processed: frames,
            declared_frames: metadata.total_frames,
            output: RotationOutputs { normal, scaled },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SweepError, VideoError};
    use crate::transform::{scale_to_fit, ContrastAdjuster, ContrastCurve};
    use crate::video::{GrayFrame, MemorySink, MemorySource, RgbFrame};
    use image::{Luma, Rgb};
    use std::f64::consts::FRAC_1_SQRT_2;

    fn two_tone(width: u32, height: u32) -> GrayFrame {
        let data = (0..width * height)
            .map(|i| if i % 2 == 0 { 60 } else { 180 })
            .collect();
        GrayFrame::from_raw(width, height, data).unwrap()
    }

    fn color_pattern(width: u32, height: u32) -> RgbFrame {
        let mut frame = RgbFrame::new_black(width, height);
        for y in 0..height {
            for x in 0..width {
                frame.set_pixel(x, y, Rgb([(x * 9) as u8, (y * 11) as u8, 128]));
            }
        }
        frame
    }

    #[test]
    fn test_linear_contrast_over_ten_frames() {
        let frames = vec![two_tone(8, 6); 10];
        let job = TransformJob::new(ContrastAdjuster::new(ContrastCurve::Linear));

        let summary = job
            .run(MemorySource::new(30.0, frames), |m| Ok(MemorySink::for_metadata(m)))
            .unwrap();

        assert_eq!(summary.frames_processed, 10);
        assert!(summary.premature_end().is_none());

        // Mean is 120, so the bright sample sits at 120 + 60 * alpha
        let alphas: Vec<f64> = summary
            .output
            .iter()
            .map(|f| {
                assert_eq!(f.dimensions(), (8, 6));
                (f64::from(f.get_pixel(1, 0)[0]) - 120.0) / 60.0
            })
            .collect();

        assert!((alphas[0] - 0.8).abs() < 0.01);
        assert!((alphas[9] - 1.43).abs() < 0.01);
        assert!(alphas.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_identity_mode_round_trips_clip() {
        let frames = vec![
            two_tone(5, 5),
            GrayFrame::new_filled(5, 5, Luma([17])),
            two_tone(5, 5),
        ];
        let job = TransformJob::new(ContrastAdjuster::new(ContrastCurve::from_name("other")));

        let once = job
            .run(MemorySource::new(30.0, frames.clone()), |m| Ok(MemorySink::for_metadata(m)))
            .unwrap()
            .output;
        let twice = job
            .run(MemorySource::new(30.0, once), |m| Ok(MemorySink::for_metadata(m)))
            .unwrap()
            .output;

        assert_eq!(twice, frames);
    }

    #[test]
    fn test_empty_source_opens_no_sink() {
        let job = TransformJob::new(ContrastAdjuster::new(ContrastCurve::Sine));
        let mut opened = false;

        let result = job.run(MemorySource::<Luma<u8>>::new(30.0, Vec::new()), |m| {
            opened = true;
            Ok(MemorySink::for_metadata(m))
        });

        assert!(matches!(
            result,
            Err(SweepError::Video(VideoError::EmptySource { .. }))
        ));
        assert!(!opened);
    }

    #[test]
    fn test_truncated_stream_is_not_fatal() {
        let source = MemorySource::new(30.0, vec![two_tone(4, 4); 3]).with_declared_frames(5);
        let job = TransformJob::new(ContrastAdjuster::new(ContrastCurve::Linear));

        let summary = job.run(source, |m| Ok(MemorySink::for_metadata(m))).unwrap();

        assert_eq!(summary.output.len(), 3);
        assert!(matches!(
            summary.premature_end(),
            Some(VideoError::PrematureEndOfStream { expected: 5, delivered: 3 })
        ));
    }

    #[test]
    fn test_single_frame_rotation_is_identity() {
        let frame = color_pattern(20, 12);
        let job = RotationJob::new(360.0);

        let summary = job
            .run(MemorySource::new(30.0, vec![frame.clone()]), |m| {
                Ok((MemorySink::for_metadata(m), MemorySink::for_metadata(m)))
            })
            .unwrap();

        assert_eq!(summary.frames_processed, 1);
        assert_eq!(summary.output.normal, vec![frame.clone()]);
        assert_eq!(summary.output.scaled, vec![frame]);
    }

    #[test]
    fn test_rotation_sweep_ends_on_full_turn() {
        let frame = color_pattern(16, 10);
        let job = RotationJob::new(360.0);

        let summary = job
            .run(MemorySource::new(30.0, vec![frame.clone(); 7]), |m| {
                Ok((MemorySink::for_metadata(m), MemorySink::for_metadata(m)))
            })
            .unwrap();

        let RotationOutputs { normal, scaled } = summary.output;
        assert_eq!(normal.len(), 7);
        assert_eq!(scaled.len(), 7);
        // Angles step by 60 degrees: 0, 60, 120, 180, 240, 300, 360
        assert_eq!(normal[0], frame);
        assert_eq!(normal[6], frame);
        assert_eq!(scaled[6], frame);
        assert_eq!(normal[3], scaled[3]);
        assert_ne!(normal[1], scaled[1]);
        assert!(normal.iter().chain(&scaled).all(|f| f.dimensions() == (16, 10)));
    }

    #[test]
    fn test_square_canvas_scale_at_45() {
        let scaler = RotationJob::new(90.0).scaler();
        let step = scaler.step(0.5, 100, 100);
        assert_eq!(step.angle, 45.0);
        assert!((step.fit_scale - FRAC_1_SQRT_2).abs() < 1e-12);
        assert_eq!(step.fit_scale, scale_to_fit(45.0, 100, 100));
    }

    #[test]
    fn test_sink_open_failure_propagates() {
        let job = RotationJob::new(360.0);
        let result = job.run(
            MemorySource::new(30.0, vec![color_pattern(4, 4)]),
            |_| -> Result<(MemorySink<Rgb<u8>>, MemorySink<Rgb<u8>>)> {
                Err(VideoError::SinkOpenFailed { attempts: vec!["mp4/mpeg4".to_string()] }.into())
            },
        );
        assert!(matches!(
            result,
            Err(SweepError::Video(VideoError::SinkOpenFailed { .. }))
        ));
    }
}
