//! File-to-file runs backed by the ffmpeg collaborator.

use std::path::Path;

use image::{Luma, Rgb};
use tracing::info;

use crate::{
    config::Config,
    error::{Result, VideoError},
    pipeline::{
        engine::RunSummary,
        jobs::{RotationJob, RotationOutputs, TransformJob},
    },
    transform::{ContrastAdjuster, ContrastCurve, FrameTransform},
    video::{open_with_fallback, EncodedVideo, FfmpegSink, FfmpegSource, FramePixel},
};

/// Run any transform over a video file into one output file
pub fn transform_video<P, T>(
    input: &Path,
    output: &Path,
    transform: T,
    config: &Config,
) -> Result<RunSummary<EncodedVideo>>
where
    P: FramePixel,
    T: FrameTransform<P>,
{
    let encoder = &config.encoder;
    let source = FfmpegSource::<P>::open(input, &encoder.ffmpeg, &encoder.ffprobe)?;

    TransformJob::new(transform)
        .with_report_steps(config.run.progress_report_steps)
        .run(source, |metadata| {
            let (sink, _) = open_with_fallback(&encoder.candidates, |candidate| {
                FfmpegSink::<P>::open(output, metadata, candidate, encoder)
            })?;
            Ok(sink)
        })
}

/// Contrast sweep over the grayscale version of a video file
pub fn contrast_video(
    input: &Path,
    output: &Path,
    curve: ContrastCurve,
    config: &Config,
) -> Result<RunSummary<EncodedVideo>> {
    let adjuster = ContrastAdjuster::new(curve);
    let summary = transform_video::<Luma<u8>, _>(input, output, adjuster, config)?;
    info!(
        "Finished processing '{}' mode. Output saved to: {}",
        curve,
        summary.output.path.display()
    );
    Ok(summary)
}

/// Gradual rotation writing both the normal and the scaled variant
///
/// Both outputs are opened with the same encoder candidate; if either fails
/// the pair moves on to the next candidate together.
pub fn rotate_video(
    input: &Path,
    normal_output: &Path,
    scaled_output: &Path,
    job: &RotationJob,
    config: &Config,
) -> Result<RunSummary<RotationOutputs<EncodedVideo>>> {
    if normal_output == scaled_output {
        return Err(VideoError::InvalidParameters {
            details: format!(
                "normal and scaled outputs must differ, both are {}",
                normal_output.display()
            ),
        }
        .into());
    }

    let encoder = &config.encoder;
    let source = FfmpegSource::<Rgb<u8>>::open(input, &encoder.ffmpeg, &encoder.ffprobe)?;

    let summary = job.run(source, |metadata| {
        let (pair, _) = open_with_fallback(&encoder.candidates, |candidate| {
            let normal = FfmpegSink::<Rgb<u8>>::open(normal_output, metadata, candidate, encoder)?;
            let scaled = FfmpegSink::<Rgb<u8>>::open(scaled_output, metadata, candidate, encoder)?;
            Ok((normal, scaled))
        })?;
        Ok(pair)
    })?;

    info!("Normal rotation output saved to: {}", summary.output.normal.path.display());
    info!("Scaled rotation output saved to: {}", summary.output.scaled.path.display());
    Ok(summary)
}
