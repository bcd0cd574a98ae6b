//! Synthetic test clip: a red disc and a green square circling the canvas.

use std::f64::consts::TAU;
use std::path::Path;

use image::Rgb;
use imageproc::{
    drawing::{draw_filled_circle_mut, draw_filled_rect_mut},
    rect::Rect,
};
use tracing::info;

use crate::{
    config::Config,
    error::{Result, VideoError},
    video::{
        open_with_fallback, EncodedVideo, FfmpegSink, FrameSink, FrameSource, RgbFrame,
        VideoMetadata,
    },
};

const CIRCLE_RADIUS: i32 = 50;
const SQUARE_HALF: i32 = 30;
const RED: Rgb<u8> = Rgb([255, 0, 0]);
const GREEN: Rgb<u8> = Rgb([0, 255, 0]);

/// Size and length of the generated clip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixtureSpec {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub frames: u64,
}

impl Default for FixtureSpec {
    fn default() -> Self {
        Self::from_seconds(640, 480, 30.0, 5.0)
    }
}

impl FixtureSpec {
    pub fn from_seconds(width: u32, height: u32, fps: f64, seconds: f64) -> Self {
        Self {
            width,
            height,
            fps,
            frames: (fps * seconds).round().max(0.0) as u64,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.frames == 0 || !(self.fps > 0.0) {
            return Err(VideoError::InvalidParameters {
                details: format!(
                    "fixture needs a non-empty canvas and clip, got {}x{} with {} frames at {} fps",
                    self.width, self.height, self.frames, self.fps
                ),
            }
            .into());
        }
        Ok(())
    }
}

/// Render frame `index` of a `total`-frame clip
pub fn fixture_frame(width: u32, height: u32, index: u64, total: u64) -> RgbFrame {
    let mut frame = RgbFrame::new_black(width, height);
    let t = if total == 0 {
        0.0
    } else {
        TAU * index as f64 / total as f64
    };
    let (w, h) = (f64::from(width), f64::from(height));

    let circle = (
        (w * (0.5 + 0.3 * t.sin())) as i32,
        (h * (0.5 + 0.3 * t.cos())) as i32,
    );
    draw_filled_circle_mut(frame.as_image_mut(), circle, CIRCLE_RADIUS, RED);

    let (sx, sy) = (
        (w * (0.5 + 0.3 * t.cos())) as i32,
        (h * (0.5 + 0.3 * t.sin())) as i32,
    );
    let side = (2 * SQUARE_HALF + 1) as u32;
    draw_filled_rect_mut(
        frame.as_image_mut(),
        Rect::at(sx - SQUARE_HALF, sy - SQUARE_HALF).of_size(side, side),
        GREEN,
    );

    frame
}

/// Frame source that draws the fixture on demand
pub struct FixtureSource {
    clip: FixtureSpec,
    metadata: VideoMetadata,
    next: u64,
}

impl FixtureSource {
    pub fn new(clip: FixtureSpec) -> Self {
        Self {
            clip,
            metadata: VideoMetadata::new(clip.fps, clip.width, clip.height, clip.frames),
            next: 0,
        }
    }
}

impl FrameSource<Rgb<u8>> for FixtureSource {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn next_frame(&mut self) -> Result<Option<RgbFrame>> {
        if self.next >= self.clip.frames {
            return Ok(None);
        }
        let frame = fixture_frame(self.clip.width, self.clip.height, self.next, self.clip.frames);
        self.next += 1;
        Ok(Some(frame))
    }

    fn describe(&self) -> String {
        format!("fixture {}x{}", self.clip.width, self.clip.height)
    }
}

/// Encode the fixture clip at `path` through the configured candidates
pub fn write_fixture(path: &Path, clip: &FixtureSpec, config: &Config) -> Result<EncodedVideo> {
    clip.validate()?;
    let encoder = &config.encoder;
    let mut source = FixtureSource::new(*clip);
    let metadata = *source.metadata();

    let (mut sink, _) = open_with_fallback(&encoder.candidates, |candidate| {
        FfmpegSink::<Rgb<u8>>::open(path, &metadata, candidate, encoder)
    })?;

    while let Some(frame) = source.next_frame()? {
        sink.write_frame(&frame)?;
    }

    let video = sink.finish()?;
    info!(
        "Test video created: {} ({} frames)",
        video.path.display(),
        video.frame_count
    );
    Ok(video)
}
