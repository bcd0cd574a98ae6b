use std::fmt;

use image::{ImageBuffer, Luma, Pixel, Rgb};
use serde::{Deserialize, Serialize};

/// Sample layout of the frames flowing through a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Gray,
    Rgb,
}

impl ColorMode {
    /// Number of 8-bit samples per pixel
    pub fn channels(self) -> usize {
        match self {
            ColorMode::Gray => 1,
            ColorMode::Rgb => 3,
        }
    }

    /// Raw pixel format name understood by ffmpeg
    pub fn pix_fmt(self) -> &'static str {
        match self {
            ColorMode::Gray => "gray",
            ColorMode::Rgb => "rgb24",
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorMode::Gray => write!(f, "gray"),
            ColorMode::Rgb => write!(f, "rgb"),
        }
    }
}

/// 8-bit pixel types a frame can carry
pub trait FramePixel: Pixel<Subpixel = u8> + fmt::Debug + PartialEq + Send + Sync {
    const COLOR_MODE: ColorMode;

    /// All-zero pixel used to fill areas with no source content
    fn black() -> Self {
        let zeros = [0u8; 4];
        *Self::from_slice(&zeros[..Self::CHANNEL_COUNT as usize])
    }
}

impl FramePixel for Luma<u8> {
    const COLOR_MODE: ColorMode = ColorMode::Gray;
}

impl FramePixel for Rgb<u8> {
    const COLOR_MODE: ColorMode = ColorMode::Rgb;
}

/// Represents a single video frame
///
/// A thin wrapper around an 8-bit image buffer. Grayscale frames carry
/// [`Luma<u8>`] pixels, color frames carry [`Rgb<u8>`] pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame<P: FramePixel = Rgb<u8>> {
    buffer: ImageBuffer<P, Vec<u8>>,
}

/// Single-channel frame
pub type GrayFrame = Frame<Luma<u8>>;

/// Three-channel RGB frame
pub type RgbFrame = Frame<Rgb<u8>>;

impl<P: FramePixel> Frame<P> {
    /// Create a new frame with the given dimensions filled with black
    pub fn new_black(width: u32, height: u32) -> Self {
        Self::new_filled(width, height, P::black())
    }

    /// Create a new frame with the given dimensions filled with one pixel value
    pub fn new_filled(width: u32, height: u32, pixel: P) -> Self {
        Self {
            buffer: ImageBuffer::from_pixel(width, height, pixel),
        }
    }

    /// Create a frame from raw row-major samples
    ///
    /// Returns `None` when the sample count does not match the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> P {
        *self.buffer.get_pixel(x, y)
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: P) {
        self.buffer.put_pixel(x, y, pixel);
    }

    /// All samples, row-major, channels interleaved
    pub fn samples(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Mutable access to all samples
    pub fn samples_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    pub fn as_image_mut(&mut self) -> &mut ImageBuffer<P, Vec<u8>> {
        &mut self.buffer
    }

    /// Mean over every sample of every channel
    pub fn mean(&self) -> f64 {
        let samples = self.samples();
        if samples.is_empty() {
            return 0.0;
        }
        let sum: u64 = samples.iter().map(|&s| u64::from(s)).sum();
        sum as f64 / samples.len() as f64
    }
}

/// Immutable per-run description of a video stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMetadata {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    /// Frame count declared by the container; 0 when unknown
    pub total_frames: u64,
}

impl VideoMetadata {
    pub fn new(fps: f64, width: u32, height: u32, total_frames: u64) -> Self {
        Self {
            fps,
            width,
            height,
            total_frames,
        }
    }

    /// Bytes in one raw frame of the given color mode
    pub fn frame_bytes(&self, mode: ColorMode) -> usize {
        self.width as usize * self.height as usize * mode.channels()
    }

    /// Declared duration in seconds, if the frame rate is known
    pub fn duration(&self) -> Option<f64> {
        (self.fps > 0.0).then(|| self.total_frames as f64 / self.fps)
    }
}
