//! # Video I/O Module
//!
//! Frame sources and sinks, plus the ffmpeg command line plumbing behind them.

pub mod ffmpeg;
pub mod sink;
pub mod source;
pub mod types;

pub use sink::{
    default_candidates, open_with_fallback, EncodedVideo, EncoderCandidate, FfmpegSink, FrameSink,
    MemorySink,
};
pub use source::{FfmpegSource, FrameSource, MemorySource, PrimedSource};
pub use types::{ColorMode, Frame, FramePixel, GrayFrame, RgbFrame, VideoMetadata};

#[cfg(all(test, unix))]
pub(crate) mod stub_tools;
