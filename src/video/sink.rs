use std::fmt;
use std::io::{Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::EncoderConfig;
use crate::error::{Result, VideoError};
use crate::video::ffmpeg;
use crate::video::types::{ColorMode, Frame, FramePixel, VideoMetadata};

/// Fallback frame rate when the source does not declare one
const DEFAULT_FPS: f64 = 30.0;

/// One (container, codec) pairing to try when opening an output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderCandidate {
    /// File extension the output takes when this candidate is used
    pub extension: String,
    /// ffmpeg muxer name
    pub muxer: String,
    /// ffmpeg video encoder name
    pub codec: String,
    /// Optional FourCC written into the container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl EncoderCandidate {
    pub fn new(extension: &str, muxer: &str, codec: &str, tag: Option<&str>) -> Self {
        Self {
            extension: extension.to_string(),
            muxer: muxer.to_string(),
            codec: codec.to_string(),
            tag: tag.map(str::to_string),
        }
    }

    /// `path` with its extension replaced by this candidate's
    pub fn output_path(&self, path: &Path) -> PathBuf {
        path.with_extension(&self.extension)
    }
}

impl fmt::Display for EncoderCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.extension, self.codec)
    }
}

/// The default ordered candidate list: MPEG-4 in MP4, then Xvid in AVI
pub fn default_candidates() -> Vec<EncoderCandidate> {
    vec![
        EncoderCandidate::new("mp4", "mp4", "mpeg4", Some("mp4v")),
        EncoderCandidate::new("avi", "avi", "libxvid", None),
    ]
}

/// Try each candidate in order until `open` succeeds
///
/// Returns the opened value together with the candidate that produced it.
pub fn open_with_fallback<'a, T, F>(
    candidates: &'a [EncoderCandidate],
    mut open: F,
) -> Result<(T, &'a EncoderCandidate)>
where
    F: FnMut(&EncoderCandidate) -> Result<T>,
{
    let mut attempts = Vec::with_capacity(candidates.len());

    for (index, candidate) in candidates.iter().enumerate() {
        match open(candidate) {
            Ok(value) => {
                if index > 0 {
                    info!("Using fallback encoder {}", candidate);
                }
                return Ok((value, candidate));
            }
            Err(e) => {
                warn!("Could not initialize writer with {}: {}", candidate, e);
                attempts.push(candidate.to_string());
            }
        }
    }

    error!("Could not initialize a writer with any available codec");
    Err(VideoError::SinkOpenFailed { attempts }.into())
}

/// Consumer of transformed frames
///
/// Dropping a sink without calling [`FrameSink::finish`] abandons the output.
pub trait FrameSink<P: FramePixel> {
    /// What a successfully finished sink hands back
    type Output;

    fn write_frame(&mut self, frame: &Frame<P>) -> Result<()>;

    /// Flush and close the output
    fn finish(self) -> Result<Self::Output>
    where
        Self: Sized;

    fn frames_written(&self) -> u64;
}

/// Represents an encoded video output
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedVideo {
    pub path: PathBuf,
    pub frame_count: u64,
    pub file_size: u64,
}

/// Encodes frames by piping raw samples into the ffmpeg CLI
///
/// Output goes to a hidden partial file next to the target, renamed into
/// place by `finish`. A sink dropped before that deletes the partial file.
pub struct FfmpegSink<P: FramePixel> {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<String>>,
    partial_path: PathBuf,
    final_path: PathBuf,
    width: u32,
    height: u32,
    frames_written: u64,
    finished: bool,
    _pixel: PhantomData<P>,
}

/// Everything that shapes one encoder invocation
struct EncodeParams<'a> {
    settings: &'a EncoderConfig,
    candidate: &'a EncoderCandidate,
    width: u32,
    height: u32,
    fps: f64,
    mode: ColorMode,
}

impl EncodeParams<'_> {
    fn command(&self, target: &Path, frame_limit: Option<u64>) -> Command {
        let mut cmd = Command::new(&self.settings.ffmpeg);
        cmd.args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(["-f", "rawvideo", "-pix_fmt", self.mode.pix_fmt()])
            .arg("-s")
            .arg(format!("{}x{}", self.width, self.height))
            .arg("-r")
            .arg(self.fps.to_string())
            .args(["-i", "pipe:0", "-an"])
            .arg("-c:v")
            .arg(&self.candidate.codec);
        if let Some(tag) = &self.candidate.tag {
            cmd.arg("-vtag").arg(tag);
        }
        if let Some(limit) = frame_limit {
            cmd.arg("-frames:v").arg(limit.to_string());
        }
        cmd.arg("-q:v")
            .arg(quality_to_qscale(self.settings.quality).to_string())
            .args(["-pix_fmt", "yuv420p", "-f"])
            .arg(&self.candidate.muxer)
            .arg(target)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }

    /// Encode one black frame to `scratch` and check ffmpeg accepts it
    ///
    /// A listed encoder can still refuse its parameters, muxer or tag; that
    /// only shows up once it actually starts.
    fn trial(&self, scratch: &Path) -> Result<()> {
        let mut cmd = self.command(scratch, Some(1));
        debug!("Trial encode: {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| VideoError::EncodingFailed {
            reason: format!("failed to spawn {}: {}", self.settings.ffmpeg, e),
        })?;

        let blank = vec![0u8; self.width as usize * self.height as usize * self.mode.channels()];
        let written = child
            .stdin
            .take()
            .map(|mut stdin| stdin.write_all(&blank))
            .unwrap_or(Ok(()));
        let output = child.wait_with_output();

        if scratch.exists() {
            if let Err(e) = std::fs::remove_file(scratch) {
                warn!("Failed to remove trial output {}: {}", scratch.display(), e);
            }
        }

        let output = output?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VideoError::EncodingFailed {
                reason: format!(
                    "{} refused to start ({}): {}",
                    self.candidate,
                    output.status,
                    stderr.trim()
                ),
            }
            .into());
        }
        written.map_err(|e| VideoError::EncodingFailed {
            reason: format!("{} did not accept input: {}", self.candidate, e),
        })?;
        Ok(())
    }
}

impl<P: FramePixel> FfmpegSink<P> {
    /// Open an encoder writing `path` (extension replaced by the candidate's)
    ///
    /// The candidate must be listed by `ffmpeg -encoders` and must encode a
    /// trial frame before the real output is started.
    pub fn open(
        path: &Path,
        metadata: &VideoMetadata,
        candidate: &EncoderCandidate,
        settings: &EncoderConfig,
    ) -> Result<Self> {
        if metadata.width == 0 || metadata.height == 0 {
            return Err(VideoError::InvalidParameters {
                details: format!("cannot encode {}x{} frames", metadata.width, metadata.height),
            }
            .into());
        }

        if !ffmpeg::encoder_available(&settings.ffmpeg, &candidate.codec) {
            return Err(VideoError::EncodingFailed {
                reason: format!("encoder '{}' is not available", candidate.codec),
            }
            .into());
        }

        let final_path = candidate.output_path(path);
        let partial_path = sibling_path(&final_path, "partial");
        if let Some(parent) = final_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let fps = if metadata.fps > 0.0 {
            metadata.fps
        } else {
            warn!("Source frame rate unknown, encoding at {} fps", DEFAULT_FPS);
            DEFAULT_FPS
        };
        let params = EncodeParams {
            settings,
            candidate,
            width: metadata.width,
            height: metadata.height,
            fps,
            mode: P::COLOR_MODE,
        };

        params.trial(&sibling_path(&final_path, "trial"))?;

        let mut cmd = params.command(&partial_path, None);
        debug!("Spawning encoder: {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| VideoError::EncodingFailed {
            reason: format!("failed to spawn {}: {}", settings.ffmpeg, e),
        })?;
        let stdin = child.stdin.take();
        // Drained off-thread so a chatty encoder never blocks on a full pipe
        let stderr = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut bytes = Vec::new();
                let _ = pipe.read_to_end(&mut bytes);
                String::from_utf8_lossy(&bytes).into_owned()
            })
        });

        info!(
            "Writing {} ({}x{} {} @ {:.2} fps, {})",
            final_path.display(),
            metadata.width,
            metadata.height,
            params.mode,
            fps,
            candidate
        );

        Ok(Self {
            child: Some(child),
            stdin,
            stderr,
            partial_path,
            final_path,
            width: metadata.width,
            height: metadata.height,
            frames_written: 0,
            finished: false,
            _pixel: PhantomData,
        })
    }

}

impl<P: FramePixel> FrameSink<P> for FfmpegSink<P> {
    type Output = EncodedVideo;

    fn write_frame(&mut self, frame: &Frame<P>) -> Result<()> {
        check_dimensions(self.width, self.height, frame)?;

        let stdin = self.stdin.as_mut().ok_or_else(|| VideoError::EncodingFailed {
            reason: "encoder input already closed".to_string(),
        })?;
        stdin
            .write_all(frame.samples())
            .map_err(|e| VideoError::EncodingFailed {
                reason: format!("failed to write frame {}: {}", self.frames_written, e),
            })?;

        self.frames_written += 1;
        Ok(())
    }

    fn finish(mut self) -> Result<EncodedVideo> {
        // Closing stdin signals end of input to ffmpeg
        drop(self.stdin.take());

        let mut child = self.child.take().ok_or_else(|| VideoError::EncodingFailed {
            reason: "encoder process already reaped".to_string(),
        })?;
        let status = child.wait()?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(VideoError::EncodingFailed {
                reason: format!("ffmpeg failed ({}): {}", status, stderr.trim()),
            }
            .into());
        }

        std::fs::rename(&self.partial_path, &self.final_path)?;
        self.finished = true;

        let file_size = std::fs::metadata(&self.final_path)?.len();
        info!(
            "Output saved to: {} ({} frames, {} KB)",
            self.final_path.display(),
            self.frames_written,
            file_size / 1024
        );

        Ok(EncodedVideo {
            path: self.final_path.clone(),
            frame_count: self.frames_written,
            file_size,
        })
    }

    fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl<P: FramePixel> Drop for FfmpegSink<P> {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if !self.finished && self.partial_path.exists() {
            warn!("Discarding unfinished output {}", self.final_path.display());
            if let Err(e) = std::fs::remove_file(&self.partial_path) {
                warn!("Failed to remove partial output: {}", e);
            }
        }
    }
}

/// Collects frames in memory
pub struct MemorySink<P: FramePixel> {
    width: u32,
    height: u32,
    frames: Vec<Frame<P>>,
}

impl<P: FramePixel> MemorySink<P> {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frames: Vec::new(),
        }
    }

    pub fn for_metadata(metadata: &VideoMetadata) -> Self {
        Self::new(metadata.width, metadata.height)
    }
}

impl<P: FramePixel> FrameSink<P> for MemorySink<P> {
    type Output = Vec<Frame<P>>;

    fn write_frame(&mut self, frame: &Frame<P>) -> Result<()> {
        check_dimensions(self.width, self.height, frame)?;
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(self) -> Result<Vec<Frame<P>>> {
        Ok(self.frames)
    }

    fn frames_written(&self) -> u64 {
        self.frames.len() as u64
    }
}

fn check_dimensions<P: FramePixel>(width: u32, height: u32, frame: &Frame<P>) -> Result<()> {
    if frame.dimensions() != (width, height) {
        return Err(VideoError::FrameSizeMismatch {
            expected_width: width,
            expected_height: height,
            actual_width: frame.width(),
            actual_height: frame.height(),
        }
        .into());
    }
    Ok(())
}

/// `dir/name.ext` -> `dir/.name.<label>.ext`
fn sibling_path(final_path: &Path, label: &str) -> PathBuf {
    let stem = final_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match final_path.extension() {
        Some(ext) => format!(".{}.{}.{}", stem, label, ext.to_string_lossy()),
        None => format!(".{}.{}", stem, label),
    };
    final_path.with_file_name(name)
}

/// Map 0-100 quality onto ffmpeg's 1 (best) .. 31 (worst) qscale
fn quality_to_qscale(quality: u8) -> u8 {
    let quality = quality.min(100) as f32 / 100.0;
    (31.0 - quality * 30.0).round().clamp(1.0, 31.0) as u8
}
