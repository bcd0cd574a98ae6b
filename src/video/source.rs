use std::collections::VecDeque;
use std::io::Read;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::{debug, error, info};

use crate::error::{Result, VideoError};
use crate::video::ffmpeg;
use crate::video::types::{ColorMode, Frame, FramePixel, VideoMetadata};

/// Ordered, finite, non-restartable supply of frames
///
/// Dropping a source releases whatever it holds open.
pub trait FrameSource<P: FramePixel> {
    /// Stream metadata, fixed for the lifetime of the source
    fn metadata(&self) -> &VideoMetadata;

    /// Next frame, or `Ok(None)` once the stream is exhausted
    fn next_frame(&mut self) -> Result<Option<Frame<P>>>;

    /// Human readable origin, used in logs and errors
    fn describe(&self) -> String {
        "frame source".to_string()
    }
}

/// Decodes a video file by piping raw frames out of the ffmpeg CLI
pub struct FfmpegSource<P: FramePixel> {
    child: Child,
    stdout: ChildStdout,
    path: PathBuf,
    metadata: VideoMetadata,
    frame_bytes: usize,
    frames_read: u64,
    _pixel: PhantomData<P>,
}

impl<P: FramePixel> FfmpegSource<P> {
    /// Probe and open a video file for decoding
    pub fn open<Q: AsRef<Path>>(path: Q, ffmpeg_bin: &str, ffprobe_bin: &str) -> Result<Self> {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(VideoError::SourceOpenFailed {
                path: path.display().to_string(),
                reason: "file does not exist".to_string(),
            }
            .into());
        }

        let metadata = ffmpeg::probe(ffprobe_bin, path)?;
        let mode = P::COLOR_MODE;

        info!("Spawning ffmpeg decoder for {:?} ({})", path, mode);

        let mut child = decoder_command(ffmpeg_bin, path, mode)
            .spawn()
            .map_err(|e| VideoError::SourceOpenFailed {
                path: path.display().to_string(),
                reason: format!("failed to spawn {}: {}", ffmpeg_bin, e),
            })?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(VideoError::SourceOpenFailed {
                    path: path.display().to_string(),
                    reason: "ffmpeg stdout not available".to_string(),
                }
                .into());
            }
        };

        Ok(Self {
            child,
            stdout,
            path: path.to_path_buf(),
            frame_bytes: metadata.frame_bytes(mode),
            metadata,
            frames_read: 0,
            _pixel: PhantomData,
        })
    }

}

/// Decode to raw frames on stdout at the probed (coded) size
///
/// Auto-rotation is disabled so frames keep the dimensions ffprobe reports.
fn decoder_command(ffmpeg_bin: &str, path: &Path, mode: ColorMode) -> Command {
    let mut cmd = Command::new(ffmpeg_bin);
    cmd.args(["-v", "error", "-noautorotate", "-i"])
        .arg(path)
        .args(["-f", "rawvideo", "-pix_fmt", mode.pix_fmt(), "pipe:1"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    cmd
}

impl<P: FramePixel> FrameSource<P> for FfmpegSource<P> {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn next_frame(&mut self) -> Result<Option<Frame<P>>> {
        let mut buf = vec![0u8; self.frame_bytes];
        let mut read = 0;

        while read < self.frame_bytes {
            match self.stdout.read(&mut buf[read..]) {
                Ok(0) if read == 0 => {
                    debug!("Decoder stream ended after {} frames", self.frames_read);
                    return Ok(None);
                }
                Ok(0) => {
                    error!(
                        "ffmpeg stream ended mid-frame ({}/{} bytes, frame {})",
                        read, self.frame_bytes, self.frames_read
                    );
                    return Err(VideoError::DecodingFailed {
                        reason: format!(
                            "stream ended mid-frame (read {}/{} bytes)",
                            read, self.frame_bytes
                        ),
                    }
                    .into());
                }
                Ok(n) => read += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(VideoError::DecodingFailed {
                        reason: format!("failed to read from ffmpeg pipe: {}", e),
                    }
                    .into());
                }
            }
        }

        let frame = Frame::from_raw(self.metadata.width, self.metadata.height, buf).ok_or_else(|| {
            VideoError::DecodingFailed {
                reason: "raw frame does not match probed dimensions".to_string(),
            }
        })?;
        self.frames_read += 1;

        Ok(Some(frame))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

impl<P: FramePixel> Drop for FfmpegSource<P> {
    fn drop(&mut self) {
        debug!("Closing decoder for {:?} after {} frames", self.path, self.frames_read);
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Source backed by frames already in memory
pub struct MemorySource<P: FramePixel> {
    metadata: VideoMetadata,
    frames: VecDeque<Frame<P>>,
}

impl<P: FramePixel> MemorySource<P> {
    /// Build a source whose declared frame count matches the frames given
    ///
    /// Dimensions come from the first frame; an empty list yields a 0x0 stream.
    pub fn new(fps: f64, frames: Vec<Frame<P>>) -> Self {
        let (width, height) = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        let metadata = VideoMetadata::new(fps, width, height, frames.len() as u64);
        Self {
            metadata,
            frames: frames.into(),
        }
    }

    /// Override the declared frame count, e.g. to model a truncated file
    pub fn with_declared_frames(mut self, total_frames: u64) -> Self {
        self.metadata.total_frames = total_frames;
        self
    }
}

impl<P: FramePixel> FrameSource<P> for MemorySource<P> {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn next_frame(&mut self) -> Result<Option<Frame<P>>> {
        Ok(self.frames.pop_front())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Source whose first frame has already been pulled
///
/// Priming happens before any sink is opened, so an unreadable or empty input
/// never leaves an output file behind.
pub struct PrimedSource<P: FramePixel, S: FrameSource<P>> {
    inner: S,
    first: Option<Frame<P>>,
}

impl<P: FramePixel, S: FrameSource<P>> PrimedSource<P, S> {
    pub fn prime(mut inner: S) -> Result<Self> {
        let first = inner.next_frame()?.ok_or_else(|| VideoError::EmptySource {
            path: inner.describe(),
        })?;

        let expected = (inner.metadata().width, inner.metadata().height);
        if first.dimensions() != expected {
            return Err(VideoError::FrameSizeMismatch {
                expected_width: expected.0,
                expected_height: expected.1,
                actual_width: first.width(),
                actual_height: first.height(),
            }
            .into());
        }

        Ok(Self {
            inner,
            first: Some(first),
        })
    }
}

impl<P: FramePixel, S: FrameSource<P>> FrameSource<P> for PrimedSource<P, S> {
    fn metadata(&self) -> &VideoMetadata {
        self.inner.metadata()
    }

    fn next_frame(&mut self) -> Result<Option<Frame<P>>> {
        match self.first.take() {
            Some(frame) => Ok(Some(frame)),
            None => self.inner.next_frame(),
        }
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SweepError;
    use crate::video::types::GrayFrame;
    use image::Luma;

    fn gray(value: u8) -> GrayFrame {
        GrayFrame::new_filled(4, 3, Luma([value]))
    }

    #[test]
    fn test_memory_source_yields_in_order() {
        let mut source = MemorySource::new(24.0, vec![gray(1), gray(2)]);
        assert_eq!(source.metadata().total_frames, 2);
        assert_eq!(source.metadata().width, 4);

        assert_eq!(source.next_frame().unwrap(), Some(gray(1)));
        assert_eq!(source.next_frame().unwrap(), Some(gray(2)));
        assert_eq!(source.next_frame().unwrap(), None);
    }

    #[test]
    fn test_primed_source_replays_first_frame() {
        let source = MemorySource::new(24.0, vec![gray(7), gray(8)]);
        let mut primed = PrimedSource::prime(source).unwrap();

        assert_eq!(primed.next_frame().unwrap(), Some(gray(7)));
        assert_eq!(primed.next_frame().unwrap(), Some(gray(8)));
        assert_eq!(primed.next_frame().unwrap(), None);
    }

    #[test]
    fn test_priming_empty_source_fails() {
        let source: MemorySource<Luma<u8>> = MemorySource::new(24.0, Vec::new());
        let result = PrimedSource::prime(source);
        assert!(matches!(
            result,
            Err(SweepError::Video(VideoError::EmptySource { .. }))
        ));
    }

    #[test]
    fn test_open_missing_file_fails() {
        let result = FfmpegSource::<Luma<u8>>::open("does/not/exist.mp4", "ffmpeg", "ffprobe");
        assert!(matches!(
            result,
            Err(SweepError::Video(VideoError::SourceOpenFailed { .. }))
        ));
    }

    #[test]
    fn test_decoder_skips_autorotation() {
        let cmd = decoder_command("ffmpeg", Path::new("in.mp4"), ColorMode::Rgb);
        let args: Vec<String> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();

        let noautorotate = args.iter().position(|a| a == "-noautorotate").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(noautorotate < input);
        assert_eq!(args[input + 1], "in.mp4");
        assert!(args.windows(2).any(|w| w[0] == "-pix_fmt" && w[1] == "rgb24"));
    }

    #[cfg(unix)]
    mod with_stub_decoder {
        use super::*;
        use crate::video::stub_tools::{fake_ffmpeg, fake_ffprobe};
        use tempfile::tempdir;

        const PROBE_4X2: &str = r"width=4\nheight=2\nr_frame_rate=10/1\nnb_frames=3\n";

        fn open(decode: &str) -> (tempfile::TempDir, Result<FfmpegSource<Luma<u8>>>) {
            let dir = tempdir().unwrap();
            let ffmpeg = fake_ffmpeg(dir.path(), decode, "exit 1");
            let ffprobe = fake_ffprobe(dir.path(), PROBE_4X2);
            let input = dir.path().join("in.mp4");
            std::fs::write(&input, b"not really a video").unwrap();
            let source = FfmpegSource::open(&input, &ffmpeg, &ffprobe);
            (dir, source)
        }

        #[test]
        fn test_reads_whole_frames_from_pipe() {
            let (_dir, source) = open("printf 'AAAAAAAABBBBBBBBCCCCCCCC'");
            let mut source = source.unwrap();
            assert_eq!(*source.metadata(), VideoMetadata::new(10.0, 4, 2, 3));

            for value in [b'A', b'B', b'C'] {
                let frame = source.next_frame().unwrap().unwrap();
                assert_eq!(frame.dimensions(), (4, 2));
                assert!(frame.samples().iter().all(|&v| v == value));
            }
            assert_eq!(source.next_frame().unwrap(), None);
        }

        #[test]
        fn test_stream_ending_mid_frame_is_an_error() {
            let (_dir, source) = open("printf 'AAAAAAAABBBB'");
            let mut source = source.unwrap();

            assert!(source.next_frame().unwrap().is_some());
            assert!(matches!(
                source.next_frame(),
                Err(SweepError::Video(VideoError::DecodingFailed { .. }))
            ));
        }

        #[test]
        fn test_failing_ffprobe_fails_open() {
            let dir = tempdir().unwrap();
            let ffmpeg = fake_ffmpeg(dir.path(), "exit 0", "exit 1");
            let ffprobe = crate::video::stub_tools::write_script(
                dir.path(),
                "ffprobe",
                "echo 'Invalid data found when processing input' >&2; exit 1",
            );
            let input = dir.path().join("in.mp4");
            std::fs::write(&input, b"garbage").unwrap();

            match FfmpegSource::<Luma<u8>>::open(&input, &ffmpeg, &ffprobe) {
                Err(SweepError::Video(VideoError::SourceOpenFailed { reason, .. })) => {
                    assert!(reason.contains("Invalid data"), "reason: {}", reason);
                }
                Err(other) => panic!("unexpected error: {}", other),
                Ok(_) => panic!("source opened"),
            }
        }
    }
}
