//! Thin wrappers around the `ffmpeg` and `ffprobe` command line tools.

use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, error, info, warn};

use crate::error::{Result, VideoError};
use crate::video::types::VideoMetadata;

/// Stream fields requested from ffprobe; rotation comes from side data on
/// current builds and from the `rotate` tag on older ones
const PROBE_ENTRIES: &str = "stream=width,height,r_frame_rate,avg_frame_rate,nb_frames,duration:\
                             stream_tags=rotate:stream_side_data=rotation";

/// Check that a binary can be launched and exits cleanly on `-version`
pub fn is_available(binary: &str) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Check whether `ffmpeg -encoders` lists the given encoder
pub fn encoder_available(ffmpeg: &str, codec: &str) -> bool {
    let output = match Command::new(ffmpeg)
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
    {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            warn!("{} -encoders exited with {}", ffmpeg, output.status);
            return false;
        }
        Err(e) => {
            warn!("Could not run {}: {}", ffmpeg, e);
            return false;
        }
    };

    encoder_listed(&String::from_utf8_lossy(&output.stdout), codec)
}

/// Scan `ffmpeg -encoders` output for a video encoder name.
///
/// Entries look like ` V....D mpeg4    MPEG-4 part 2`; the header block above
/// the `------` separator is skipped.
fn encoder_listed(listing: &str, codec: &str) -> bool {
    listing
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("---"))
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let flags = fields.next()?;
            let name = fields.next()?;
            Some((flags, name))
        })
        .any(|(flags, name)| flags.starts_with('V') && name == codec)
}

/// Read stream metadata of the first video stream with ffprobe
pub fn probe(ffprobe: &str, path: &Path) -> Result<VideoMetadata> {
    info!("Probing video metadata: {:?}", path);

    #[rustfmt::skip]
    let args = [
        "-v", "error",
        "-select_streams", "v:0",
        "-show_entries", PROBE_ENTRIES,
        "-of", "default=noprint_wrappers=1",
    ];
    let output = Command::new(ffprobe)
        .args(args)
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| VideoError::SourceOpenFailed {
            path: path.display().to_string(),
            reason: format!("failed to run {}: {}", ffprobe, e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!("ffprobe failed for {:?}: {}", path, stderr.trim());
        return Err(VideoError::SourceOpenFailed {
            path: path.display().to_string(),
            reason: stderr.trim().to_string(),
        }
        .into());
    }

    let metadata = parse_probe_output(&String::from_utf8_lossy(&output.stdout)).map_err(|reason| {
        VideoError::SourceOpenFailed {
            path: path.display().to_string(),
            reason,
        }
    })?;

    info!(
        "Video metadata: {}x{} @ {:.2} fps, {} frames ({})",
        metadata.width,
        metadata.height,
        metadata.fps,
        metadata.total_frames,
        metadata
            .duration()
            .map(|seconds| format!("{:.2}s", seconds))
            .unwrap_or_else(|| "duration unknown".to_string())
    );
    Ok(metadata)
}

/// Parse `key=value` lines produced by ffprobe's default writer
fn parse_probe_output(stdout: &str) -> std::result::Result<VideoMetadata, String> {
    let fields: HashMap<&str, &str> = stdout
        .lines()
        .filter_map(|line| line.trim().split_once('='))
        .collect();

    if fields.is_empty() {
        return Err("no video stream found".to_string());
    }

    let dimension = |key: &str| -> std::result::Result<u32, String> {
        fields
            .get(key)
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|&v| v > 0)
            .ok_or_else(|| format!("missing or invalid {}", key))
    };
    let width = dimension("width")?;
    let height = dimension("height")?;

    let fps = fields
        .get("r_frame_rate")
        .and_then(|v| parse_frame_rate(v))
        .or_else(|| fields.get("avg_frame_rate").and_then(|v| parse_frame_rate(v)))
        .unwrap_or(0.0);

    let total_frames = match fields.get("nb_frames").and_then(|v| v.parse::<u64>().ok()) {
        Some(count) => count,
        None => {
            let duration = fields.get("duration").and_then(|v| v.parse::<f64>().ok());
            match duration {
                Some(duration) if fps > 0.0 && duration > 0.0 => {
                    let estimate = (duration * fps).round() as u64;
                    debug!("nb_frames unavailable, estimated {} frames from duration", estimate);
                    estimate
                }
                _ => {
                    warn!("Frame count unknown; progress will stay at 0");
                    0
                }
            }
        }
    };

    // Frames are decoded with -noautorotate, so the coded size is what arrives
    if let Some(degrees) = display_rotation(&fields) {
        info!(
            "Stream carries a {}° display rotation; frames are processed as stored ({}x{})",
            degrees, width, height
        );
    }

    Ok(VideoMetadata::new(fps, width, height, total_frames))
}

/// Non-zero display rotation from side data or the legacy `rotate` tag
fn display_rotation(fields: &HashMap<&str, &str>) -> Option<i64> {
    ["rotation", "TAG:rotate"]
        .iter()
        .filter_map(|key| fields.get(key))
        .filter_map(|value| value.trim().parse::<f64>().ok())
        .map(|degrees| degrees.round() as i64)
        .find(|&degrees| degrees % 360 != 0)
}

/// Parse `30000/1001` or `25` style frame rates
fn parse_frame_rate(value: &str) -> Option<f64> {
    let fps = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den > 0.0 { num / den } else { 0.0 }
        }
        None => value.trim().parse().ok()?,
    };
    (fps > 0.0).then_some(fps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output_with_frame_count() {
        let stdout = "width=640\nheight=480\nr_frame_rate=30/1\navg_frame_rate=30/1\nduration=5.000000\nnb_frames=150\n";
        let metadata = parse_probe_output(stdout).unwrap();
        assert_eq!(metadata, VideoMetadata::new(30.0, 640, 480, 150));
    }

    #[test]
    fn test_parse_probe_output_estimates_missing_count() {
        let stdout = "width=320\nheight=240\nr_frame_rate=25/1\navg_frame_rate=25/1\nduration=2.000000\nnb_frames=N/A\n";
        let metadata = parse_probe_output(stdout).unwrap();
        assert_eq!(metadata.total_frames, 50);
        assert_eq!(metadata.fps, 25.0);
    }

    #[test]
    fn test_parse_probe_output_rejects_empty() {
        assert!(parse_probe_output("").is_err());
        assert!(parse_probe_output("width=0\nheight=480\n").is_err());
    }

    #[test]
    fn test_rotated_stream_keeps_coded_size() {
        let stdout = "width=1920\nheight=1080\nr_frame_rate=30/1\nnb_frames=90\nrotation=-90\n";
        let metadata = parse_probe_output(stdout).unwrap();
        assert_eq!((metadata.width, metadata.height), (1920, 1080));
        assert_eq!(metadata.total_frames, 90);

        let legacy = "width=1280\nheight=720\nr_frame_rate=25/1\nnb_frames=10\nTAG:rotate=90\n";
        let metadata = parse_probe_output(legacy).unwrap();
        assert_eq!((metadata.width, metadata.height), (1280, 720));
    }

    #[test]
    fn test_display_rotation() {
        let fields: HashMap<&str, &str> = [("rotation", "-90")].into_iter().collect();
        assert_eq!(display_rotation(&fields), Some(-90));

        let fields: HashMap<&str, &str> = [("TAG:rotate", "180")].into_iter().collect();
        assert_eq!(display_rotation(&fields), Some(180));

        let fields: HashMap<&str, &str> = [("rotation", "0")].into_iter().collect();
        assert_eq!(display_rotation(&fields), None);
        assert_eq!(display_rotation(&HashMap::new()), None);
    }

    #[test]
    fn test_parse_frame_rate() {
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("24"), Some(24.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("N/A"), None);
    }

    #[test]
    fn test_encoder_listed() {
        let listing = "Encoders:\n V..... = Video\n A..... = Audio\n ------\n V....D mpeg4                MPEG-4 part 2\n V....D libxvid              libxvidcore MPEG-4 part 2 (codec mpeg4)\n A....D aac                  AAC (Advanced Audio Coding)\n";
        assert!(encoder_listed(listing, "mpeg4"));
        assert!(encoder_listed(listing, "libxvid"));
        assert!(!encoder_listed(listing, "aac"));
        assert!(!encoder_listed(listing, "libx264"));
    }
}
