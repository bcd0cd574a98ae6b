//! Shell stand-ins for `ffmpeg` and `ffprobe`, so collaborator code can be
//! exercised without the real tools installed.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::config::EncoderConfig;

/// `ffmpeg -encoders` output listing both default encoders
const ENCODER_LISTING: &str =
    r"Encoders:\n V..... = Video\n ------\n V....D mpeg4 MPEG-4 part 2\n V....D libxvid Xvid\n";

/// Write an executable `sh` script into `dir` and return its path
pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.display().to_string()
}

/// An `ffmpeg` that answers `-version` and `-encoders`, runs `decode` when
/// asked to write raw frames to stdout and `encode` otherwise
///
/// Both bodies see the last command line argument (the output path) as
/// `$last`.
pub(crate) fn fake_ffmpeg(dir: &Path, decode: &str, encode: &str) -> String {
    let body = format!(
        r#"case "$*" in
  *-version*) echo "ffmpeg stub"; exit 0 ;;
  *-encoders*) printf '{listing}'; exit 0 ;;
esac
for last; do :; done
case "$*" in
  *pipe:1*) {decode} ;;
  *) {encode} ;;
esac"#,
        listing = ENCODER_LISTING,
        decode = decode,
        encode = encode,
    );
    write_script(dir, "ffmpeg", &body)
}

/// An `ffprobe` that prints the given `key=value` lines
pub(crate) fn fake_ffprobe(dir: &Path, fields: &str) -> String {
    write_script(dir, "ffprobe", &format!("printf '{}'", fields))
}

/// Encoder settings pointing at stub tools
pub(crate) fn stub_settings(ffmpeg: String, ffprobe: String) -> EncoderConfig {
    EncoderConfig {
        ffmpeg,
        ffprobe,
        ..EncoderConfig::default()
    }
}
