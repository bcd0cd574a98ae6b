use thiserror::Error;

/// Main error type for the frame-sweep library
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Video I/O error: {0}")]
    Video(#[from] VideoError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Errors raised by frame sources and frame sinks
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Failed to open video source {path}: {reason}")]
    SourceOpenFailed { path: String, reason: String },

    #[error("Video source produced no frames: {path}")]
    EmptySource { path: String },

    #[error("No usable encoder after trying: {}", .attempts.join(", "))]
    SinkOpenFailed { attempts: Vec<String> },

    #[error("Stream ended after {delivered} of {expected} declared frames")]
    PrematureEndOfStream { expected: u64, delivered: u64 },

    #[error("Video decoding failed: {reason}")]
    DecodingFailed { reason: String },

    #[error("Video encoding failed: {reason}")]
    EncodingFailed { reason: String },

    #[error("Frame is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    FrameSizeMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Invalid video parameters: {details}")]
    InvalidParameters { details: String },
}

/// Errors raised while transforming a frame
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Invalid transform parameters: {details}")]
    InvalidParameters { details: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using SweepError
pub type Result<T> = std::result::Result<T, SweepError>;

impl SweepError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Video(VideoError::SourceOpenFailed { path, .. }) => {
                format!(
                    "Could not open video '{}'. Please check the file exists and that \
                     ffmpeg/ffprobe are installed.",
                    path
                )
            }
            Self::Video(VideoError::EmptySource { path }) => {
                format!("Video '{}' contains no decodable frames; nothing was written.", path)
            }
            Self::Video(VideoError::SinkOpenFailed { attempts }) => {
                format!(
                    "Could not initialize an output writer with any available codec ({}).",
                    attempts.join(", ")
                )
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_open_failure_lists_attempts() {
        let err: SweepError = VideoError::SinkOpenFailed {
            attempts: vec!["mp4/mpeg4".to_string(), "avi/libxvid".to_string()],
        }
        .into();

        assert!(err.to_string().contains("mp4/mpeg4, avi/libxvid"));
        assert!(err.user_message().contains("avi/libxvid"));
    }

    #[test]
    fn test_source_open_failure_names_path() {
        let err: SweepError = VideoError::SourceOpenFailed {
            path: "missing.mp4".to_string(),
            reason: "ffprobe failed".to_string(),
        }
        .into();

        let message = err.user_message();
        assert!(message.contains("missing.mp4"));
        assert!(message.contains("ffmpeg/ffprobe"));
    }
}
