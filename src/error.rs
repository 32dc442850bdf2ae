use thiserror::Error;

/// Main error type for the clearmark library
#[derive(Error, Debug)]
pub enum CleanerError {
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Staging error: {0}")]
    Staging(#[from] StagingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Stream probing errors (ffprobe)
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to run ffprobe: {reason}")]
    CommandFailed { reason: String },

    #[error("ffprobe exited with status {status}: {stderr}")]
    ProbeFailed { status: i32, stderr: String },

    #[error("no video stream found in: {path}")]
    NoVideoStream { path: String },

    #[error("unreadable stream metadata for {path}: {detail}")]
    InvalidMetadata { path: String, detail: String },
}

/// Frame staging / decode errors
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("failed to run ffmpeg: {reason}")]
    CommandFailed { reason: String },

    #[error("ffmpeg decode failed for {path}: {stderr}")]
    DecodeFailed { path: String, stderr: String },

    #[error("raw video stream truncated: {trailing} trailing bytes after {frames} frames")]
    TruncatedStream { frames: usize, trailing: usize },

    #[error("failed to load staged frame {path}: {reason}")]
    FrameLoadFailed { path: String, reason: String },

    #[error("{count} staged frames exceed the {cap}-frame cap of {pad}-digit numbering")]
    FrameIndexOverflow { count: usize, cap: usize, pad: usize },

    #[error("no frames decoded from: {path}")]
    EmptyStream { path: String },
}

/// Inpainting capability errors
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("model checkpoint not found: {path}")]
    CheckpointMissing { path: String },

    #[error("inference runner '{runner}' failed with status {status}: {stderr}")]
    RunnerFailed {
        runner: String,
        status: i32,
        stderr: String,
    },

    #[error("failed to launch inference runner '{runner}': {reason}")]
    RunnerUnavailable { runner: String, reason: String },

    #[error("frame exchange failed: {reason}")]
    ExchangeFailed { reason: String },

    #[error("inference returned {actual} frames for a {expected}-frame window")]
    FrameCountMismatch { expected: usize, actual: usize },
}

/// Reassembly errors
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("failed to run ffmpeg: {reason}")]
    CommandFailed { reason: String },

    #[error("ffmpeg encode failed: {stderr}")]
    EncoderFailed { stderr: String },

    #[error("frame {index} is {actual_width}x{actual_height}, expected {width}x{height}")]
    DimensionMismatch {
        index: usize,
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("no frames to encode")]
    NoFrames,
}

/// Staging workspace errors
#[derive(Error, Debug)]
pub enum StagingError {
    #[error("failed to create workspace {path}: {reason}")]
    CreateFailed { path: String, reason: String },

    #[error("failed to clean workspace {path}: {reason}")]
    CleanupFailed { path: String, reason: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using CleanerError
pub type Result<T> = std::result::Result<T, CleanerError>;

impl CleanerError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Probe(ProbeError::NoVideoStream { path }) => {
                format!("'{}' does not contain a video stream.", path)
            }
            Self::Probe(ProbeError::CommandFailed { .. })
            | Self::Decode(DecodeError::CommandFailed { .. })
            | Self::Encode(EncodeError::CommandFailed { .. }) => {
                "FFmpeg tools not found. Please install ffmpeg and ffprobe.".to_string()
            }
            Self::Inference(InferenceError::CheckpointMissing { path }) => {
                format!(
                    "Model checkpoint '{}' not found. Check the [inpaint] checkpoint setting.",
                    path
                )
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
