use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the audio-to-video pipeline.
///
/// Each variant carries the offending path or value so a failed run can be
/// diagnosed from the message alone.
#[derive(Debug, Error)]
pub enum KittError {
    /// The audio file is missing, corrupt, or could not be decoded.
    #[error("Unreadable audio file {path}: {reason}")]
    UnreadableAudio { path: PathBuf, reason: String },

    /// No threshold table is registered for the requested frame rate.
    #[error("Unsupported frame rate {fps} fps (supported: {supported:?})")]
    UnsupportedFrameRate { fps: u32, supported: Vec<u32> },

    /// A threshold table failed validation.
    #[error("Invalid threshold table for {fps} fps: {reason}")]
    InvalidThresholds { fps: u32, reason: String },

    /// The background image is unusable or a frame could not be encoded.
    #[error("Render error: {0}")]
    RenderError(String),

    /// The external merge step failed or produced no output.
    #[error("Mux error: {0}")]
    MuxError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KittError {
    pub fn unreadable_audio(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::UnreadableAudio {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KittError>;
