use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the capture and compose pipeline.
///
/// Frame source and output failures are caught at the booth boundary and
/// turned into user notifications; none of them terminate the process.
#[derive(Debug, Error)]
pub enum BoothError {
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("capture interrupted: {0}")]
    CaptureInterrupted(String),

    #[error("a capture session is already in progress")]
    AlreadyInProgress,

    #[error("not enough frames to build a strip: expected {expected}, got {actual}")]
    InsufficientFrames { expected: usize, actual: usize },

    #[error("composition failed: {0}")]
    CompositionFailed(String),

    #[error("failed to write {path}: {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("print failed: {0}")]
    PrintFailure(String),
}

impl BoothError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BoothError::IoFailure {
            path: path.into(),
            source,
        }
    }

    /// Short sentence shown to the user above the error details.
    pub fn user_message(&self) -> &'static str {
        match self {
            BoothError::DeviceUnavailable(_) => "Unable to open the selected camera.",
            BoothError::CaptureInterrupted(_) => "Capture failed.",
            BoothError::AlreadyInProgress => "A photo session is already running.",
            BoothError::InsufficientFrames { .. } | BoothError::CompositionFailed(_) => {
                "Unable to build the photo strip."
            }
            BoothError::IoFailure { .. } => "Unable to access the save folder.",
            BoothError::PrintFailure(_) => "Print could not be completed.",
        }
    }
}

pub type BoothResult<T> = std::result::Result<T, BoothError>;
