//! Video assembly and synchronization errors.

/// Video failure conditions.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum SyncErrorKind {
    /// Every input image was unusable
    #[display("No usable images among {} inputs", _0)]
    InsufficientInput(usize),
    /// Reconciled video duration is outside tolerance of the audio duration
    #[display(
        "Video duration {:.3}s cannot be reconciled with audio duration {:.3}s (tolerance {:.3}s)",
        video_seconds,
        audio_seconds,
        tolerance_seconds
    )]
    ToleranceViolation {
        /// Duration of the reconciled video track
        video_seconds: f64,
        /// Duration of the audio track
        audio_seconds: f64,
        /// Allowed difference
        tolerance_seconds: f64,
    },
    /// Intermediate frame preparation failed
    #[display("Failed to prepare frames: {}", _0)]
    FramePreparation(String),
    /// The encoder failed to produce output
    #[display("Failed to encode video: {}", _0)]
    Encode(String),
}

/// Synchronization error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Sync Error: {} at line {} in {}", kind, line, file)]
pub struct SyncError {
    /// The kind of error that occurred
    pub kind: SyncErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl SyncError {
    /// Create a new sync error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: SyncErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
