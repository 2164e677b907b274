//! Narration synthesis errors.

/// Audio failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum AudioErrorKind {
    /// No segment artifact could be decoded and merged
    #[display("None of the {} segments could be merged", _0)]
    NoMergeableSegments(usize),
    /// An artifact could not be decoded
    #[display("Failed to decode audio: {}", _0)]
    Decode(String),
    /// The merged track could not be encoded
    #[display("Failed to encode audio: {}", _0)]
    Encode(String),
}

/// Audio error with location tracking.
///
/// # Examples
///
/// ```
/// use parable_error::{AudioError, AudioErrorKind};
///
/// let err = AudioError::new(AudioErrorKind::NoMergeableSegments(3));
/// assert!(format!("{}", err).contains("3 segments"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Audio Error: {} at line {} in {}", kind, line, file)]
pub struct AudioError {
    /// The kind of error that occurred
    pub kind: AudioErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl AudioError {
    /// Create a new audio error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: AudioErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
