//! Caller input errors.

/// Input conditions that are rejected before any work starts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum InputErrorKind {
    /// The idiom was empty or whitespace
    #[display("Idiom must not be empty")]
    EmptyIdiom,
    /// The idiom cannot be used as a catalog key or filename component
    #[display("Invalid idiom '{}': {}", idiom, reason)]
    InvalidIdiom {
        /// The rejected idiom
        idiom: String,
        /// Why it was rejected
        reason: String,
    },
    /// Narration text was empty
    #[display("Narration text must not be empty")]
    EmptyText,
    /// An operation that needs images received none
    #[display("At least one image is required")]
    NoImages,
    /// No transition strategy is registered under this name
    #[display("Unknown transition '{}'", _0)]
    UnknownTransition(String),
    /// No composer is registered under this name
    #[display("Unknown composer '{}'", _0)]
    UnknownComposer(String),
}

/// Input error with location tracking.
///
/// # Examples
///
/// ```
/// use parable_error::{InputError, InputErrorKind};
///
/// let err = InputError::new(InputErrorKind::UnknownTransition("spin".into()));
/// assert!(format!("{}", err).contains("spin"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Input Error: {} at line {} in {}", kind, line, file)]
pub struct InputError {
    /// The kind of error that occurred
    pub kind: InputErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl InputError {
    /// Create a new input error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: InputErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
