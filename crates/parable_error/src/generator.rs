//! External generator errors.

use std::time::Duration;

/// Failure conditions of an external collaborator call.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum GeneratorErrorKind {
    /// The generator ran and reported a failure
    #[display("{} failed: {}", generator, message)]
    Failed {
        /// Name of the generator or tier
        generator: String,
        /// Failure description
        message: String,
    },
    /// The call did not finish within its deadline
    #[display("Timed out after {:?}", _0)]
    Timeout(Duration),
    /// The call was cancelled by the caller
    #[display("Cancelled")]
    Cancelled,
    /// The generator is not reachable or not installed
    #[display("Generator unavailable: {}", _0)]
    Unavailable(String),
    /// Every attempt for a stage failed
    #[display("All attempts failed for stage '{}'", _0)]
    Exhausted(String),
}

/// External generator error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Generator Error: {} at line {} in {}", kind, line, file)]
pub struct GeneratorError {
    /// The kind of error that occurred
    pub kind: GeneratorErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GeneratorError {
    /// Create a new generator error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GeneratorErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for [`GeneratorErrorKind::Failed`].
    #[track_caller]
    pub fn failed(generator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(GeneratorErrorKind::Failed {
            generator: generator.into(),
            message: message.into(),
        })
    }
}
