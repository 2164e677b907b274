//! Artifact cache errors.

/// Cache failure conditions. None of these reach a pipeline caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum CacheErrorKind {
    /// Failed to create the cache directory
    #[display("Failed to create cache directory: {}", _0)]
    DirectoryCreation(String),
    /// Failed to write an entry
    #[display("Failed to write cache entry: {}", _0)]
    Write(String),
    /// Failed to remove entries
    #[display("Failed to clear cache entries: {}", _0)]
    Clear(String),
    /// Payload could not be serialized
    #[display("Failed to serialize cache payload: {}", _0)]
    Serialization(String),
}

/// Cache error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Cache Error: {} at line {} in {}", kind, line, file)]
pub struct CacheError {
    /// The kind of error that occurred
    pub kind: CacheErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl CacheError {
    /// Create a new cache error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: CacheErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
