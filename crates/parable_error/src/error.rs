//! Top-level error wrapper types.

#[cfg(feature = "database")]
use crate::DatabaseError;
use crate::{
    AudioError, CacheError, ConfigError, GeneratorError, GeneratorErrorKind, HttpError,
    InputError, StorageError, SyncError,
};

/// Every error family a Parable operation can surface.
///
/// # Examples
///
/// ```
/// use parable_error::{ParableError, StorageError, StorageErrorKind};
///
/// let err: ParableError = StorageError::new(StorageErrorKind::NotFound("x.jpg".into())).into();
/// assert!(format!("{}", err).contains("Storage Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum ParableErrorKind {
    /// Invalid caller input
    #[from(InputError)]
    Input(InputError),
    /// External generator (LLM, diffusion, TTS) failure
    #[from(GeneratorError)]
    Generator(GeneratorError),
    /// Filesystem storage failure
    #[from(StorageError)]
    Storage(StorageError),
    /// Catalog database failure
    #[cfg(feature = "database")]
    #[from(DatabaseError)]
    Database(DatabaseError),
    /// Artifact cache failure
    #[from(CacheError)]
    Cache(CacheError),
    /// Narration synthesis failure
    #[from(AudioError)]
    Audio(AudioError),
    /// Video assembly or synchronization failure
    #[from(SyncError)]
    Sync(SyncError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// HTTP transport error
    #[from(HttpError)]
    Http(HttpError),
}

/// Parable error with kind discrimination.
///
/// # Examples
///
/// ```
/// use parable_error::{ConfigError, ParableResult};
///
/// fn might_fail() -> ParableResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Parable Error: {}", _0)]
pub struct ParableError(Box<ParableErrorKind>);

impl ParableError {
    /// Create a new error from a kind.
    pub fn new(kind: ParableErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ParableErrorKind {
        &self.0
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Only transient generator faults qualify; input, storage and
    /// synchronization errors are deterministic.
    pub fn is_retryable(&self) -> bool {
        match self.kind() {
            ParableErrorKind::Generator(e) => matches!(
                e.kind,
                GeneratorErrorKind::Timeout(_) | GeneratorErrorKind::Unavailable(_)
            ),
            ParableErrorKind::Http(_) => true,
            _ => false,
        }
    }
}

// Generic From implementation for any type that converts to ParableErrorKind
impl<T> From<T> for ParableError
where
    T: Into<ParableErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Parable operations.
pub type ParableResult<T> = std::result::Result<T, ParableError>;
