//! Configuration error types.

use std::fmt;

/// Configuration error, optionally naming the offending key.
///
/// Keys use the dotted form of `parable.toml` (`generators.story_endpoint`),
/// which maps to `PARABLE__GENERATORS__STORY_ENDPOINT` in the environment.
#[derive(Debug, Clone, derive_more::Error)]
pub struct ConfigError {
    /// Error message
    pub message: String,
    /// Dotted configuration key, when one is at fault
    pub key: Option<String>,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Create a new ConfigError with the given message at the current location.
    ///
    /// # Examples
    ///
    /// ```
    /// use parable_error::ConfigError;
    ///
    /// let err = ConfigError::new("Failed to parse parable.toml");
    /// assert!(err.message.contains("parable.toml"));
    /// assert!(err.key.is_none());
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            key: None,
            line: location.line(),
            file: location.file(),
        }
    }

    /// A required key has no value.
    ///
    /// # Examples
    ///
    /// ```
    /// use parable_error::ConfigError;
    ///
    /// let err = ConfigError::missing("generators.image_endpoint");
    /// assert_eq!(err.key.as_deref(), Some("generators.image_endpoint"));
    /// assert!(err.to_string().contains("PARABLE__GENERATORS__IMAGE_ENDPOINT"));
    /// ```
    #[track_caller]
    pub fn missing(key: impl Into<String>) -> Self {
        let key = key.into();
        let mut err = Self::new(format!("{} is not set", key));
        err.key = Some(key);
        err
    }

    /// Environment variable that overrides `key`.
    pub fn env_var(&self) -> Option<String> {
        self.key
            .as_ref()
            .map(|k| format!("PARABLE__{}", k.replace('.', "__").to_uppercase()))
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration Error: {}", self.message)?;
        if let Some(var) = self.env_var() {
            write!(f, " (set it in parable.toml or {})", var)?;
        }
        write!(f, " at line {} in {}", self.line, self.file)
    }
}
