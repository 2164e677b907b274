//! Idiom validation.
//!
//! The idiom is the catalog's external key and a component of every durable
//! filename, so it is checked once at the edge before any work starts.

use parable_error::{InputError, InputErrorKind};

/// Validate an idiom and return it trimmed.
///
/// # Errors
///
/// Returns [`InputErrorKind::EmptyIdiom`] for empty or whitespace-only input and
/// [`InputErrorKind::InvalidIdiom`] when the idiom could escape its directory.
///
/// # Examples
///
/// ```
/// use parable_core::validate_idiom;
///
/// assert_eq!(validate_idiom("  守株待兔 ").unwrap(), "守株待兔");
/// assert!(validate_idiom("../etc").is_err());
/// ```
pub fn validate_idiom(idiom: &str) -> Result<String, InputError> {
    let trimmed = idiom.trim();
    if trimmed.is_empty() {
        return Err(InputError::new(InputErrorKind::EmptyIdiom));
    }

    let reason = if trimmed.contains(['/', '\\']) {
        Some("contains a path separator")
    } else if trimmed.contains("..") {
        Some("contains '..'")
    } else if trimmed.contains('\0') {
        Some("contains a NUL byte")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(InputError::new(InputErrorKind::InvalidIdiom {
            idiom: trimmed.to_string(),
            reason: reason.to_string(),
        })),
        None => Ok(trimmed.to_string()),
    }
}
