//! Content-addressed cache keys.

use sha2::{Digest, Sha256};
use std::fmt;

/// Key of one cached stage artifact.
///
/// The digest is SHA-256 over `stage || 0x00 || content`, so the same input
/// fed to two different stages never collides.
///
/// # Examples
///
/// ```
/// use parable_cache::CacheKey;
///
/// let a = CacheKey::new("story", "守株待兔");
/// let b = CacheKey::new("story", "守株待兔");
/// let c = CacheKey::new("images", "守株待兔");
///
/// assert_eq!(a, b);
/// assert_ne!(a.digest(), c.digest());
/// assert_eq!(a.digest().len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    stage: String,
    digest: String,
}

impl CacheKey {
    /// Derive the key for `content` processed by `stage`.
    pub fn new(stage: &str, content: impl AsRef<[u8]>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(stage.as_bytes());
        hasher.update([0u8]);
        hasher.update(content.as_ref());

        Self {
            stage: normalize_stage(stage),
            digest: format!("{:x}", hasher.finalize()),
        }
    }

    /// Stage name, normalized for use as a directory name.
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Hex-encoded SHA-256 digest.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.stage, &self.digest[..12])
    }
}

/// Replace anything outside `[A-Za-z0-9_-]` so a stage is a safe directory name.
pub(crate) fn normalize_stage(stage: &str) -> String {
    let normalized: String = stage
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if normalized.is_empty() {
        "_".to_string()
    } else {
        normalized
    }
}
