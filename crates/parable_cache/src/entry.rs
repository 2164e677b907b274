//! On-disk entry format.

use crate::CacheKey;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A cached payload together with when it was written.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct CacheEntry {
    stage: String,
    digest: String,
    written_at: DateTime<Utc>,
    payload: Vec<u8>,
}

impl CacheEntry {
    /// Consume the entry, returning the payload.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

/// JSON envelope stored in each `.entry` file.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Envelope {
    key: String,
    stage: String,
    written_at: DateTime<Utc>,
    checksum: String,
    payload: String,
}

impl Envelope {
    pub(crate) fn seal(key: &CacheKey, payload: &[u8]) -> Self {
        Self {
            key: key.digest().to_string(),
            stage: key.stage().to_string(),
            written_at: Utc::now(),
            checksum: checksum(payload),
            payload: STANDARD.encode(payload),
        }
    }

    /// Validate the envelope against the key it was looked up under.
    ///
    /// Returns a description of the corruption on failure.
    pub(crate) fn open(self, key: &CacheKey) -> Result<CacheEntry, String> {
        if self.key != key.digest() {
            return Err(format!("entry belongs to key {}", self.key));
        }

        let payload = STANDARD
            .decode(self.payload.as_bytes())
            .map_err(|e| format!("payload is not valid base64: {}", e))?;

        if checksum(&payload) != self.checksum {
            return Err("payload checksum mismatch".to_string());
        }

        Ok(CacheEntry {
            stage: self.stage,
            digest: self.key,
            written_at: self.written_at,
            payload,
        })
    }
}

fn checksum(payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    format!("{:x}", hasher.finalize())
}
