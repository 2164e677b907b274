//! Durable media files under the storage root.
//!
//! Layout:
//!
//! ```text
//! {root}/
//! ├── images/{idiom}_{NN}.jpg
//! ├── audio/{idiom}_01.mp3
//! └── videos/{idiom}_story.mp4
//! ```
//!
//! Every write lands in a uniquely named temporary file next to its target and
//! its size is checked there. The catalog renames a [`StagedFile`] over the
//! durable name only after the matching row has been committed, so a failed
//! transaction never changes the file behind a row that is already stored.

use image::codecs::jpeg::JpegEncoder;
use parable_core::MediaType;
use parable_error::{StorageError, StorageErrorKind};
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use uuid::Uuid;

/// JPEG quality used when re-encoding scene images.
pub const JPEG_QUALITY: u8 = 95;

/// Directory layout of durable media.
#[derive(Debug, Clone)]
pub struct MediaLayout {
    root: PathBuf,
}

impl MediaLayout {
    /// Layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Durable path of an artifact. `index` is 1-based and only used for images.
    pub fn path_for(&self, media_type: MediaType, idiom: &str, index: usize) -> PathBuf {
        self.root
            .join(media_type.directory())
            .join(media_type.file_name(idiom, index))
    }

    /// Create the per-media-type directories.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::DirectoryCreation`] on failure.
    pub async fn ensure(&self) -> Result<(), StorageError> {
        for media_type in MediaType::iter() {
            let dir = self.root.join(media_type.directory());
            tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    dir.display(),
                    e
                )))
            })?;
        }
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4()))
}

async fn rename_into_place(temp_path: &Path, path: &Path) -> Result<(), StorageError> {
    if let Err(e) = tokio::fs::rename(temp_path, path).await {
        let _ = tokio::fs::remove_file(temp_path).await;
        return Err(StorageError::new(StorageErrorKind::FileWrite(format!(
            "rename {} to {}: {}",
            temp_path.display(),
            path.display(),
            e
        ))));
    }
    Ok(())
}

/// A file written next to its target but not yet visible under the target name.
///
/// Dropping it without calling [`StagedFile::commit`] deletes the staged copy
/// and leaves whatever is at the target untouched.
#[derive(Debug)]
pub struct StagedFile {
    temp_path: PathBuf,
    target: PathBuf,
    size: u64,
    committed: bool,
}

impl StagedFile {
    /// Stage `data` for `target`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the write or the size check fails.
    pub async fn write(target: &Path, data: &[u8]) -> Result<Self, StorageError> {
        let staged = Self::new(target, data.len() as u64);
        tokio::fs::write(&staged.temp_path, data).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                staged.temp_path.display(),
                e
            )))
        })?;
        verify_size(&staged.temp_path, staged.size).await?;
        Ok(staged)
    }

    /// Stage a copy of `source` for `target`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::NotFound`] if `source` does not exist, and a
    /// write or size error otherwise.
    pub async fn copy(source: &Path, target: &Path) -> Result<Self, StorageError> {
        let source_len = match tokio::fs::metadata(source).await {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::new(StorageErrorKind::NotFound(
                    source.display().to_string(),
                )));
            }
            Err(e) => {
                return Err(StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    source.display(),
                    e
                ))));
            }
        };

        let staged = Self::new(target, source_len);
        tokio::fs::copy(source, &staged.temp_path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "copy {} to {}: {}",
                source.display(),
                staged.temp_path.display(),
                e
            )))
        })?;
        verify_size(&staged.temp_path, staged.size).await?;
        Ok(staged)
    }

    fn new(target: &Path, size: u64) -> Self {
        Self {
            temp_path: temp_path_for(target),
            target: target.to_path_buf(),
            size,
            committed: false,
        }
    }

    /// Durable path the file is renamed to on commit.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Bytes staged.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Rename the staged file over its target.
    ///
    /// Returns the number of bytes now at the target.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::FileWrite`] if the rename fails; the staged
    /// copy is removed in that case.
    pub async fn commit(mut self) -> Result<u64, StorageError> {
        self.committed = true;
        rename_into_place(&self.temp_path, &self.target).await?;
        Ok(self.size)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed
            && let Err(e) = std::fs::remove_file(&self.temp_path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(
                path = %self.temp_path.display(),
                error = %e,
                "Failed to remove staged media file"
            );
        }
    }
}

/// Write `data` to `path` atomically and confirm its size on disk.
///
/// Returns the number of bytes written.
///
/// # Errors
///
/// Returns a [`StorageError`] if the write, the rename or the size check fails.
pub async fn write_atomic(path: &Path, data: &[u8]) -> Result<u64, StorageError> {
    StagedFile::write(path, data).await?.commit().await
}

/// Copy `source` to `dest` atomically and confirm the copy matches the source size.
///
/// Returns the number of bytes copied.
///
/// # Errors
///
/// Returns [`StorageErrorKind::NotFound`] if `source` does not exist, and a
/// write or size error otherwise.
pub async fn copy_atomic(source: &Path, dest: &Path) -> Result<u64, StorageError> {
    StagedFile::copy(source, dest).await?.commit().await
}

/// Check that `path` exists and holds exactly `expected` bytes.
///
/// # Errors
///
/// Returns [`StorageErrorKind::NotFound`] or [`StorageErrorKind::SizeMismatch`].
pub async fn verify_size(path: &Path, expected: u64) -> Result<(), StorageError> {
    let actual = tokio::fs::metadata(path)
        .await
        .map_err(|_| StorageError::new(StorageErrorKind::NotFound(path.display().to_string())))?
        .len();

    if actual != expected {
        return Err(StorageError::new(StorageErrorKind::SizeMismatch {
            path: path.display().to_string(),
            expected,
            actual,
        }));
    }
    Ok(())
}

/// Delete files, logging failures instead of returning them.
pub async fn remove_best_effort<I>(paths: I)
where
    I: IntoIterator<Item = PathBuf>,
{
    for path in paths {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed media file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove media file")
            }
        }
    }
}

/// Decode an image in any supported format and re-encode it as JPEG.
///
/// CPU bound; run it on a blocking thread.
///
/// # Errors
///
/// Returns [`StorageErrorKind::ImageEncoding`] if the bytes cannot be decoded
/// or encoded.
pub fn encode_jpeg(data: &[u8]) -> Result<Vec<u8>, StorageError> {
    let decoded = image::load_from_memory(data)
        .map_err(|e| StorageError::new(StorageErrorKind::ImageEncoding(format!("decode: {}", e))))?;

    let mut encoded = Vec::new();
    decoded
        .to_rgb8()
        .write_with_encoder(JpegEncoder::new_with_quality(&mut encoded, JPEG_QUALITY))
        .map_err(|e| StorageError::new(StorageErrorKind::ImageEncoding(format!("encode: {}", e))))?;
    Ok(encoded)
}
