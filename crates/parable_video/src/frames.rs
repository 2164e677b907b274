//! Decoding and normalizing still images before assembly.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use parable_core::SkippedMedia;
use parable_error::{ParableResult, StorageError, StorageErrorKind, SyncError, SyncErrorKind};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Frames ready for the encoder, living in a scratch directory.
///
/// The directory and everything in it is removed when this value is dropped.
#[derive(Debug)]
pub struct PreparedFrames {
    dir: TempDir,
    frames: Vec<PathBuf>,
    skipped: Vec<SkippedMedia>,
}

impl PreparedFrames {
    /// Normalized PNG frames in input order.
    pub fn frames(&self) -> &[PathBuf] {
        &self.frames
    }

    /// Inputs that could not be decoded.
    pub fn skipped(&self) -> &[SkippedMedia] {
        &self.skipped
    }

    /// Scratch directory holding the frames.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Whether no input survived.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Letterboxes images onto a fixed-size canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_getters::Getters)]
pub struct FramePreparer {
    /// Frame width in pixels
    width: u32,
    /// Frame height in pixels
    height: u32,
}

impl FramePreparer {
    /// Preparer producing `width`×`height` frames.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(2),
            height: height.max(2),
        }
    }

    /// Output frame size.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Decode every image, fit it to the frame and write it as PNG.
    ///
    /// Undecodable inputs are skipped and reported rather than failing the
    /// batch.
    ///
    /// # Errors
    ///
    /// Fails only if the scratch directory cannot be created or a frame
    /// cannot be written.
    #[tracing::instrument(skip(self, images), fields(images = images.len(), width = self.width, height = self.height))]
    pub async fn prepare(&self, images: &[PathBuf]) -> ParableResult<PreparedFrames> {
        let preparer = *self;
        let images = images.to_vec();
        tokio::task::spawn_blocking(move || preparer.prepare_blocking(&images))
            .await
            .map_err(|e| StorageError::new(StorageErrorKind::Task(e.to_string())))?
    }

    fn prepare_blocking(&self, images: &[PathBuf]) -> ParableResult<PreparedFrames> {
        let dir = tempfile::Builder::new()
            .prefix("parable-frames-")
            .tempdir()
            .map_err(|e| SyncError::new(SyncErrorKind::FramePreparation(e.to_string())))?;

        let mut frames = Vec::with_capacity(images.len());
        let mut skipped = Vec::new();

        for (index, source) in images.iter().enumerate() {
            let decoded = match image::open(source) {
                Ok(decoded) => decoded,
                Err(e) => {
                    tracing::warn!(index, path = %source.display(), error = %e, "Skipping undecodable image");
                    skipped.push(SkippedMedia::new(index, format!("{}: {}", source.display(), e)));
                    continue;
                }
            };

            let frame = self.letterbox(&decoded);
            let path = dir.path().join(format!("frame_{:03}.png", frames.len()));
            frame.save(&path).map_err(|e| {
                SyncError::new(SyncErrorKind::FramePreparation(format!("{}: {}", path.display(), e)))
            })?;
            frames.push(path);
        }

        tracing::debug!(prepared = frames.len(), skipped = skipped.len(), "Frames prepared");
        Ok(PreparedFrames {
            dir,
            frames,
            skipped,
        })
    }

    /// Scale `image` to fit inside the frame and centre it on black.
    pub fn letterbox(&self, image: &DynamicImage) -> RgbImage {
        let (src_w, src_h) = (image.width().max(1), image.height().max(1));
        let scale = f64::min(
            f64::from(self.width) / f64::from(src_w),
            f64::from(self.height) / f64::from(src_h),
        );
        let fit_w = ((f64::from(src_w) * scale).round() as u32).clamp(1, self.width);
        let fit_h = ((f64::from(src_h) * scale).round() as u32).clamp(1, self.height);

        let resized = imageops::resize(&image.to_rgb8(), fit_w, fit_h, FilterType::Triangle);
        let mut canvas = RgbImage::from_pixel(self.width, self.height, Rgb([0, 0, 0]));
        let x = i64::from((self.width - fit_w) / 2);
        let y = i64::from((self.height - fit_h) / 2);
        imageops::overlay(&mut canvas, &resized, x, y);
        canvas
    }
}
