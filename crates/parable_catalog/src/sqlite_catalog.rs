//! SQLite implementation of [`AssetCatalog`].

use crate::connection::{self, CatalogPool};
use crate::files::{self, MediaLayout, StagedFile};
use crate::models::{
    AudioRow, ImageRow, NewAudioRow, NewImageRow, NewSceneRow, NewStoryRow, NewVideoRow,
    SceneRow, StoryRow, VideoRow,
};
use crate::schema::{audio, images, scenes, stories, videos};
use crate::{
    AssetCatalog, DatabaseResult, IdiomLocks, ImageInput, MediaRecord, MediaTotals, SavedImages,
    StorageStats, StoryRecord, StorySummary, preview,
};

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use parable_core::{MediaType, SkippedMedia, StorageConfig, validate_idiom};
use parable_error::{
    DatabaseError, DatabaseErrorKind, InputError, InputErrorKind, ParableError, ParableResult,
    StorageError, StorageErrorKind,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::OwnedMutexGuard;

/// Asset catalog backed by a SQLite database and a media directory tree.
///
/// Diesel work runs on the blocking thread pool with a pooled connection.
/// Writes hold the idiom's lock from the first file write until the commit,
/// so two saves for the same idiom never interleave.
///
/// # Example
///
/// ```no_run
/// use parable_catalog::{AssetCatalog, SqliteAssetCatalog};
/// use parable_core::ParableConfig;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ParableConfig::load()?;
/// let catalog = SqliteAssetCatalog::open(&config.storage).await?;
///
/// let scenes = vec!["农夫在田里劳作。".to_string(), "兔子撞上树桩。".to_string()];
/// let story_id = catalog.save_story("守株待兔", "从前，宋国有个农夫……", &scenes).await?;
/// println!("Saved story {}", story_id);
///
/// catalog.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct SqliteAssetCatalog {
    pool: CatalogPool,
    layout: MediaLayout,
    locks: IdiomLocks,
}

impl std::fmt::Debug for SqliteAssetCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteAssetCatalog")
            .field("layout", &self.layout)
            .field("connections", &self.pool.state().connections)
            .finish()
    }
}

struct PendingImage {
    scene_order: Option<i32>,
    path: String,
    file_name: String,
    size: i64,
}

struct StagedMedia {
    _guard: OwnedMutexGuard<()>,
    file: StagedFile,
    path: String,
    file_name: String,
    size: i64,
}

fn task_error(e: tokio::task::JoinError) -> ParableError {
    StorageError::new(StorageErrorKind::Task(e.to_string())).into()
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl SqliteAssetCatalog {
    /// Open the catalog: create the media directories, build the connection
    /// pool and apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage root cannot be created, the database
    /// cannot be opened or a migration fails.
    #[tracing::instrument(skip(config), fields(root = %config.root.display(), database = %config.database.display()))]
    pub async fn open(config: &StorageConfig) -> ParableResult<Self> {
        let layout = MediaLayout::new(&config.root);
        layout.ensure().await?;

        let config = config.clone();
        let pool = tokio::task::spawn_blocking(move || -> DatabaseResult<CatalogPool> {
            let pool = connection::build_pool(&config)?;
            let mut conn = pool.get()?;
            connection::run_migrations(&mut conn)?;
            Ok(pool)
        })
        .await
        .map_err(task_error)??;

        tracing::info!("Opened asset catalog");
        Ok(Self {
            pool,
            layout,
            locks: IdiomLocks::new(),
        })
    }

    /// Flush the write-ahead log and release every pooled connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the final checkpoint fails.
    #[tracing::instrument(skip(self))]
    pub async fn close(self) -> ParableResult<()> {
        self.blocking(connection::checkpoint).await?;
        drop(self.pool);
        tracing::info!("Closed asset catalog");
        Ok(())
    }

    /// Directory layout of durable media.
    pub fn layout(&self) -> &MediaLayout {
        &self.layout
    }

    async fn blocking<T, F>(&self, work: F) -> ParableResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> DatabaseResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            work(&mut conn)
        })
        .await
        .map_err(task_error)?
        .map_err(ParableError::from)
    }

    /// Confirm `story_id` exists and belongs to `idiom`.
    async fn require_story(&self, story_id: i32, idiom: &str) -> ParableResult<()> {
        let stored: Option<String> = self
            .blocking(move |conn| {
                Ok(stories::table
                    .find(story_id)
                    .select(stories::idiom)
                    .first::<String>(conn)
                    .optional()?)
            })
            .await?;

        match stored {
            None => Err(DatabaseError::new(DatabaseErrorKind::NotFound).into()),
            Some(stored) if stored != idiom => Err(InputError::new(InputErrorKind::InvalidIdiom {
                idiom: idiom.to_string(),
                reason: format!("story {} belongs to '{}'", story_id, stored),
            })
            .into()),
            Some(_) => Ok(()),
        }
    }

    /// Lock the idiom, check the story and stage a copy of `source`.
    ///
    /// The durable file is only replaced once the caller commits the staged
    /// copy after its row transaction succeeds.
    async fn stage_media(
        &self,
        media_type: MediaType,
        story_id: i32,
        source: &Path,
        idiom: &str,
    ) -> ParableResult<StagedMedia> {
        let idiom = validate_idiom(idiom)?;
        let guard = self.locks.lock(&idiom).await;
        self.require_story(story_id, &idiom).await?;

        let dest = self.layout.path_for(media_type, &idiom, 1);
        let file = StagedFile::copy(source, &dest).await?;

        Ok(StagedMedia {
            _guard: guard,
            path: path_string(&dest),
            file_name: media_type.file_name(&idiom, 1),
            size: file.size() as i64,
            file,
        })
    }
}

async fn stage_image(path: &Path, bytes: Vec<u8>) -> Result<StagedFile, StorageError> {
    let jpeg = tokio::task::spawn_blocking(move || files::encode_jpeg(&bytes))
        .await
        .map_err(|e| StorageError::new(StorageErrorKind::Task(e.to_string())))??;
    StagedFile::write(path, &jpeg).await
}

/// Move committed files into place.
async fn commit_files(files: Vec<StagedFile>, media_type: MediaType) -> ParableResult<()> {
    for file in files {
        let target = file.target().to_path_buf();
        let size = file.commit().await?;
        tracing::info!(
            media_type = %media_type,
            path = %target.display(),
            size,
            "Stored media file"
        );
    }
    Ok(())
}

#[async_trait]
impl AssetCatalog for SqliteAssetCatalog {
    #[tracing::instrument(skip(self, text, scenes), fields(scene_count = scenes.len()))]
    async fn save_story(&self, idiom: &str, text: &str, scenes: &[String]) -> ParableResult<i32> {
        let idiom = validate_idiom(idiom)?;
        let _guard = self.locks.lock(&idiom).await;

        let text = text.to_string();
        let scene_texts = scenes.to_vec();
        let story_id = self
            .blocking(move |conn| {
                conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
                    let now = Utc::now().naive_utc();
                    let story_id: i32 = diesel::insert_into(stories::table)
                        .values(&NewStoryRow {
                            idiom: &idiom,
                            story_text: &text,
                            created_at: now,
                            updated_at: now,
                        })
                        .on_conflict(stories::idiom)
                        .do_update()
                        .set((stories::story_text.eq(&text), stories::updated_at.eq(now)))
                        .returning(stories::id)
                        .get_result(conn)?;

                    diesel::delete(scenes::table.filter(scenes::story_id.eq(story_id)))
                        .execute(conn)?;

                    let rows: Vec<NewSceneRow> = scene_texts
                        .iter()
                        .enumerate()
                        .map(|(i, scene_text)| NewSceneRow {
                            story_id,
                            scene_text,
                            scene_order: i as i32 + 1,
                            created_at: now,
                        })
                        .collect();
                    if !rows.is_empty() {
                        diesel::insert_into(scenes::table)
                            .values(&rows)
                            .execute(conn)?;
                    }

                    Ok(story_id)
                })
            })
            .await?;

        tracing::info!(story_id, "Saved story");
        Ok(story_id)
    }

    #[tracing::instrument(skip(self, images), fields(image_count = images.len()))]
    async fn save_images(
        &self,
        story_id: i32,
        idiom: &str,
        images: Vec<ImageInput>,
    ) -> ParableResult<SavedImages> {
        let idiom = validate_idiom(idiom)?;
        if images.is_empty() {
            return Ok(SavedImages::default());
        }

        let _guard = self.locks.lock(&idiom).await;
        self.require_story(story_id, &idiom).await?;

        let mut pending = Vec::with_capacity(images.len());
        let mut staged = Vec::with_capacity(images.len());
        let mut skipped = Vec::new();
        for (index, image) in images.into_iter().enumerate() {
            let path = self.layout.path_for(MediaType::Image, &idiom, index + 1);
            match stage_image(&path, image.bytes).await {
                Ok(file) => {
                    pending.push(PendingImage {
                        scene_order: image.scene_order,
                        path: path_string(&path),
                        file_name: MediaType::Image.file_name(&idiom, index + 1),
                        size: file.size() as i64,
                    });
                    staged.push(file);
                }
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping image that could not be stored");
                    skipped.push(SkippedMedia::new(index, e.kind.to_string()));
                }
            }
        }

        if pending.is_empty() {
            tracing::warn!("No image could be stored, keeping the previous image set");
            return Ok(SavedImages {
                records: Vec::new(),
                skipped,
            });
        }

        let (records, previous) = self
            .blocking(move |conn| {
                conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
                    let scene_ids: HashMap<i32, i32> = scenes::table
                        .filter(scenes::story_id.eq(story_id))
                        .select((scenes::scene_order, scenes::id))
                        .load::<(i32, i32)>(conn)?
                        .into_iter()
                        .collect();

                    let previous: Vec<String> = images::table
                        .filter(images::story_id.eq(story_id))
                        .select(images::image_path)
                        .load(conn)?;
                    diesel::delete(images::table.filter(images::story_id.eq(story_id)))
                        .execute(conn)?;

                    let now = Utc::now().naive_utc();
                    let mut records = Vec::with_capacity(pending.len());
                    for image in &pending {
                        let row: ImageRow = diesel::insert_into(images::table)
                            .values(&NewImageRow {
                                story_id,
                                scene_id: image
                                    .scene_order
                                    .and_then(|order| scene_ids.get(&order).copied()),
                                image_path: image.path.clone(),
                                image_filename: image.file_name.clone(),
                                image_size: image.size,
                                created_at: now,
                            })
                            .returning(ImageRow::as_returning())
                            .get_result(conn)?;
                        records.push(MediaRecord::from(row));
                    }

                    Ok((records, previous))
                })
            })
            .await?;
        commit_files(staged, MediaType::Image).await?;

        let current: HashSet<&Path> = records.iter().map(|r| r.path.as_path()).collect();
        let stale: Vec<PathBuf> = previous
            .into_iter()
            .map(PathBuf::from)
            .filter(|p| !current.contains(p.as_path()))
            .collect();
        files::remove_best_effort(stale).await;

        tracing::info!(
            stored = records.len(),
            skipped = skipped.len(),
            "Saved image set"
        );
        Ok(SavedImages { records, skipped })
    }

    #[tracing::instrument(skip(self, source), fields(source = %source.display()))]
    async fn save_audio(
        &self,
        story_id: i32,
        source: &Path,
        idiom: &str,
        duration_secs: Option<f64>,
    ) -> ParableResult<MediaRecord> {
        let StagedMedia {
            _guard,
            file,
            path,
            file_name,
            size,
        } = self
            .stage_media(MediaType::Audio, story_id, source, idiom)
            .await?;

        let record = self
            .blocking(move |conn| {
                conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
                    diesel::delete(audio::table.filter(audio::story_id.eq(story_id))).execute(conn)?;
                    let row: AudioRow = diesel::insert_into(audio::table)
                        .values(&NewAudioRow {
                            story_id,
                            audio_path: path,
                            audio_filename: file_name,
                            audio_size: size,
                            audio_duration: duration_secs,
                            created_at: Utc::now().naive_utc(),
                        })
                        .returning(AudioRow::as_returning())
                        .get_result(conn)?;
                    Ok(MediaRecord::from(row))
                })
            })
            .await?;
        commit_files(vec![file], MediaType::Audio).await?;
        Ok(record)
    }

    #[tracing::instrument(skip(self, source), fields(source = %source.display()))]
    async fn save_video(
        &self,
        story_id: i32,
        source: &Path,
        idiom: &str,
        duration_secs: Option<f64>,
    ) -> ParableResult<MediaRecord> {
        let StagedMedia {
            _guard,
            file,
            path,
            file_name,
            size,
        } = self
            .stage_media(MediaType::Video, story_id, source, idiom)
            .await?;

        let record = self
            .blocking(move |conn| {
                conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
                    diesel::delete(videos::table.filter(videos::story_id.eq(story_id)))
                        .execute(conn)?;
                    let row: VideoRow = diesel::insert_into(videos::table)
                        .values(&NewVideoRow {
                            story_id,
                            video_path: path,
                            video_filename: file_name,
                            video_size: size,
                            video_duration: duration_secs,
                            created_at: Utc::now().naive_utc(),
                        })
                        .returning(VideoRow::as_returning())
                        .get_result(conn)?;
                    Ok(MediaRecord::from(row))
                })
            })
            .await?;
        commit_files(vec![file], MediaType::Video).await?;
        Ok(record)
    }

    #[tracing::instrument(skip(self))]
    async fn get_story(&self, idiom: &str) -> ParableResult<Option<StoryRecord>> {
        let idiom = idiom.trim().to_string();
        self.blocking(move |conn| {
            let Some(story) = stories::table
                .filter(stories::idiom.eq(&idiom))
                .select(StoryRow::as_select())
                .first(conn)
                .optional()?
            else {
                return Ok(None);
            };

            let scene_rows = SceneRow::belonging_to(&story)
                .select(SceneRow::as_select())
                .order(scenes::scene_order.asc())
                .load(conn)?;
            let image_rows = ImageRow::belonging_to(&story)
                .select(ImageRow::as_select())
                .order((images::image_filename.asc(), images::id.asc()))
                .load(conn)?;
            let audio_row = AudioRow::belonging_to(&story)
                .select(AudioRow::as_select())
                .order(audio::id.desc())
                .first(conn)
                .optional()?;
            let video_row = VideoRow::belonging_to(&story)
                .select(VideoRow::as_select())
                .order(videos::id.desc())
                .first(conn)
                .optional()?;

            Ok(Some(StoryRecord::hydrate(
                story, scene_rows, image_rows, audio_row, video_row,
            )))
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn list_stories(&self, limit: usize) -> ParableResult<Vec<StorySummary>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.blocking(move |conn| {
            let rows: Vec<StoryRow> = stories::table
                .select(StoryRow::as_select())
                .order((stories::updated_at.desc(), stories::id.desc()))
                .limit(limit)
                .load(conn)?;

            rows.into_iter()
                .map(|story| -> DatabaseResult<StorySummary> {
                    let scene_count: i64 = scenes::table
                        .filter(scenes::story_id.eq(story.id))
                        .count()
                        .get_result(conn)?;
                    let image_count: i64 = images::table
                        .filter(images::story_id.eq(story.id))
                        .count()
                        .get_result(conn)?;
                    let audio_count: i64 = audio::table
                        .filter(audio::story_id.eq(story.id))
                        .count()
                        .get_result(conn)?;
                    let video_count: i64 = videos::table
                        .filter(videos::story_id.eq(story.id))
                        .count()
                        .get_result(conn)?;

                    Ok(StorySummary {
                        id: story.id,
                        preview: preview(&story.story_text),
                        idiom: story.idiom,
                        created_at: story.created_at,
                        updated_at: story.updated_at,
                        scene_count,
                        image_count,
                        audio_count,
                        video_count,
                    })
                })
                .collect()
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_story(&self, idiom: &str) -> ParableResult<bool> {
        let idiom = validate_idiom(idiom)?;
        let _guard = self.locks.lock(&idiom).await;

        let removed = self
            .blocking(move |conn| {
                conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
                    let Some(story_id) = stories::table
                        .filter(stories::idiom.eq(&idiom))
                        .select(stories::id)
                        .first::<i32>(conn)
                        .optional()?
                    else {
                        return Ok(None);
                    };

                    let mut paths: Vec<String> = images::table
                        .filter(images::story_id.eq(story_id))
                        .select(images::image_path)
                        .load(conn)?;
                    paths.extend(
                        audio::table
                            .filter(audio::story_id.eq(story_id))
                            .select(audio::audio_path)
                            .load::<String>(conn)?,
                    );
                    paths.extend(
                        videos::table
                            .filter(videos::story_id.eq(story_id))
                            .select(videos::video_path)
                            .load::<String>(conn)?,
                    );

                    diesel::delete(images::table.filter(images::story_id.eq(story_id)))
                        .execute(conn)?;
                    diesel::delete(audio::table.filter(audio::story_id.eq(story_id)))
                        .execute(conn)?;
                    diesel::delete(videos::table.filter(videos::story_id.eq(story_id)))
                        .execute(conn)?;
                    diesel::delete(scenes::table.filter(scenes::story_id.eq(story_id)))
                        .execute(conn)?;
                    diesel::delete(stories::table.find(story_id)).execute(conn)?;

                    Ok(Some(paths))
                })
            })
            .await?;

        match removed {
            None => {
                tracing::debug!("Story not found, nothing to delete");
                Ok(false)
            }
            Some(paths) => {
                let file_count = paths.len();
                files::remove_best_effort(paths.into_iter().map(PathBuf::from)).await;
                tracing::info!(file_count, "Deleted story");
                Ok(true)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn storage_stats(&self) -> ParableResult<StorageStats> {
        self.blocking(|conn| {
            let stories: i64 = stories::table.count().get_result(conn)?;
            let scenes: i64 = scenes::table.count().get_result(conn)?;
            let image_sizes: Vec<i64> = images::table.select(images::image_size).load(conn)?;
            let audio_sizes: Vec<i64> = audio::table.select(audio::audio_size).load(conn)?;
            let video_sizes: Vec<i64> = videos::table.select(videos::video_size).load(conn)?;

            Ok(StorageStats {
                stories,
                scenes,
                images: MediaTotals::from_sizes(&image_sizes),
                audio: MediaTotals::from_sizes(&audio_sizes),
                videos: MediaTotals::from_sizes(&video_sizes),
            })
        })
        .await
    }
}
