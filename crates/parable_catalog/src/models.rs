//! Database row types for the asset catalog.

use crate::schema::{audio, images, scenes, stories, videos};
use chrono::NaiveDateTime;
use diesel::prelude::*;

/// A stored story.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = stories)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StoryRow {
    pub id: i32,
    pub idiom: String,
    pub story_text: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// New story for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = stories)]
pub struct NewStoryRow<'a> {
    pub idiom: &'a str,
    pub story_text: &'a str,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A stored scene.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = scenes)]
#[diesel(belongs_to(StoryRow, foreign_key = story_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SceneRow {
    pub id: i32,
    pub story_id: i32,
    pub scene_text: String,
    pub scene_order: i32,
    pub created_at: NaiveDateTime,
}

/// New scene for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = scenes)]
pub struct NewSceneRow<'a> {
    pub story_id: i32,
    pub scene_text: &'a str,
    pub scene_order: i32,
    pub created_at: NaiveDateTime,
}

/// A stored image artifact.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = images)]
#[diesel(belongs_to(StoryRow, foreign_key = story_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ImageRow {
    pub id: i32,
    pub story_id: i32,
    pub scene_id: Option<i32>,
    pub image_path: String,
    pub image_filename: String,
    pub image_size: i64,
    pub created_at: NaiveDateTime,
}

/// New image artifact for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = images)]
pub struct NewImageRow {
    pub story_id: i32,
    pub scene_id: Option<i32>,
    pub image_path: String,
    pub image_filename: String,
    pub image_size: i64,
    pub created_at: NaiveDateTime,
}

/// A stored narration track.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = audio)]
#[diesel(belongs_to(StoryRow, foreign_key = story_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AudioRow {
    pub id: i32,
    pub story_id: i32,
    pub audio_path: String,
    pub audio_filename: String,
    pub audio_size: i64,
    pub audio_duration: Option<f64>,
    pub created_at: NaiveDateTime,
}

/// New narration track for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = audio)]
pub struct NewAudioRow {
    pub story_id: i32,
    pub audio_path: String,
    pub audio_filename: String,
    pub audio_size: i64,
    pub audio_duration: Option<f64>,
    pub created_at: NaiveDateTime,
}

/// A stored story video.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = videos)]
#[diesel(belongs_to(StoryRow, foreign_key = story_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct VideoRow {
    pub id: i32,
    pub story_id: i32,
    pub video_path: String,
    pub video_filename: String,
    pub video_size: i64,
    pub video_duration: Option<f64>,
    pub created_at: NaiveDateTime,
}

/// New story video for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = videos)]
pub struct NewVideoRow {
    pub story_id: i32,
    pub video_path: String,
    pub video_filename: String,
    pub video_size: i64,
    pub video_duration: Option<f64>,
    pub created_at: NaiveDateTime,
}
