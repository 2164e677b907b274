//! Integration tests for the SQLite asset catalog.

use diesel::connection::SimpleConnection;
use image::{ImageFormat, Rgb, RgbImage};
use parable_catalog::{AssetCatalog, ImageInput, SqliteAssetCatalog, StagedFile, build_pool};
use parable_core::StorageConfig;
use parable_error::{ParableErrorKind, StorageErrorKind};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

async fn open_catalog() -> (TempDir, SqliteAssetCatalog) {
    let dir = tempfile::tempdir().unwrap();
    let catalog = SqliteAssetCatalog::open(&StorageConfig::under(dir.path()))
        .await
        .unwrap();
    (dir, catalog)
}

fn png(color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(16, 24, Rgb(color));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn scenes(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|s| s.to_string()).collect()
}

/// Make every later insert into `table` abort.
fn reject_inserts(dir: &TempDir, table: &str) {
    let pool = build_pool(&StorageConfig::under(dir.path())).unwrap();
    let mut conn = pool.get().unwrap();
    conn.batch_execute(&format!(
        "CREATE TRIGGER reject_{table} BEFORE INSERT ON {table} \
         BEGIN SELECT RAISE(ABORT, 'insert rejected'); END;"
    ))
    .unwrap();
}

/// Hidden temporary files left in a media directory.
fn leftover_temp_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().starts_with('.'))
        .count()
}

#[tokio::test]
async fn test_get_unknown_story_is_none() {
    let (_dir, catalog) = open_catalog().await;
    assert!(catalog.get_story("守株待兔").await.unwrap().is_none());
}

#[tokio::test]
async fn test_resave_replaces_scene_set() {
    let (_dir, catalog) = open_catalog().await;

    let first = catalog
        .save_story("守株待兔", "v1", &scenes(&["一", "二", "三", "四"]))
        .await
        .unwrap();
    let second = catalog
        .save_story("守株待兔", "v2", &scenes(&["甲", "乙"]))
        .await
        .unwrap();
    assert_eq!(first, second);

    let story = catalog.get_story("守株待兔").await.unwrap().unwrap();
    assert_eq!(story.text, "v2");
    assert_eq!(story.scene_texts(), vec!["甲", "乙"]);
    let orders: Vec<i32> = story.scenes.iter().map(|s| s.order).collect();
    assert_eq!(orders, vec![1, 2]);

    let stats = catalog.storage_stats().await.unwrap();
    assert_eq!(stats.stories, 1);
    assert_eq!(stats.scenes, 2);
}

#[tokio::test]
async fn test_idempotent_resave() {
    let (_dir, catalog) = open_catalog().await;
    let texts = scenes(&["农夫种田。", "兔子撞树。", "农夫等兔。"]);

    catalog.save_story("守株待兔", "故事", &texts).await.unwrap();
    let once = catalog.get_story("守株待兔").await.unwrap().unwrap();
    catalog.save_story("守株待兔", "故事", &texts).await.unwrap();
    let twice = catalog.get_story("守株待兔").await.unwrap().unwrap();

    assert_eq!(once.id, twice.id);
    assert_eq!(once.text, twice.text);
    assert_eq!(once.scene_texts(), twice.scene_texts());
    assert_eq!(catalog.storage_stats().await.unwrap().scenes, 3);
}

#[tokio::test]
async fn test_invalid_idiom_is_rejected() {
    let (_dir, catalog) = open_catalog().await;

    let err = catalog.save_story("  ", "text", &[]).await.unwrap_err();
    assert!(matches!(err.kind(), ParableErrorKind::Input(_)));

    let err = catalog.save_story("../escape", "text", &[]).await.unwrap_err();
    assert!(matches!(err.kind(), ParableErrorKind::Input(_)));
}

#[tokio::test]
async fn test_save_images_skips_undecodable() {
    let (dir, catalog) = open_catalog().await;
    let story_id = catalog
        .save_story("守株待兔", "故事", &scenes(&["一", "二", "三"]))
        .await
        .unwrap();

    let saved = catalog
        .save_images(
            story_id,
            "守株待兔",
            vec![
                ImageInput::for_scene(png([200, 30, 30]), 1),
                ImageInput::for_scene(b"definitely not an image".to_vec(), 2),
                ImageInput::for_scene(png([30, 200, 30]), 3),
            ],
        )
        .await
        .unwrap();

    assert_eq!(saved.records.len(), 2);
    assert_eq!(saved.skipped.len(), 1);
    assert_eq!(saved.skipped[0].index, 1);

    let names: Vec<&str> = saved.records.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(names, vec!["守株待兔_01.jpg", "守株待兔_03.jpg"]);
    for record in &saved.records {
        let on_disk = std::fs::metadata(&record.path).unwrap().len();
        assert_eq!(on_disk, record.size_bytes);
        assert!(record.path.starts_with(dir.path()));
        // Re-encoded as JPEG regardless of input format.
        let bytes = std::fs::read(&record.path).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    }

    let story = catalog.get_story("守株待兔").await.unwrap().unwrap();
    assert_eq!(story.images.len(), 2);
    assert_eq!(story.images[0].scene_id, Some(story.scenes[0].id));
    assert_eq!(story.images[1].scene_id, Some(story.scenes[2].id));
}

#[tokio::test]
async fn test_save_images_replaces_previous_set() {
    let (_dir, catalog) = open_catalog().await;
    let story_id = catalog.save_story("刻舟求剑", "故事", &[]).await.unwrap();

    let first = catalog
        .save_images(
            story_id,
            "刻舟求剑",
            vec![
                ImageInput::new(png([1, 2, 3])),
                ImageInput::new(png([4, 5, 6])),
                ImageInput::new(png([7, 8, 9])),
            ],
        )
        .await
        .unwrap();
    let third = first.records[2].path.clone();
    assert!(third.exists());

    let second = catalog
        .save_images(
            story_id,
            "刻舟求剑",
            vec![ImageInput::new(png([9, 9, 9])), ImageInput::new(png([8, 8, 8]))],
        )
        .await
        .unwrap();
    assert_eq!(second.records.len(), 2);
    assert!(!third.exists());

    let story = catalog.get_story("刻舟求剑").await.unwrap().unwrap();
    assert_eq!(story.images.len(), 2);
    // Scenes are not linked when no order is given.
    assert!(story.images.iter().all(|i| i.scene_id.is_none()));
}

#[tokio::test]
async fn test_all_images_failing_keeps_previous_set() {
    let (_dir, catalog) = open_catalog().await;
    let story_id = catalog.save_story("杯弓蛇影", "故事", &[]).await.unwrap();
    catalog
        .save_images(story_id, "杯弓蛇影", vec![ImageInput::new(png([1, 1, 1]))])
        .await
        .unwrap();

    let saved = catalog
        .save_images(story_id, "杯弓蛇影", vec![ImageInput::new(vec![0, 1, 2])])
        .await
        .unwrap();
    assert!(saved.records.is_empty());
    assert_eq!(saved.skipped.len(), 1);

    let story = catalog.get_story("杯弓蛇影").await.unwrap().unwrap();
    assert_eq!(story.images.len(), 1);
}

#[tokio::test]
async fn test_save_images_for_unknown_story_fails() {
    let (_dir, catalog) = open_catalog().await;
    let err = catalog
        .save_images(42, "守株待兔", vec![ImageInput::new(png([1, 1, 1]))])
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), ParableErrorKind::Database(_)));
}

#[tokio::test]
async fn test_save_audio_and_video_keep_single_current_row() {
    let (dir, catalog) = open_catalog().await;
    let story_id = catalog.save_story("守株待兔", "故事", &[]).await.unwrap();

    let source = dir.path().join("narration.mp3");
    std::fs::write(&source, vec![7u8; 2048]).unwrap();
    catalog
        .save_audio(story_id, &source, "守株待兔", Some(12.5))
        .await
        .unwrap();

    std::fs::write(&source, vec![8u8; 4096]).unwrap();
    let audio = catalog
        .save_audio(story_id, &source, "守株待兔", Some(13.0))
        .await
        .unwrap();
    assert_eq!(audio.file_name, "守株待兔_01.mp3");
    assert_eq!(audio.size_bytes, 4096);
    assert_eq!(audio.duration_secs, Some(13.0));

    let video_source = dir.path().join("render.mp4");
    std::fs::write(&video_source, vec![1u8; 10_000]).unwrap();
    let video = catalog
        .save_video(story_id, &video_source, "守株待兔", Some(13.0))
        .await
        .unwrap();
    assert_eq!(video.file_name, "守株待兔_story.mp4");
    assert!(video.path.exists());

    let story = catalog.get_story("守株待兔").await.unwrap().unwrap();
    assert_eq!(story.audio.as_ref().map(|a| a.id), Some(audio.id));
    assert_eq!(story.video.as_ref().map(|v| v.size_bytes), Some(10_000));

    let stats = catalog.storage_stats().await.unwrap();
    assert_eq!(stats.audio.count, 1);
    assert_eq!(stats.audio.bytes, 4096);
    assert_eq!(stats.videos.count, 1);
    assert_eq!(stats.total_bytes(), 14_096);
}

#[tokio::test]
async fn test_save_audio_missing_source_leaves_no_row() {
    let (dir, catalog) = open_catalog().await;
    let story_id = catalog.save_story("守株待兔", "故事", &[]).await.unwrap();

    let err = catalog
        .save_audio(story_id, &dir.path().join("missing.mp3"), "守株待兔", None)
        .await
        .unwrap_err();
    match err.kind() {
        ParableErrorKind::Storage(e) => {
            assert!(matches!(e.kind, StorageErrorKind::NotFound(_)))
        }
        other => panic!("unexpected error: {other}"),
    }

    let story = catalog.get_story("守株待兔").await.unwrap().unwrap();
    assert!(story.audio.is_none());
}

#[tokio::test]
async fn test_failed_media_row_keeps_committed_files() {
    let (dir, catalog) = open_catalog().await;
    let story_id = catalog.save_story("守株待兔", "故事", &[]).await.unwrap();

    let audio_source = dir.path().join("first.mp3");
    std::fs::write(&audio_source, vec![1u8; 10]).unwrap();
    catalog
        .save_audio(story_id, &audio_source, "守株待兔", Some(1.0))
        .await
        .unwrap();
    let video_source = dir.path().join("first.mp4");
    std::fs::write(&video_source, vec![2u8; 20]).unwrap();
    catalog
        .save_video(story_id, &video_source, "守株待兔", Some(1.0))
        .await
        .unwrap();

    reject_inserts(&dir, "audio");
    reject_inserts(&dir, "videos");

    let bigger = dir.path().join("second.bin");
    std::fs::write(&bigger, vec![9u8; 999]).unwrap();
    let err = catalog
        .save_audio(story_id, &bigger, "守株待兔", Some(2.0))
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), ParableErrorKind::Database(_)));
    let err = catalog
        .save_video(story_id, &bigger, "守株待兔", Some(2.0))
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), ParableErrorKind::Database(_)));

    let story = catalog.get_story("守株待兔").await.unwrap().unwrap();
    let audio = story.audio.unwrap();
    assert_eq!(audio.size_bytes, 10);
    assert_eq!(audio.duration_secs, Some(1.0));
    assert_eq!(std::fs::read(&audio.path).unwrap(), vec![1u8; 10]);
    let video = story.video.unwrap();
    assert_eq!(video.size_bytes, 20);
    assert_eq!(std::fs::read(&video.path).unwrap(), vec![2u8; 20]);

    assert_eq!(leftover_temp_files(audio.path.parent().unwrap()), 0);
    assert_eq!(leftover_temp_files(video.path.parent().unwrap()), 0);
}

#[tokio::test]
async fn test_failed_image_rows_keep_committed_images() {
    let (dir, catalog) = open_catalog().await;
    let story_id = catalog.save_story("守株待兔", "故事", &[]).await.unwrap();
    let first = catalog
        .save_images(
            story_id,
            "守株待兔",
            vec![ImageInput::new(png([10, 10, 10])), ImageInput::new(png([20, 20, 20]))],
        )
        .await
        .unwrap();
    let committed: Vec<Vec<u8>> = first
        .records
        .iter()
        .map(|r| std::fs::read(&r.path).unwrap())
        .collect();

    reject_inserts(&dir, "images");
    let err = catalog
        .save_images(
            story_id,
            "守株待兔",
            vec![
                ImageInput::new(png([200, 0, 0])),
                ImageInput::new(png([0, 200, 0])),
                ImageInput::new(png([0, 0, 200])),
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), ParableErrorKind::Database(_)));

    let story = catalog.get_story("守株待兔").await.unwrap().unwrap();
    assert_eq!(story.images.len(), 2);
    for (record, bytes) in story.images.iter().zip(&committed) {
        assert_eq!(&std::fs::read(&record.path).unwrap(), bytes);
        assert_eq!(std::fs::metadata(&record.path).unwrap().len(), record.size_bytes);
    }
    let images_dir = story.images[0].path.parent().unwrap();
    assert!(!images_dir.join("守株待兔_03.jpg").exists());
    assert_eq!(leftover_temp_files(images_dir), 0);
}

#[tokio::test]
async fn test_staged_file_only_replaces_target_on_commit() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("守株待兔_01.mp3");
    std::fs::write(&target, b"old").unwrap();

    let staged = StagedFile::write(&target, b"newer bytes").await.unwrap();
    assert_eq!(staged.size(), 11);
    assert_eq!(std::fs::read(&target).unwrap(), b"old");
    drop(staged);
    assert_eq!(std::fs::read(&target).unwrap(), b"old");
    assert_eq!(leftover_temp_files(dir.path()), 0);

    let staged = StagedFile::write(&target, b"newer bytes").await.unwrap();
    assert_eq!(staged.commit().await.unwrap(), 11);
    assert_eq!(std::fs::read(&target).unwrap(), b"newer bytes");
    assert_eq!(leftover_temp_files(dir.path()), 0);
}

#[tokio::test]
async fn test_delete_story_cascades_rows_and_files() {
    let (dir, catalog) = open_catalog().await;
    let story_id = catalog
        .save_story("守株待兔", "故事", &scenes(&["一", "二"]))
        .await
        .unwrap();
    let saved = catalog
        .save_images(
            story_id,
            "守株待兔",
            vec![ImageInput::for_scene(png([5, 5, 5]), 1)],
        )
        .await
        .unwrap();
    let source = dir.path().join("a.mp3");
    std::fs::write(&source, b"mp3").unwrap();
    let audio = catalog
        .save_audio(story_id, &source, "守株待兔", None)
        .await
        .unwrap();
    let video_source = dir.path().join("a.mp4");
    std::fs::write(&video_source, b"mp4").unwrap();
    let video = catalog
        .save_video(story_id, &video_source, "守株待兔", Some(3.0))
        .await
        .unwrap();
    assert!(video.path.exists());

    assert!(catalog.delete_story("守株待兔").await.unwrap());

    assert!(catalog.get_story("守株待兔").await.unwrap().is_none());
    assert!(!saved.records[0].path.exists());
    assert!(!audio.path.exists());
    assert!(!video.path.exists());
    let stats = catalog.storage_stats().await.unwrap();
    assert_eq!(stats.stories, 0);
    assert_eq!(stats.scenes, 0);
    assert_eq!(stats.images.count, 0);
    assert_eq!(stats.audio.count, 0);
    assert_eq!(stats.videos.count, 0);
    assert_eq!(stats.total_bytes(), 0);

    assert!(!catalog.delete_story("守株待兔").await.unwrap());
}

#[tokio::test]
async fn test_delete_tolerates_missing_files() {
    let (dir, catalog) = open_catalog().await;
    let story_id = catalog.save_story("守株待兔", "故事", &[]).await.unwrap();
    let source = dir.path().join("a.mp3");
    std::fs::write(&source, b"mp3").unwrap();
    let audio = catalog
        .save_audio(story_id, &source, "守株待兔", None)
        .await
        .unwrap();

    std::fs::remove_file(&audio.path).unwrap();
    assert!(catalog.delete_story("守株待兔").await.unwrap());
    assert!(catalog.get_story("守株待兔").await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_stories_orders_and_previews() {
    let (_dir, catalog) = open_catalog().await;
    let long_text = "长".repeat(150);

    catalog.save_story("画蛇添足", "短", &[]).await.unwrap();
    catalog
        .save_story("守株待兔", &long_text, &scenes(&["一", "二"]))
        .await
        .unwrap();
    catalog.save_story("亡羊补牢", "中", &[]).await.unwrap();
    // Updating an older story moves it to the front.
    catalog.save_story("画蛇添足", "更新", &[]).await.unwrap();

    let summaries = catalog.list_stories(10).await.unwrap();
    let idioms: Vec<&str> = summaries.iter().map(|s| s.idiom.as_str()).collect();
    assert_eq!(idioms, vec!["画蛇添足", "亡羊补牢", "守株待兔"]);

    let rabbit = &summaries[2];
    assert_eq!(rabbit.scene_count, 2);
    assert_eq!(rabbit.preview.chars().count(), 103);
    assert!(rabbit.preview.ends_with("..."));

    assert_eq!(catalog.list_stories(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_saves_for_one_idiom_stay_consistent() {
    let (_dir, catalog) = open_catalog().await;
    let catalog = Arc::new(catalog);

    let mut handles = Vec::new();
    for n in 1..=8usize {
        let catalog = catalog.clone();
        handles.push(tokio::spawn(async move {
            let texts: Vec<String> = (0..n).map(|i| format!("场景{}", i)).collect();
            catalog
                .save_story("守株待兔", &format!("版本{}", n), &texts)
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let story = catalog.get_story("守株待兔").await.unwrap().unwrap();
    let n: usize = story.text.trim_start_matches("版本").parse().unwrap();
    assert_eq!(story.scenes.len(), n);
}

#[tokio::test]
async fn test_close_and_reopen_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig::under(dir.path());

    let catalog = SqliteAssetCatalog::open(&config).await.unwrap();
    catalog
        .save_story("守株待兔", "故事", &scenes(&["一"]))
        .await
        .unwrap();
    catalog.close().await.unwrap();

    let catalog = SqliteAssetCatalog::open(&config).await.unwrap();
    let story = catalog.get_story("守株待兔").await.unwrap().unwrap();
    assert_eq!(story.scenes.len(), 1);
}
