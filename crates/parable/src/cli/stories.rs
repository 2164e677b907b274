//! Catalog browsing command handlers.

use super::CliResult;
use super::commands::{OutputFormat, StoryCommands};
use parable::{AssetCatalog, MediaRecord, Services, StorageStats, StoryRecord};

/// Handle story catalog commands.
pub async fn handle_story_command(services: &Services, cmd: StoryCommands) -> CliResult {
    let catalog = services.catalog();
    match cmd {
        StoryCommands::List { limit, format } => {
            let stories = catalog.list_stories(limit).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stories)?),
                OutputFormat::Human => {
                    println!(
                        "{:<6} {:<12} {:>6} {:>6} {:>6} {:>6}  Preview",
                        "ID", "Idiom", "Scenes", "Images", "Audio", "Video"
                    );
                    println!("{:-<80}", "");
                    for s in &stories {
                        println!(
                            "{:<6} {:<12} {:>6} {:>6} {:>6} {:>6}  {}",
                            s.id,
                            s.idiom,
                            s.scene_count,
                            s.image_count,
                            s.audio_count,
                            s.video_count,
                            s.preview.replace('\n', " ")
                        );
                    }
                    println!("Total: {} stories", stories.len());
                }
            }
        }

        StoryCommands::Show { idiom, format } => match catalog.get_story(&idiom).await? {
            Some(story) => match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&story)?),
                OutputFormat::Human => print_story(&story),
            },
            None => println!("No story for '{}'", idiom),
        },

        StoryCommands::Delete { idiom } => {
            if catalog.delete_story(&idiom).await? {
                println!("Deleted '{}'", idiom);
            } else {
                println!("No story for '{}'", idiom);
            }
        }
    }
    Ok(())
}

/// Print storage totals.
pub async fn show_stats(services: &Services, format: OutputFormat) -> CliResult {
    let stats = services.catalog().storage_stats().await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Human => print_stats(&stats),
    }
    Ok(())
}

fn print_story(story: &StoryRecord) {
    println!("{} (id {})", story.idiom, story.id);
    println!("Created {}, updated {}", story.created_at, story.updated_at);
    println!("{:-<60}", "");
    println!("{}", story.text);
    println!("{:-<60}", "");
    for scene in &story.scenes {
        println!("Scene {}: {}", scene.order, scene.text);
    }
    for image in &story.images {
        print_media("Image", image);
    }
    if let Some(audio) = &story.audio {
        print_media("Audio", audio);
    }
    if let Some(video) = &story.video {
        print_media("Video", video);
    }
}

fn print_media(label: &str, media: &MediaRecord) {
    match media.duration_secs {
        Some(secs) => println!(
            "{:<6} {} ({} bytes, {:.1}s)",
            label,
            media.path.display(),
            media.size_bytes,
            secs
        ),
        None => println!("{:<6} {} ({} bytes)", label, media.path.display(), media.size_bytes),
    }
}

fn print_stats(stats: &StorageStats) {
    println!("Stories: {}", stats.stories);
    println!("Scenes:  {}", stats.scenes);
    println!("Images:  {} ({} bytes)", stats.images.count, stats.images.bytes);
    println!("Audio:   {} ({} bytes)", stats.audio.count, stats.audio.bytes);
    println!("Videos:  {} ({} bytes)", stats.videos.count, stats.videos.bytes);
    println!("Total:   {:.2} MiB", stats.total_mib());
}
