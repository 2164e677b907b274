//! Story run command handler.

use super::CliResult;
use super::commands::OutputFormat;
use parable::{CancellationToken, PipelineOutcome, RunOptions, Services};

/// Run the pipeline for `idiom` and print the outcome.
pub async fn run_story(
    services: &Services,
    idiom: &str,
    transition: Option<String>,
    composer: Option<String>,
    regenerate: bool,
    format: OutputFormat,
) -> CliResult {
    let pipeline = services.story_pipeline()?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling run");
            on_interrupt.cancel();
        }
    });

    let options = RunOptions {
        transition,
        composer,
        cancel,
    };
    let outcome = if regenerate {
        pipeline.regenerate(idiom, options).await?
    } else {
        pipeline.run(idiom, options).await?
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Human => print_outcome(&outcome),
    }
    Ok(())
}

fn print_outcome(outcome: &PipelineOutcome) {
    println!("Story '{}' (id {})", outcome.idiom, outcome.story_id);
    println!("{:-<60}", "");
    println!("Scenes:      {}", outcome.scene_count);
    println!("Images:      {}", outcome.images.len());
    for skipped in &outcome.skipped_images {
        println!("  skipped scene {}: {}", skipped.index + 1, skipped.reason);
    }
    println!(
        "Narration:   {} ({:.1}s)",
        outcome.audio.path.display(),
        outcome.audio.duration_secs.unwrap_or_default()
    );
    println!(
        "Video:       {} ({:.1}s, {}, {})",
        outcome.video.path.display(),
        outcome.report.duration_secs,
        outcome.report.transition,
        outcome.report.action
    );
}
