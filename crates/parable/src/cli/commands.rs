//! CLI command definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parable - turn an idiom into a narrated story video
#[derive(Parser, Debug)]
#[command(name = "parable")]
#[command(about = "Turn an idiom into a narrated, illustrated story video", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Read configuration from this file instead of the default layers
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the story video for an idiom
    Run {
        /// The idiom, e.g. 守株待兔
        idiom: String,

        /// Transition between images (see `parable transitions`)
        #[arg(long)]
        transition: Option<String>,

        /// Composer: simple or enhanced
        #[arg(long)]
        composer: Option<String>,

        /// Ignore the cached story and generate a new one
        #[arg(long)]
        regenerate: bool,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Browse and manage cataloged stories
    #[command(subcommand)]
    Stories(StoryCommands),

    /// Show catalog storage totals
    Stats {
        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Artifact cache maintenance
    #[command(subcommand)]
    Cache(CacheCommands),

    /// List available transitions
    Transitions,
}

/// Story catalog subcommands
#[derive(Subcommand, Debug)]
pub enum StoryCommands {
    /// List the most recently updated stories
    List {
        /// Maximum number of stories to display
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Show one story with its scenes and media
    Show {
        /// The idiom
        idiom: String,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Delete a story and its media files
    Delete {
        /// The idiom
        idiom: String,
    },
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Remove cached entries
    Clear {
        /// Only remove stages starting with this prefix (story, scenes, images, audio)
        #[arg(long)]
        prefix: Option<String>,
    },
}

/// Output format options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}
