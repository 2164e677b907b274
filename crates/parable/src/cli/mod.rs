//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the parable binary.

mod commands;
mod maintenance;
mod run;
mod stories;

pub use commands::{Cli, Commands};
pub use maintenance::{handle_cache_command, list_transitions};
pub use run::run_story;
pub use stories::{handle_story_command, show_stats};

/// Result type of command handlers.
pub type CliResult = Result<(), Box<dyn std::error::Error>>;
