//! Cache and transition command handlers.

use super::CliResult;
use super::commands::CacheCommands;
use parable::{Services, TransitionRegistry};

/// Handle cache maintenance commands.
pub async fn handle_cache_command(services: &Services, cmd: CacheCommands) -> CliResult {
    match cmd {
        CacheCommands::Clear { prefix } => {
            let removed = services.cache().clear(prefix.as_deref()).await?;
            match prefix {
                Some(prefix) => println!("Removed {} cached '{}' entries", removed, prefix),
                None => println!("Removed {} cached entries", removed),
            }
        }
    }
    Ok(())
}

/// Print the registered transitions.
pub fn list_transitions() {
    for info in TransitionRegistry::with_defaults().list() {
        println!("{:<8} {}", info.name, info.description);
    }
}
