//! Built-in synthesis tiers.

mod command;
mod http;
mod synthetic;

pub use command::CommandSpeechTier;
pub use http::HttpSpeechTier;
pub use synthetic::SyntheticTier;
