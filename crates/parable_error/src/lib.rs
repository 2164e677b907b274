//! Error types for the Parable pipeline.
//!
//! This crate provides the error taxonomy shared by every Parable crate.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! Which families are fatal to a request:
//!
//! | Family | Fatal |
//! |---|---|
//! | [`InputError`] | always |
//! | [`GeneratorError`] | only once every fallback is exhausted |
//! | [`StorageError`] / [`DatabaseError`] | always for the operation |
//! | [`CacheError`] | never, callers log and continue |
//! | [`AudioError`] | only when no segment could be merged |
//! | [`SyncError`] | always |
//!
//! # Examples
//!
//! ```
//! use parable_error::{InputError, InputErrorKind, ParableResult};
//!
//! fn check(idiom: &str) -> ParableResult<()> {
//!     if idiom.is_empty() {
//!         Err(InputError::new(InputErrorKind::EmptyIdiom))?
//!     }
//!     Ok(())
//! }
//!
//! assert!(check("").is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod audio;
mod cache;
mod config;
#[cfg(feature = "database")]
mod database;
mod error;
mod generator;
mod http;
mod input;
mod storage;
mod sync;

pub use audio::{AudioError, AudioErrorKind};
pub use cache::{CacheError, CacheErrorKind};
pub use config::ConfigError;
#[cfg(feature = "database")]
pub use database::{DatabaseError, DatabaseErrorKind};
pub use error::{ParableError, ParableErrorKind, ParableResult};
pub use generator::{GeneratorError, GeneratorErrorKind};
pub use http::HttpError;
pub use input::{InputError, InputErrorKind};
pub use storage::{StorageError, StorageErrorKind};
pub use sync::{SyncError, SyncErrorKind};
