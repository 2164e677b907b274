//! Deadline and cancellation wrapper for external collaborator calls.

use parable_error::{GeneratorError, GeneratorErrorKind, ParableResult};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Run an external call under a deadline and a cancellation token.
///
/// Elapsed deadlines become [`GeneratorErrorKind::Timeout`] and cancellation
/// becomes [`GeneratorErrorKind::Cancelled`], so callers can treat both as an
/// ordinary tier or stage failure.
///
/// # Examples
///
/// ```
/// use parable_core::bounded;
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cancel = CancellationToken::new();
/// let value = bounded("echo", Duration::from_secs(1), &cancel, async { Ok(7) })
///     .await
///     .unwrap();
/// assert_eq!(value, 7);
/// # }
/// ```
pub async fn bounded<T, F>(
    label: &str,
    timeout: Duration,
    cancel: &CancellationToken,
    call: F,
) -> ParableResult<T>
where
    F: Future<Output = ParableResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!(call = label, "External call cancelled");
            Err(GeneratorError::new(GeneratorErrorKind::Cancelled).into())
        }
        outcome = tokio::time::timeout(timeout, call) => match outcome {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(call = label, timeout = ?timeout, "External call timed out");
                Err(GeneratorError::new(GeneratorErrorKind::Timeout(timeout)).into())
            }
        },
    }
}
