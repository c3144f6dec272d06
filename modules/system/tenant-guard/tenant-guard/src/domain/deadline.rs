//! Time bound for calls to external collaborators.

use std::future::Future;
use std::time::Duration;

/// Result of a call that may have run out of time.
#[derive(Debug)]
pub enum Bounded<T, E> {
    Done(T),
    Failed(E),
    TimedOut,
}

/// Run `call` for at most `limit`.
///
/// On timeout the future is dropped, so a late answer can never be applied.
pub async fn within<T, E, F>(limit: Duration, call: F) -> Bounded<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Bounded::Done(value),
        Ok(Err(e)) => Bounded::Failed(e),
        Err(_) => Bounded::TimedOut,
    }
}
