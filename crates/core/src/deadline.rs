//! Bounding asynchronous calls by a wall-clock limit.

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::time::Duration;

/// The error returned when a call doesn't finish within its limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeadlineElapsed {
    limit: Duration,
}

impl DeadlineElapsed {
    /// Returns the limit that was exceeded.
    #[inline]
    pub fn limit(&self) -> Duration {
        self.limit
    }
}

impl Display for DeadlineElapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call did not finish within {}s", self.limit.as_secs_f32())
    }
}

impl StdError for DeadlineElapsed {}

/// Runs `fut` to completion unless `limit` elapses first.
///
/// When the limit elapses, `fut` is dropped, which cancels any work it
/// still has in flight. The timer is released on both paths, so nothing
/// outlives the call.
pub async fn call_with_deadline<F: Future>(
    limit: Duration,
    fut: F,
) -> Result<F::Output, DeadlineElapsed> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| DeadlineElapsed { limit })
}

#[cfg(test)]
mod tests {
    use std::future::pending;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use tokio::time::{Instant, sleep};

    use super::*;

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_finishes_in_time() {
        let result = call_with_deadline(Duration::from_secs(30), async {
            sleep(Duration::from_secs(5)).await;
            "done"
        })
        .await;
        assert_eq!(result, Ok("done"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_cancels_work() {
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = DropFlag(Arc::clone(&dropped));

        let start = Instant::now();
        let result = call_with_deadline(Duration::from_secs(30), async move {
            let _flag = flag;
            pending::<()>().await
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.limit(), Duration::from_secs(30));
        assert_eq!(start.elapsed(), Duration::from_secs(30));
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_calls_are_independent() {
        let limit = Duration::from_secs(10);
        assert!(
            call_with_deadline(limit, sleep(Duration::from_secs(60)))
                .await
                .is_err()
        );

        // A previous expiry must not leak into the next call.
        let start = Instant::now();
        let result = call_with_deadline(limit, async {
            sleep(Duration::from_secs(9)).await;
            1
        })
        .await;
        assert_eq!(result, Ok(1));
        assert_eq!(start.elapsed(), Duration::from_secs(9));
    }
}
