//! Poll-until-ready combinator shared by every provisioning wait.

use crate::utils::progress::ProgressBar;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// How often to poll and how long to keep trying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl WaitPolicy {
    pub const fn new(interval: Duration, max_wait: Duration) -> Self {
        Self { interval, max_wait }
    }
}

#[derive(Debug, Error)]
pub enum WaitError<E> {
    #[error("timed out after {}s", elapsed.as_secs())]
    TimedOut { elapsed: Duration, polls: usize },

    #[error("poll failed: {0}")]
    Fetch(E),
}

/// Poll `fetch` every `policy.interval` until `is_ready` accepts the value.
///
/// Each tick sleeps first and then fetches, so the caller is expected to have
/// checked the current state already. `fetch` may return `None` when the
/// entity is not visible yet. Once a tick fails the predicate with at least
/// `policy.max_wait` elapsed, the wait ends with [`WaitError::TimedOut`].
pub async fn wait_until<T, E, F, Fut, P>(
    label: &str,
    policy: WaitPolicy,
    mut fetch: F,
    is_ready: P,
) -> Result<T, WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    P: Fn(&T) -> bool,
{
    let started = Instant::now();
    let spinner = ProgressBar::new_spinner(label);
    let mut polls = 0usize;

    let outcome = loop {
        tokio::time::sleep(policy.interval).await;
        polls += 1;
        spinner.update(polls);

        match fetch().await {
            Ok(Some(value)) if is_ready(&value) => break Ok(value),
            Ok(_) => {}
            Err(e) => break Err(WaitError::Fetch(e)),
        }

        let elapsed = started.elapsed();
        if elapsed >= policy.max_wait {
            break Err(WaitError::TimedOut { elapsed, polls });
        }
        tracing::debug!(
            entity = label,
            polls,
            elapsed_secs = elapsed.as_secs(),
            "still waiting"
        );
    };

    spinner.finish_and_clear();
    outcome
}
