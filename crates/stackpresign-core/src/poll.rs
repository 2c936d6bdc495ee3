use std::time::{Duration, Instant};
use thiserror::Error;

/// Result of one readiness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState<T> {
    Pending,
    Done(T),
    Failed(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PollError {
    #[error("check failed after {attempts} attempt(s): {reason}")]
    Failed { attempts: u32, reason: String },
    #[error("timed out after {attempts} attempt(s) ({elapsed:?})")]
    TimedOut { attempts: u32, elapsed: Duration },
}

/// Run `check` every `interval` until it settles or `timeout` passes.
///
/// The check always runs at least once, and the final sleep is cut short so
/// the loop never waits past the deadline.
pub fn poll_until<T>(
    mut check: impl FnMut() -> PollState<T>,
    interval: Duration,
    timeout: Duration,
) -> Result<T, PollError> {
    let start = Instant::now();
    let deadline = start + timeout;
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match check() {
            PollState::Done(value) => {
                tracing::debug!("poll settled after {attempts} attempt(s)");
                return Ok(value);
            }
            PollState::Failed(reason) => return Err(PollError::Failed { attempts, reason }),
            PollState::Pending => {}
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(PollError::TimedOut {
                attempts,
                elapsed: now - start,
            });
        }
        std::thread::sleep(interval.min(deadline - now));
    }
}
