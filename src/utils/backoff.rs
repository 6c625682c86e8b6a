use std::time::Duration;

use tokio::time::sleep;
use tokio::time::timeout;
use tracing::debug;
use tracing::warn;

use crate::BackoffPolicy;
use crate::CoordinationError;
use crate::Result;

/// As soon as task has return we should return from this function
pub(crate) async fn task_with_timeout_and_exponential_backoff<F, T, P>(
    mut task: F,
    policy: BackoffPolicy,
) -> Result<P>
where
    F: FnMut() -> T,
    T: std::future::Future<Output = Result<P>>,
{
    let mut retries = 0;
    let mut current_delay = Duration::from_millis(policy.base_delay_ms);
    let timeout_duration = Duration::from_millis(policy.timeout_ms);
    let max_delay = Duration::from_millis(policy.max_delay_ms);
    let max_retries = policy.max_retries;

    let mut last_error = CoordinationError::SessionEstablishFailed { retries: max_retries }.into();
    while retries < max_retries {
        debug!("Attempt {} of {}", retries + 1, max_retries);
        match timeout(timeout_duration, task()).await {
            Ok(Ok(r)) => {
                return Ok(r); // Exit on success
            }
            Ok(Err(error)) => {
                warn!("failed with error: {:?}", &error);
                last_error = error;
            }
            Err(_e) => {
                warn!("Task timed out after {:?}", timeout_duration);
                last_error =
                    CoordinationError::Unreachable(format!("operation timed out after {timeout_duration:?}")).into();
            }
        };

        retries += 1;
        if retries < max_retries {
            debug!("Retrying in {:?}...", current_delay);
            sleep(current_delay).await;

            // Exponential backoff (double the delay each time)
            current_delay = (current_delay * 2).min(max_delay);
        } else {
            warn!("Task failed after {} retries", retries);
        }
    }
    Err(last_error) // Fallback error message if no task returns Ok
}
