use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::execute::error::ExecuteError;
use crate::execute::fetcher::StepFetcher;
use crate::execute::types::ExecuteResponse;

/// Retry policy for steps whose payload the server has not materialized yet.
/// The source polled forever; a deadline keeps a stuck server from pinning
/// the process.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 120,
        }
    }
}

/// Re-fetches `url` until `steps[index]` carries data, waiting `interval`
/// between attempts. Data already present on the first fetch returns
/// immediately with no delay.
pub async fn poll_until_has_data<F>(
    fetcher: &F,
    url: &Url,
    index: usize,
    config: PollConfig,
    cancel: &CancellationToken,
) -> Result<ExecuteResponse, ExecuteError>
where
    F: StepFetcher + ?Sized,
{
    let attempts = config.max_attempts.max(1);
    for attempt in 1..=attempts {
        if cancel.is_cancelled() {
            return Err(ExecuteError::Cancelled);
        }

        let response = fetcher.fetch_steps(url).await?;
        let ready = response
            .steps
            .get(index)
            .is_some_and(|step| step.has_data());
        if ready {
            return Ok(response);
        }

        if attempt == attempts {
            break;
        }

        debug!(
            target: "execute::poll",
            index,
            attempt,
            "step data not ready, retrying"
        );

        tokio::select! {
            _ = cancel.cancelled() => return Err(ExecuteError::Cancelled),
            _ = tokio::time::sleep(config.interval) => {}
        }
    }

    Err(ExecuteError::PollTimeout { index, attempts })
}
