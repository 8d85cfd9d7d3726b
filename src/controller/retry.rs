//! Bounded retry for single Kubernetes API calls

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Fixed-delay retry configuration
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Retries after the first attempt before the error is returned
    pub max_retries: u32,
    /// Delay between two attempts
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            delay: Duration::from_millis(1000),
        }
    }
}

/// Run `operation` until it succeeds or the retries are spent.
///
/// `operation` is called once per attempt and must build a new request each
/// time. The last error is returned unchanged.
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut retries = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if retries >= config.max_retries => return Err(e),
            Err(e) => {
                retries += 1;
                warn!(
                    attempt = retries,
                    max_retries = config.max_retries,
                    error = %e,
                    "API call failed, retrying"
                );
                tokio::time::sleep(config.delay).await;
            }
        }
    }
}
