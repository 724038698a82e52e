use std::time::Duration;

use tracing::warn;

/// Backoff for idempotent reads. Commands are never retried.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Wait before each retry; its length is the retry count.
    pub delays: Vec<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delays: [1, 2, 4].map(Duration::from_secs).to_vec(),
        }
    }
}

impl RetryConfig {
    /// Single attempt.
    pub fn none() -> Self {
        Self { delays: Vec::new() }
    }
}

/// GET `url`, retrying network errors and 5xx responses with backoff.
///
/// Returns the first non-5xx response, or the last outcome once the delays
/// are used up.
pub async fn retry_get(
    client: &reqwest::Client,
    url: &str,
    config: &RetryConfig,
) -> reqwest::Result<reqwest::Response> {
    let max_attempts = config.delays.len() + 1;
    let mut attempt = 0;
    loop {
        let delay = config.delays.get(attempt).copied();
        match (client.get(url).send().await, delay) {
            (Ok(resp), Some(delay)) if resp.status().is_server_error() => {
                warn!(
                    "GET attempt {}/{} failed (HTTP {}), retrying in {:?}",
                    attempt + 1,
                    max_attempts,
                    resp.status(),
                    delay,
                );
                tokio::time::sleep(delay).await;
            }
            (Err(e), Some(delay)) => {
                warn!(
                    "GET attempt {}/{} failed ({}), retrying in {:?}",
                    attempt + 1,
                    max_attempts,
                    e,
                    delay,
                );
                tokio::time::sleep(delay).await;
            }
            (outcome, _) => return outcome,
        }
        attempt += 1;
    }
}
