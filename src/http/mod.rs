//! HTTP transport which retries failed requests.
//!
//! Two realizations share one retry policy: [`RetryingSession`] suspends between attempts and
//! [`BlockingRetryingSession`] blocks the calling thread. Each request is retried on retryable
//! statuses (with the response returned once retries run out) and on connection errors (with the
//! errors returned as an aggregate once retries run out). Any other error is returned
//! immediately.

mod blocking;
mod body;
mod retry;
mod session;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::{
    config::ClientConfig,
    error::{HttpError, HttpResult},
};

pub use blocking::BlockingRetryingSession;
pub use body::{Body, Part};
pub use retry::{
    RetryClass, RetryPolicy, DEFAULT_RETRY_DELAY, DEFAULT_RETRY_NUMBER, RETRY_STATUSES,
    THROTTLING_STATUSES,
};
pub use session::RetryingSession;

impl From<&ClientConfig> for RetryPolicy {
    fn from(config: &ClientConfig) -> Self {
        RetryPolicy::new(config.max_retry_number, config.base_retry_delay)
    }
}

fn default_headers(config: &ClientConfig) -> HttpResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = &config.api_key {
        let mut value = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| HttpError::InvalidApiKey)?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}

/// Applies the connection settings to either client builder flavour.
macro_rules! configure {
    ($builder:expr, $config:expr, $headers:expr) => {{
        let mut builder = $builder
            .default_headers($headers)
            .connect_timeout($config.connect_timeout)
            .timeout($config.connect_timeout + $config.read_timeout)
            .pool_max_idle_per_host($config.max_pool_size)
            .danger_accept_invalid_certs(!$config.verify_ssl);
        if let Some(keepalive) = $config.keepalive_timeout {
            builder = builder.pool_idle_timeout(keepalive);
        }
        builder.build().map_err(HttpError::Request)
    }};
}

pub(crate) fn build_client(config: &ClientConfig) -> HttpResult<reqwest::Client> {
    let headers = default_headers(config)?;
    configure!(reqwest::Client::builder(), config, headers)
}

/// # Panics
///
/// When called from within an async context.
pub(crate) fn build_blocking_client(
    config: &ClientConfig,
) -> HttpResult<reqwest::blocking::Client> {
    let headers = default_headers(config)?;
    configure!(reqwest::blocking::Client::builder(), config, headers)
}
