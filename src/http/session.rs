use reqwest::{Method, Response};
use tracing::{debug_span, Instrument};

use crate::{config::ClientConfig, error::HttpResult};

use super::{
    body::Body,
    build_client,
    retry::{Attempts, RetryPolicy, Step},
};

/// An async HTTP session which retries failed requests, sleeping between attempts.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct RetryingSession {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl RetryingSession {
    /// Wrap an existing client.
    pub fn new(client: reqwest::Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Build a client from the connection settings.
    pub fn from_config(config: &ClientConfig) -> HttpResult<Self> {
        Ok(Self::new(build_client(config)?, RetryPolicy::from(config)))
    }

    /// The retry policy.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Send a `GET` request.
    pub async fn get(&self, url: &str) -> HttpResult<Response> {
        self.request(Method::GET, url, &Body::Empty).await
    }

    /// Send a `POST` request.
    pub async fn post(&self, url: &str, body: &Body) -> HttpResult<Response> {
        self.request(Method::POST, url, body).await
    }

    /// Send a `PUT` request.
    pub async fn put(&self, url: &str, body: &Body) -> HttpResult<Response> {
        self.request(Method::PUT, url, body).await
    }

    /// Send a request, retrying according to the policy.
    pub async fn request(&self, method: Method, url: &str, body: &Body) -> HttpResult<Response> {
        let span = debug_span!("http_request", %method, url);
        async {
            let mut attempts = Attempts::new(self.policy);
            loop {
                let outcome = match body.apply(self.client.request(method.clone(), url)) {
                    Ok(request) => request.send().await,
                    Err(error) => Err(error),
                };
                match attempts.next(outcome) {
                    Step::Done(result) => return result,
                    Step::RetryAfter(delay) => {
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }
        .instrument(span)
        .await
    }
}
