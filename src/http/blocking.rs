use std::thread;

use reqwest::{blocking::Response, Method};
use tracing::debug_span;

use crate::{config::ClientConfig, error::HttpResult};

use super::{
    body::Body,
    build_blocking_client,
    retry::{Attempts, RetryPolicy, Step},
};

/// A blocking HTTP session which retries failed requests, putting the thread to sleep between
/// attempts.
///
/// Must not be created or used from within an async context.
#[derive(Debug, Clone)]
pub struct BlockingRetryingSession {
    client: reqwest::blocking::Client,
    policy: RetryPolicy,
}

impl BlockingRetryingSession {
    /// Wrap an existing client.
    pub fn new(client: reqwest::blocking::Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Build a client from the connection settings.
    pub fn from_config(config: &ClientConfig) -> HttpResult<Self> {
        Ok(Self::new(build_blocking_client(config)?, RetryPolicy::from(config)))
    }

    /// The retry policy.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Send a `GET` request.
    pub fn get(&self, url: &str) -> HttpResult<Response> {
        self.request(Method::GET, url, &Body::Empty)
    }

    /// Send a `POST` request.
    pub fn post(&self, url: &str, body: &Body) -> HttpResult<Response> {
        self.request(Method::POST, url, body)
    }

    /// Send a `PUT` request.
    pub fn put(&self, url: &str, body: &Body) -> HttpResult<Response> {
        self.request(Method::PUT, url, body)
    }

    /// Send a request, retrying according to the policy.
    pub fn request(&self, method: Method, url: &str, body: &Body) -> HttpResult<Response> {
        let _span = debug_span!("http_request", %method, url).entered();
        let mut attempts = Attempts::new(self.policy);
        loop {
            let outcome = body
                .apply_blocking(self.client.request(method.clone(), url))
                .and_then(|request| request.send());
            match attempts.next(outcome) {
                Step::Done(result) => return result,
                Step::RetryAfter(delay) => {
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                }
            }
        }
    }
}
