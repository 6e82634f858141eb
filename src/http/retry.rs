use std::{mem, time::Duration};

use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::error::{HttpError, HttpResult};

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRY_NUMBER: u32 = 5;
/// Default base delay between retries.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(5);

/// Statuses which mean the server asks us to slow down.
pub const THROTTLING_STATUSES: [u16; 2] = [425, 429];
/// Statuses which are retried.
pub const RETRY_STATUSES: [u16; 8] = [408, 425, 429, 500, 502, 503, 504, 507];

/// Why a request is retried. The value scales the base delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// A retryable server status which is not throttling.
    ServerError = 1,
    /// The connection could not be made or timed out.
    ConnectionError = 2,
    /// A throttling status.
    Throttling = 3,
}

impl RetryClass {
    /// Multiplier applied to the base delay.
    pub fn multiplier(self) -> u32 {
        self as u32
    }
}

/// When to retry a request, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retry_number: u32,
    base_retry_delay: Duration,
}

impl RetryPolicy {
    /// Retry up to `max_retry_number` times after the first attempt.
    pub fn new(max_retry_number: u32, base_retry_delay: Duration) -> Self {
        Self {
            max_retry_number,
            base_retry_delay,
        }
    }

    /// Number of retries after the first attempt.
    pub fn max_retry_number(&self) -> u32 {
        self.max_retry_number
    }

    /// Classify a response status. `None` means the response is returned as it is.
    pub fn classify_status(status: StatusCode) -> Option<RetryClass> {
        let code = status.as_u16();
        if THROTTLING_STATUSES.contains(&code) {
            Some(RetryClass::Throttling)
        } else if RETRY_STATUSES.contains(&code) {
            Some(RetryClass::ServerError)
        } else {
            None
        }
    }

    /// Classify a request error. `None` means the error is not retried.
    pub fn classify_error(error: &reqwest::Error) -> Option<RetryClass> {
        (error.is_connect() || error.is_timeout()).then_some(RetryClass::ConnectionError)
    }

    /// Delay after the attempt with index `attempt`:
    /// `((multiplier * base_ms) ^ attempt) / 1000` seconds, and nothing after the first attempt.
    pub fn delay(&self, attempt: u32, class: RetryClass) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let base_ms = f64::from(class.multiplier()) * self.base_retry_delay.as_secs_f64() * 1000.0;
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        Duration::try_from_secs_f64(base_ms.powi(exponent) / 1000.0).unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_NUMBER, DEFAULT_RETRY_DELAY)
    }
}

/// Something a request attempt can come back with.
pub(crate) trait HasStatus {
    fn status(&self) -> StatusCode;
}

impl HasStatus for reqwest::Response {
    fn status(&self) -> StatusCode {
        reqwest::Response::status(self)
    }
}

impl HasStatus for reqwest::blocking::Response {
    fn status(&self) -> StatusCode {
        reqwest::blocking::Response::status(self)
    }
}

/// What to do after an attempt.
#[derive(Debug)]
pub(crate) enum Step<R> {
    Done(HttpResult<R>),
    RetryAfter(Duration),
}

/// The retry loop's state, shared by the async and blocking transports which only differ in how
/// they send and sleep.
#[derive(Debug)]
pub(crate) struct Attempts {
    policy: RetryPolicy,
    attempt: u32,
    errors: Vec<reqwest::Error>,
}

impl Attempts {
    pub(crate) fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempt: 0,
            errors: Vec::new(),
        }
    }

    /// Record the outcome of the current attempt.
    pub(crate) fn next<R: HasStatus>(&mut self, outcome: reqwest::Result<R>) -> Step<R> {
        let attempt = self.attempt;
        self.attempt += 1;
        let last = attempt >= self.policy.max_retry_number;

        let class = match outcome {
            Ok(response) => match RetryPolicy::classify_status(response.status()) {
                None => return Step::Done(Ok(response)),
                Some(_) if last => {
                    warn!(
                        attempts = self.attempt,
                        status = %response.status(),
                        "Retries exhausted, returning the last response"
                    );
                    if self.errors.is_empty() {
                        return Step::Done(Ok(response));
                    }
                    return Step::Done(Err(self.aggregate()));
                }
                Some(class) => class,
            },
            Err(error) => match RetryPolicy::classify_error(&error) {
                None => return Step::Done(Err(HttpError::Request(error))),
                Some(class) => {
                    self.errors.push(error);
                    if last {
                        warn!(attempts = self.attempt, "Retries exhausted");
                        return Step::Done(Err(self.aggregate()));
                    }
                    class
                }
            },
        };

        let delay = self.policy.delay(attempt, class);
        debug!(attempt, retry_class = ?class, ?delay, "Retrying request");
        Step::RetryAfter(delay)
    }

    fn aggregate(&mut self) -> HttpError {
        let mut errors = mem::take(&mut self.errors);
        match (errors.pop(), errors.is_empty()) {
            (Some(error), true) => HttpError::Request(error),
            (Some(error), false) => {
                errors.push(error);
                HttpError::RetriesExhausted { errors }
            }
            (None, _) => HttpError::RetriesExhausted { errors },
        }
    }
}
