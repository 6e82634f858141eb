//! Client and task configuration.

use std::{env, time::Duration};

use bon::bon;

use crate::{
    http::{DEFAULT_RETRY_DELAY, DEFAULT_RETRY_NUMBER},
    logs::{MAX_LOG_BATCH_PAYLOAD_SIZE, MAX_LOG_BATCH_SIZE},
    tasks::{
        DEFAULT_SHUTDOWN_TIMEOUT, DEFAULT_TASK_TIMEOUT, DEFAULT_TASK_TRIGGER_INTERVAL,
        DEFAULT_TASK_TRIGGER_NUM,
    },
};

/// Launch mode used when none is given.
pub const DEFAULT_LAUNCH_MODE: &str = "DEFAULT";

/// Connection settings for a ReportPortal instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) endpoint: String,
    pub(crate) project: String,
    pub(crate) api_key: Option<String>,
    pub(crate) max_retry_number: u32,
    pub(crate) base_retry_delay: Duration,
    pub(crate) connect_timeout: Duration,
    pub(crate) read_timeout: Duration,
    pub(crate) keepalive_timeout: Option<Duration>,
    pub(crate) max_pool_size: usize,
    pub(crate) verify_ssl: bool,
    pub(crate) log_batch_size: usize,
    pub(crate) log_batch_payload_limit: usize,
    pub(crate) mode: String,
    pub(crate) truncate_attributes: bool,
    pub(crate) is_skipped_an_issue: bool,
}

#[bon]
impl ClientConfig {
    #[allow(missing_docs)]
    #[builder]
    pub fn new(
        /// Base URL of the ReportPortal instance, e.g. `https://rp.example.com`.
        endpoint: impl Into<String>,
        /// Project name.
        project: impl Into<String>,
        /// API key, sent as a bearer token.
        api_key: Option<String>,
        /// How many times a failed request is retried.
        #[builder(default = DEFAULT_RETRY_NUMBER)]
        max_retry_number: u32,
        /// Base delay between retries, scaled by the retry class.
        #[builder(default = DEFAULT_RETRY_DELAY)]
        base_retry_delay: Duration,
        #[builder(default = Duration::from_secs(10))] connect_timeout: Duration,
        #[builder(default = Duration::from_secs(10))] read_timeout: Duration,
        /// How long idle pooled connections are kept.
        keepalive_timeout: Option<Duration>,
        /// Maximum number of idle connections kept per host.
        #[builder(default = 50)]
        max_pool_size: usize,
        /// Verify the server certificate.
        #[builder(default = true)]
        verify_ssl: bool,
        /// Maximum number of log entries sent in one request.
        #[builder(default = MAX_LOG_BATCH_SIZE)]
        log_batch_size: usize,
        /// Maximum estimated size of one log request, in bytes.
        #[builder(default = MAX_LOG_BATCH_PAYLOAD_SIZE)]
        log_batch_payload_limit: usize,
        /// Launch mode, `DEFAULT` or `DEBUG`.
        #[builder(default = DEFAULT_LAUNCH_MODE.to_owned(), into)]
        mode: String,
        /// Truncate attribute values which are too long.
        #[builder(default = true)]
        truncate_attributes: bool,
        /// Treat skipped items as issues.
        #[builder(default = true)]
        is_skipped_an_issue: bool,
    ) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_owned(),
            project: project.into(),
            api_key,
            max_retry_number,
            base_retry_delay,
            connect_timeout,
            read_timeout,
            keepalive_timeout,
            max_pool_size,
            verify_ssl,
            log_batch_size,
            log_batch_payload_limit,
            mode,
            truncate_attributes,
            is_skipped_an_issue,
        }
    }

    /// Build a config from `RP_ENDPOINT`, `RP_PROJECT` and, optionally, `RP_API_KEY`.
    ///
    /// Returns `None` when the endpoint or project is missing.
    pub fn from_env() -> Option<Self> {
        let endpoint = env::var("RP_ENDPOINT").ok()?;
        let project = env::var("RP_PROJECT").ok()?;
        Some(
            Self::builder()
                .endpoint(endpoint)
                .project(project)
                .maybe_api_key(env::var("RP_API_KEY").ok())
                .build(),
        )
    }

    /// Base URL of the ReportPortal instance, without a trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Project name.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Launch mode.
    pub fn mode(&self) -> &str {
        &self.mode
    }
}

/// Timeouts and trigger settings for sync-over-async clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct TaskConfig {
    pub(crate) task_timeout: Duration,
    pub(crate) shutdown_timeout: Duration,
    pub(crate) trigger_num: usize,
    pub(crate) trigger_interval: Duration,
}

#[bon]
impl TaskConfig {
    #[allow(missing_docs)]
    #[builder]
    pub fn new(
        /// How long to wait for a single task, or a triggered batch of tasks.
        #[builder(default = DEFAULT_TASK_TIMEOUT)]
        task_timeout: Duration,
        /// How long to wait for all outstanding tasks when finishing.
        #[builder(default = DEFAULT_SHUTDOWN_TIMEOUT)]
        shutdown_timeout: Duration,
        /// Number of tasks which triggers running a batch.
        #[builder(default = DEFAULT_TASK_TRIGGER_NUM)]
        trigger_num: usize,
        /// Time since the last run which triggers running a batch.
        #[builder(default = DEFAULT_TASK_TRIGGER_INTERVAL)]
        trigger_interval: Duration,
    ) -> Self {
        Self {
            task_timeout,
            shutdown_timeout,
            trigger_num,
            trigger_interval,
        }
    }

    /// How long to wait for a single task.
    pub fn task_timeout(&self) -> Duration {
        self.task_timeout
    }

    /// How long to wait for all outstanding tasks when finishing.
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            task_timeout: DEFAULT_TASK_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            trigger_num: DEFAULT_TASK_TRIGGER_NUM,
            trigger_interval: DEFAULT_TASK_TRIGGER_INTERVAL,
        }
    }
}
