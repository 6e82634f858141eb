use std::sync::Arc;

use bon::bon;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    config::ClientConfig,
    context,
    error::HttpResult,
    http::BlockingRetryingSession,
    logs::{log_batch_body, LogBatcher, LogLevel, LogRequest, RpFile},
    model::{
        ItemFinishRequest, ItemStartRequest, LaunchFinishRequest, LaunchStartRequest, RpResponse,
    },
};

use super::{api::json_body, urls::ApiUrls};

/// Synchronous ReportPortal client. Every call blocks until the request completes.
///
/// Like [`AsyncClient`](super::AsyncClient), failures are logged and returned as `None`.
/// Log entries are batched and sent once a batch fills up, or on [`BlockingClient::close`].
#[derive(Debug, Clone)]
pub struct BlockingClient {
    config: Arc<ClientConfig>,
    urls: Arc<ApiUrls>,
    session: BlockingRetryingSession,
    log_batcher: Arc<LogBatcher<LogRequest>>,
    launch_uuid: Option<String>,
    own_launch: bool,
    item_stack: Vec<String>,
}

#[bon]
impl BlockingClient {
    /// Create a client and its HTTP session.
    pub fn new(config: ClientConfig) -> HttpResult<Self> {
        let session = BlockingRetryingSession::from_config(&config)?;
        Ok(Self::with_session(config, session))
    }

    /// Create a client using an existing session.
    pub fn with_session(config: ClientConfig, session: BlockingRetryingSession) -> Self {
        let log_batcher = LogBatcher::new(config.log_batch_size, config.log_batch_payload_limit);
        Self {
            urls: Arc::new(ApiUrls::new(&config)),
            config: Arc::new(config),
            session,
            log_batcher: Arc::new(log_batcher),
            launch_uuid: None,
            own_launch: true,
            item_stack: Vec::new(),
        }
    }

    /// Report into a launch started elsewhere. The client will neither start nor finish its own.
    pub fn with_launch_uuid(mut self, launch_uuid: impl Into<String>) -> Self {
        self.launch_uuid = Some(launch_uuid.into());
        self.own_launch = false;
        self
    }

    /// The connection settings.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The launch, if one was started or given.
    pub fn launch_uuid(&self) -> Option<&str> {
        self.launch_uuid.as_deref()
    }

    /// The innermost item which was started and not finished.
    pub fn current_item(&self) -> Option<&str> {
        self.item_stack.last().map(String::as_str)
    }

    /// Make this client (a clone of it) the active one on the calling thread.
    pub fn register_active(&self) {
        context::set_active_client(Arc::new(self.clone()));
    }

    fn send(
        &self,
        operation: &'static str,
        request: HttpResult<reqwest::blocking::Response>,
    ) -> Option<RpResponse> {
        let response = match request {
            Ok(response) => response,
            Err(error) => {
                warn!(operation, %error, "ReportPortal request failed");
                return None;
            }
        };
        match RpResponse::read_blocking(response) {
            Ok(response) => Some(response),
            Err(error) => {
                warn!(operation, %error, "Unable to read the ReportPortal response");
                None
            }
        }
    }

    fn launch(&self, operation: &'static str) -> Option<String> {
        if self.launch_uuid.is_none() {
            warn!(operation, "Attempt to report before a launch was started");
        }
        self.launch_uuid.clone()
    }

    /// Start a launch, unless this client was given one. Returns its UUID.
    pub fn start_launch(&mut self, request: LaunchStartRequest) -> Option<String> {
        if !self.own_launch {
            return self.launch_uuid.clone();
        }
        let request = request.prepare(&self.config.mode, self.config.truncate_attributes);
        let body = json_body("start_launch", &request)?;
        let response = self.send("start_launch", self.session.post(&self.urls.launch(), &body))?;

        let launch_uuid = response.id();
        match &launch_uuid {
            Some(launch_uuid) => debug!(%launch_uuid, "Launch started"),
            None => warn!(response = %response.json(), "start_launch: invalid response"),
        }
        self.launch_uuid = launch_uuid.clone();
        launch_uuid
    }

    /// Send pending logs and finish the launch, if this client started it.
    pub fn finish_launch(&mut self, request: LaunchFinishRequest) -> Option<String> {
        self.close();
        if !self.own_launch {
            debug!("Not finishing a launch this client did not start");
            return None;
        }
        let launch_uuid = self.launch("finish_launch")?;
        let request = request.prepare(self.config.truncate_attributes);
        let body = json_body("finish_launch", &request)?;
        let url = self.urls.launch_finish(&launch_uuid);
        let response = self.send("finish_launch", self.session.put(&url, &body))?;

        let message = response.message().map(str::to_owned);
        debug!(%launch_uuid, ?message, "Launch finished");
        message
    }

    /// Start an item, as a child of `parent` when given, and make it the current item.
    pub fn start_test_item(
        &mut self,
        request: ItemStartRequest,
        parent: Option<&str>,
    ) -> Option<String> {
        let launch_uuid = self.launch("start_test_item")?;
        let request = request.prepare(launch_uuid, self.config.truncate_attributes);
        let body = json_body("start_test_item", &request)?;
        let url = self.urls.item(parent);
        let response = self.send("start_test_item", self.session.post(&url, &body))?;

        let Some(item_id) = response.id() else {
            warn!(response = %response.json(), "start_test_item: invalid response");
            return None;
        };
        debug!(%item_id, "Test item started");
        self.item_stack.push(item_id.clone());
        Some(item_id)
    }

    /// Finish an item and drop the current item.
    pub fn finish_test_item(
        &mut self,
        item_id: &str,
        request: ItemFinishRequest,
    ) -> Option<String> {
        self.item_stack.pop();
        let launch_uuid = self.launch("finish_test_item")?;
        let request = request.prepare(
            launch_uuid,
            self.config.is_skipped_an_issue,
            self.config.truncate_attributes,
        );
        let body = json_body("finish_test_item", &request)?;
        let url = self.urls.item(Some(item_id));
        let response = self.send("finish_test_item", self.session.put(&url, &body))?;

        let message = response.message().map(str::to_owned);
        debug!(%item_id, ?message, "Test item finished");
        message
    }

    /// Launch details.
    pub fn get_launch_info(&self) -> Option<Value> {
        let launch_uuid = self.launch("get_launch_info")?;
        let url = self.urls.launch_by_uuid(&launch_uuid);
        let response = self.send("get_launch_info", self.session.get(&url))?;
        if !response.is_success() {
            warn!(
                %launch_uuid,
                status = %response.status(),
                "get_launch_info: failed to fetch launch info"
            );
            return None;
        }
        Some(response.into_json())
    }

    /// Numeric id of the launch, as used by the web UI.
    pub fn get_launch_ui_id(&self) -> Option<i64> {
        self.get_launch_info()?.get("id")?.as_i64()
    }

    /// Address of the launch in the web UI.
    pub fn get_launch_ui_url(&self) -> Option<String> {
        let launch_info = self.get_launch_info()?;
        let launch_id = launch_info.get("id")?.as_i64()?;
        let mode = launch_info
            .get("mode")
            .and_then(Value::as_str)
            .unwrap_or(&self.config.mode);
        Some(self.urls.launch_ui(launch_id, Some(mode)))
    }

    /// Settings of the project.
    pub fn get_project_settings(&self) -> Option<Value> {
        let url = self.urls.settings();
        self.send("get_project_settings", self.session.get(&url))
            .map(RpResponse::into_json)
    }

    /// Add a log entry to the current batch, sending the batch if this entry completed it.
    ///
    /// Returns the server's messages when a batch was sent.
    #[builder]
    pub fn log(
        &self,
        /// Log message.
        message: impl Into<String>,
        /// Severity.
        level: Option<LogLevel>,
        /// Attachment.
        attachment: Option<RpFile>,
        /// Item the entry belongs to. Launch-level when absent.
        #[builder(into)]
        item_id: Option<String>,
        /// Time in epoch milliseconds, now when absent.
        #[builder(into)]
        time: Option<String>,
    ) -> Option<Vec<String>> {
        let launch_uuid = self.launch("log")?;
        let mut entry = LogRequest::new(Some(launch_uuid), message)
            .with_item(item_id)
            .with_level(level)
            .with_file(attachment);
        if let Some(time) = time {
            entry = entry.with_time(time);
        }
        let batch = self.log_batcher.append(entry)?;
        self.send_logs(&batch)
    }

    fn send_logs(&self, batch: &[LogRequest]) -> Option<Vec<String>> {
        let body = match log_batch_body(batch) {
            Ok(body) => body,
            Err(error) => {
                warn!(%error, "Unable to serialize the log batch");
                return None;
            }
        };
        let response = self.send("log_batch", self.session.post(&self.urls.log(), &body))?;
        Some(response.messages())
    }

    /// Send any logs still waiting in the batcher. The launch is left as it is.
    pub fn close(&self) {
        if let Some(batch) = self.log_batcher.flush() {
            debug!(entries = batch.len(), "Sending remaining logs");
            if let Some(messages) = self.send_logs(&batch) {
                debug!(?messages, "Remaining logs sent");
            }
        }
    }
}
