use std::{future::Future, sync::Arc};

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{
    config::ClientConfig,
    error::HttpResult,
    http::{Body, RetryingSession},
    logs::{log_batch_body, AsyncLogRequest, LogRequest},
    model::{
        Attribute, IdRef, ItemFinishRequest, ItemStartRequest, LaunchFinishRequest,
        LaunchStartRequest, RpResponse,
    },
};

use super::urls::ApiUrls;

/// Stateless async client for the ReportPortal API.
///
/// Every operation returns `None` on failure, after logging a warning: reporting problems never
/// interrupt the code under test. Ids may be given while still pending, see [`IdRef`].
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct AsyncClient {
    config: Arc<ClientConfig>,
    urls: Arc<ApiUrls>,
    session: RetryingSession,
}

pub(crate) fn json_body<T: Serialize>(operation: &str, payload: &T) -> Option<Body> {
    match serde_json::to_value(payload) {
        Ok(json) => Some(Body::Json(json)),
        Err(error) => {
            warn!(operation, %error, "Unable to serialize the request");
            None
        }
    }
}

async fn resolve_id(operation: &str, id: &IdRef) -> Option<String> {
    let resolved = id.resolve().await;
    if resolved.is_none() {
        warn!(operation, "Attempt to make request for non-existent id");
    }
    resolved
}

impl AsyncClient {
    /// Create a client and its HTTP session.
    pub fn new(config: ClientConfig) -> HttpResult<Self> {
        let session = RetryingSession::from_config(&config)?;
        Ok(Self::with_session(config, session))
    }

    /// Create a client using an existing session.
    pub fn with_session(config: ClientConfig, session: RetryingSession) -> Self {
        Self {
            urls: Arc::new(ApiUrls::new(&config)),
            config: Arc::new(config),
            session,
        }
    }

    /// The connection settings.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn send(
        &self,
        operation: &'static str,
        request: impl Future<Output = HttpResult<reqwest::Response>>,
    ) -> Option<RpResponse> {
        let response = match request.await {
            Ok(response) => response,
            Err(error) => {
                warn!(operation, %error, "ReportPortal request failed");
                return None;
            }
        };
        match RpResponse::read(response).await {
            Ok(response) => Some(response),
            Err(error) => {
                warn!(operation, %error, "Unable to read the ReportPortal response");
                None
            }
        }
    }

    /// Start a launch. Returns its UUID.
    pub async fn start_launch(&self, request: LaunchStartRequest) -> Option<String> {
        let request = request.prepare(&self.config.mode, self.config.truncate_attributes);
        let body = json_body("start_launch", &request)?;
        let response = self
            .send("start_launch", self.session.post(&self.urls.launch(), &body))
            .await?;

        let launch_uuid = response.id();
        match &launch_uuid {
            Some(launch_uuid) => debug!(%launch_uuid, "Launch started"),
            None => warn!(response = %response.json(), "start_launch: invalid response"),
        }
        launch_uuid
    }

    /// Start a test item, as a child of `parent` when given. Returns its UUID.
    pub async fn start_test_item(
        &self,
        launch_uuid: &IdRef,
        parent: Option<&IdRef>,
        request: ItemStartRequest,
    ) -> Option<String> {
        let parent = match parent {
            Some(parent) => Some(resolve_id("start_test_item", parent).await?),
            None => None,
        };
        let launch_uuid = resolve_id("start_test_item", launch_uuid).await?;
        let request = request.prepare(launch_uuid, self.config.truncate_attributes);
        let body = json_body("start_test_item", &request)?;
        let url = self.urls.item(parent.as_deref());
        let response = self
            .send("start_test_item", self.session.post(&url, &body))
            .await?;

        let item_id = response.id();
        match &item_id {
            Some(item_id) => debug!(%item_id, "Test item started"),
            None => warn!(response = %response.json(), "start_test_item: invalid response"),
        }
        item_id
    }

    /// Finish a test item. Returns the server's message.
    pub async fn finish_test_item(
        &self,
        launch_uuid: &IdRef,
        item_id: &IdRef,
        request: ItemFinishRequest,
    ) -> Option<String> {
        let item_id = resolve_id("finish_test_item", item_id).await?;
        let launch_uuid = resolve_id("finish_test_item", launch_uuid).await?;
        let request = request.prepare(
            launch_uuid,
            self.config.is_skipped_an_issue,
            self.config.truncate_attributes,
        );
        let body = json_body("finish_test_item", &request)?;
        let url = self.urls.item(Some(&item_id));
        let response = self
            .send("finish_test_item", self.session.put(&url, &body))
            .await?;

        let message = response.message().map(str::to_owned);
        debug!(%item_id, ?message, "Test item finished");
        message
    }

    /// Finish a launch. Returns the server's message.
    pub async fn finish_launch(
        &self,
        launch_uuid: &IdRef,
        request: LaunchFinishRequest,
    ) -> Option<String> {
        let launch_uuid = resolve_id("finish_launch", launch_uuid).await?;
        let request = request.prepare(self.config.truncate_attributes);
        let body = json_body("finish_launch", &request)?;
        let url = self.urls.launch_finish(&launch_uuid);
        let response = self
            .send("finish_launch", self.session.put(&url, &body))
            .await?;

        let message = response.message().map(str::to_owned);
        debug!(%launch_uuid, ?message, "Launch finished");
        message
    }

    /// Update the attributes and description of a started item. Returns the server's message.
    pub async fn update_test_item(
        &self,
        item_uuid: &IdRef,
        attributes: Option<Vec<Attribute>>,
        description: Option<String>,
    ) -> Option<String> {
        let attributes = match attributes {
            Some(attributes) if self.config.truncate_attributes => {
                Some(crate::helpers::verify_value_length(attributes))
            }
            attributes => attributes,
        };
        let item_id = self.get_item_id_by_uuid(item_uuid).await?;
        let body = Body::Json(json!({
            "description": description,
            "attributes": attributes,
        }));
        let url = self.urls.item_update(&item_id);
        let response = self
            .send("update_test_item", self.session.put(&url, &body))
            .await?;

        debug!(%item_id, "Test item updated");
        response.message().map(str::to_owned)
    }

    /// Launch details.
    pub async fn get_launch_info(&self, launch_uuid: &IdRef) -> Option<Value> {
        let launch_uuid = resolve_id("get_launch_info", launch_uuid).await?;
        let url = self.urls.launch_by_uuid(&launch_uuid);
        let response = self
            .send("get_launch_info", self.session.get(&url))
            .await?;

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

    /// Numeric id of an item, given its UUID.
    pub async fn get_item_id_by_uuid(&self, item_uuid: &IdRef) -> Option<String> {
        let item_uuid = resolve_id("get_item_id_by_uuid", item_uuid).await?;
        let url = self.urls.item_by_uuid(&item_uuid);
        self.send("get_item_id_by_uuid", self.session.get(&url))
            .await?
            .id()
    }

    /// Numeric id of a launch, as used by the web UI.
    pub async fn get_launch_ui_id(&self, launch_uuid: &IdRef) -> Option<i64> {
        self.get_launch_info(launch_uuid).await?.get("id")?.as_i64()
    }

    /// Address of a launch in the web UI.
    pub async fn get_launch_ui_url(&self, launch_uuid: &IdRef) -> Option<String> {
        let launch_info = self.get_launch_info(launch_uuid).await?;
        let launch_id = launch_info.get("id")?.as_i64()?;
        let mode = launch_info
            .get("mode")
            .and_then(Value::as_str)
            .unwrap_or(&self.config.mode);
        let url = self.urls.launch_ui(launch_id, Some(mode));
        debug!(%url, "Launch UI URL");
        Some(url)
    }

    /// Settings of the project.
    pub async fn get_project_settings(&self) -> Option<Value> {
        let url = self.urls.settings();
        self.send("get_project_settings", self.session.get(&url))
            .await
            .map(RpResponse::into_json)
    }

    /// Send log entries whose ids may still be pending. Returns the server's messages.
    pub async fn log_batch(&self, batch: &[AsyncLogRequest]) -> Option<Vec<String>> {
        let mut resolved = Vec::with_capacity(batch.len());
        for entry in batch {
            resolved.push(entry.resolve().await);
        }
        self.send_logs(&resolved).await
    }

    /// Send log entries. Returns the server's messages.
    pub async fn send_logs(&self, batch: &[LogRequest]) -> Option<Vec<String>> {
        if batch.is_empty() {
            return None;
        }
        let body = match log_batch_body(batch) {
            Ok(body) => body,
            Err(error) => {
                warn!(%error, "Unable to serialize the log batch");
                return None;
            }
        };
        let response = self
            .send("log_batch", self.session.post(&self.urls.log(), &body))
            .await?;
        Some(response.messages())
    }
}
