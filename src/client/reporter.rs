use std::sync::Arc;

use bon::bon;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    config::{ClientConfig, TaskConfig},
    context,
    error::ClientError,
    logs::{AsyncLogRequest, LogBatcher, LogLevel, RpFile},
    model::{
        Attribute, IdRef, ItemFinishRequest, ItemStartRequest, LaunchFinishRequest,
        LaunchStartRequest,
    },
    tasks::Task,
};

use super::{
    api::AsyncClient,
    strategy::{Batched, ExecutionStrategy, Threaded},
};

/// A [`Reporter`] running its requests on a background thread.
pub type ThreadedReporter = Reporter<Threaded>;

/// A [`Reporter`] running its requests in batches on the calling thread.
pub type BatchedReporter = Reporter<Batched>;

/// Synchronous facade over [`AsyncClient`].
///
/// Every call returns immediately with a [`Task`]. Its result can be waited for with
/// [`Task::blocking_result`], but doesn't have to be: ids returned by one call can be passed
/// straight to the next, and are resolved when the request is sent.
///
/// Tasks are run and tracked by the [`ExecutionStrategy`]. Call [`Reporter::close`] (or
/// [`Reporter::finish_launch`]) to wait for everything still outstanding.
///
/// Cloning a reporter gives one which shares the client, the log batcher and the tasks, with
/// the current item of this one as its only item. Clones never start or finish the launch.
#[derive(Debug)]
pub struct Reporter<S: ExecutionStrategy> {
    client: AsyncClient,
    strategy: Arc<S>,
    log_batcher: Arc<LogBatcher<AsyncLogRequest>>,
    launch_uuid: Option<Task<Option<String>>>,
    own_launch: bool,
    item_stack: Vec<Task<Option<String>>>,
}

/// Plain data needed to pick up reporting where a [`Reporter`] left off.
///
/// Holds no loops, locks or connections. See [`Reporter::suspend`] and [`Reporter::resume`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterState {
    /// Connection settings.
    pub config: ClientConfig,
    /// Task timeouts and triggers.
    pub task_config: TaskConfig,
    /// The launch, if one was started or given.
    pub launch_uuid: Option<String>,
    /// Whether the reporter started the launch itself.
    pub own_launch: bool,
    /// Ids of the items which were started and not finished, outermost first.
    pub item_stack: Vec<String>,
}

#[bon]
impl<S: ExecutionStrategy> Reporter<S> {
    #[allow(missing_docs)]
    #[builder]
    pub fn new(
        /// Client used for every request.
        client: AsyncClient,
        /// Runs and tracks the tasks.
        strategy: Arc<S>,
        /// Log batcher, sized from the client configuration when not given.
        log_batcher: Option<Arc<LogBatcher<AsyncLogRequest>>>,
        /// A launch started elsewhere. The reporter will neither start nor finish its own.
        #[builder(into)]
        launch_uuid: Option<String>,
    ) -> Self {
        let log_batcher = log_batcher.unwrap_or_else(|| {
            let config = client.config();
            Arc::new(LogBatcher::new(
                config.log_batch_size,
                config.log_batch_payload_limit,
            ))
        });
        let own_launch = launch_uuid.is_none();
        let launch_uuid = launch_uuid.map(|uuid| strategy.create_task(async move { Some(uuid) }));
        Self {
            client,
            strategy,
            log_batcher,
            launch_uuid,
            own_launch,
            item_stack: Vec::new(),
        }
    }

    /// Create a reporter with its own HTTP session and loop.
    pub fn start(config: ClientConfig, task_config: TaskConfig) -> Result<Self, ClientError> {
        let client = AsyncClient::new(config)?;
        let strategy = S::start(task_config)?;
        Ok(Self::builder()
            .client(client)
            .strategy(Arc::new(strategy))
            .build())
    }

    /// Rebuild a reporter from a snapshot taken by [`Reporter::suspend`].
    pub fn resume(state: ReporterState) -> Result<Self, ClientError> {
        let mut reporter = Self::start(state.config, state.task_config)?;
        if let Some(launch_uuid) = state.launch_uuid {
            reporter.launch_uuid = Some(reporter.ready(Some(launch_uuid)));
        }
        reporter.own_launch = state.own_launch;
        reporter.item_stack = state
            .item_stack
            .into_iter()
            .map(|item_id| reporter.ready(Some(item_id)))
            .collect();
        debug!(items = reporter.item_stack.len(), "Reporter resumed");
        Ok(reporter)
    }

    /// Wait for outstanding work, then take a snapshot of the reporter.
    ///
    /// Launches and items whose start did not complete are left out.
    pub fn suspend(self) -> ReporterState {
        self.finish_tasks();
        let resolved =
            |task: &Task<Option<String>>| task.result().and_then(|id| id.ok().flatten());
        ReporterState {
            config: self.client.config().clone(),
            task_config: self.strategy.task_config(),
            launch_uuid: self.launch_uuid.as_ref().and_then(resolved),
            own_launch: self.own_launch,
            item_stack: self.item_stack.iter().filter_map(resolved).collect(),
        }
    }

    /// The underlying async client.
    pub fn client(&self) -> &AsyncClient {
        &self.client
    }

    /// The execution strategy.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// The launch, if one was started or given.
    pub fn launch_uuid(&self) -> Option<&Task<Option<String>>> {
        self.launch_uuid.as_ref()
    }

    /// The innermost item which was started and not finished.
    pub fn current_item(&self) -> Option<&Task<Option<String>>> {
        self.item_stack.last()
    }

    /// Make this reporter (a clone of it) the active one on the calling thread.
    ///
    /// See [`context::active_client`].
    pub fn register_active(&self) {
        context::set_active_client(Arc::new(self.clone()));
    }

    fn ready<T>(&self, value: T) -> Task<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.strategy.create_task(async move { value })
    }

    fn launch_ref(&self, operation: &'static str) -> Option<IdRef> {
        let launch_uuid = self.launch_uuid.as_ref().map(IdRef::from);
        if launch_uuid.is_none() {
            warn!(operation, "Attempt to report before a launch was started");
        }
        launch_uuid
    }

    /// Start a launch, unless this reporter was given one or is a clone.
    pub fn start_launch(&mut self, request: LaunchStartRequest) -> Task<Option<String>> {
        if !self.own_launch {
            return match &self.launch_uuid {
                Some(launch_uuid) => {
                    debug!("Using an existing launch");
                    launch_uuid.clone()
                }
                None => {
                    warn!("Not starting a launch from a reporter which does not own it");
                    self.ready(None)
                }
            };
        }
        let client = self.client.clone();
        let task = self
            .strategy
            .create_task(async move { client.start_launch(request).await });
        self.launch_uuid = Some(task.clone());
        task
    }

    /// Wait for outstanding work and finish the launch, if this reporter started it.
    pub fn finish_launch(&mut self, request: LaunchFinishRequest) -> Task<Option<String>> {
        self.finish_tasks();
        let task = match (&self.launch_uuid, self.own_launch) {
            (Some(launch_uuid), true) => {
                let client = self.client.clone();
                let launch_uuid = IdRef::from(launch_uuid);
                self.strategy
                    .create_task(async move { client.finish_launch(&launch_uuid, request).await })
            }
            (Some(_), false) => {
                debug!("Not finishing a launch this reporter did not start");
                self.ready(None)
            }
            (None, _) => {
                warn!("Attempt to finish a launch which was never started");
                self.ready(None)
            }
        };
        self.strategy.finish_tasks();
        task
    }

    /// Start an item, as a child of `parent` when given, and make it the current item.
    pub fn start_test_item(
        &mut self,
        request: ItemStartRequest,
        parent: Option<IdRef>,
    ) -> Task<Option<String>> {
        let Some(launch_uuid) = self.launch_ref("start_test_item") else {
            return self.ready(None);
        };
        let client = self.client.clone();
        let task = self.strategy.create_task(async move {
            client
                .start_test_item(&launch_uuid, parent.as_ref(), request)
                .await
        });
        self.item_stack.push(task.clone());
        task
    }

    /// Finish an item and drop the current item.
    pub fn finish_test_item(
        &mut self,
        item_id: impl Into<IdRef>,
        request: ItemFinishRequest,
    ) -> Task<Option<String>> {
        self.item_stack.pop();
        let Some(launch_uuid) = self.launch_ref("finish_test_item") else {
            return self.ready(None);
        };
        let item_id = item_id.into();
        let client = self.client.clone();
        self.strategy.create_task(async move {
            client
                .finish_test_item(&launch_uuid, &item_id, request)
                .await
        })
    }

    /// Update the attributes and description of a started item.
    pub fn update_test_item(
        &self,
        item_uuid: impl Into<IdRef>,
        attributes: Option<Vec<Attribute>>,
        description: Option<String>,
    ) -> Task<Option<String>> {
        let item_uuid = item_uuid.into();
        let client = self.client.clone();
        self.strategy.create_task(async move {
            client
                .update_test_item(&item_uuid, attributes, description)
                .await
        })
    }

    /// Launch details.
    pub fn get_launch_info(&self) -> Task<Option<Value>> {
        let Some(launch_uuid) = self.launch_ref("get_launch_info") else {
            return self.ready(None);
        };
        let client = self.client.clone();
        self.strategy
            .create_task(async move { client.get_launch_info(&launch_uuid).await })
    }

    /// Numeric id of an item, given its UUID.
    pub fn get_item_id_by_uuid(&self, item_uuid: impl Into<IdRef>) -> Task<Option<String>> {
        let item_uuid = item_uuid.into();
        let client = self.client.clone();
        self.strategy
            .create_task(async move { client.get_item_id_by_uuid(&item_uuid).await })
    }

    /// Numeric id of the launch, as used by the web UI.
    pub fn get_launch_ui_id(&self) -> Task<Option<i64>> {
        let Some(launch_uuid) = self.launch_ref("get_launch_ui_id") else {
            return self.ready(None);
        };
        let client = self.client.clone();
        self.strategy
            .create_task(async move { client.get_launch_ui_id(&launch_uuid).await })
    }

    /// Address of the launch in the web UI.
    pub fn get_launch_ui_url(&self) -> Task<Option<String>> {
        let Some(launch_uuid) = self.launch_ref("get_launch_ui_url") else {
            return self.ready(None);
        };
        let client = self.client.clone();
        self.strategy
            .create_task(async move { client.get_launch_ui_url(&launch_uuid).await })
    }

    /// Settings of the project.
    pub fn get_project_settings(&self) -> Task<Option<Value>> {
        let client = self.client.clone();
        self.strategy
            .create_task(async move { client.get_project_settings().await })
    }

    /// Add a log entry to the current batch.
    ///
    /// The task sends the batch if this entry completed it, and returns the server's messages.
    /// Otherwise it returns `None`.
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
        item_id: Option<IdRef>,
        /// Time in epoch milliseconds, now when absent.
        #[builder(into)]
        time: Option<String>,
    ) -> Task<Option<Vec<String>>> {
        let Some(launch_uuid) = self.launch_ref("log") else {
            return self.ready(None);
        };
        let mut entry = AsyncLogRequest::new(launch_uuid, message)
            .with_item(item_id)
            .with_level(level)
            .with_file(attachment);
        if let Some(time) = time {
            entry = entry.with_time(time);
        }

        let client = self.client.clone();
        let log_batcher = Arc::clone(&self.log_batcher);
        self.strategy.create_task(async move {
            let Some(batch) = log_batcher.append_async(entry).await else {
                return None;
            };
            client.log_batch(&batch).await
        })
    }

    /// Wait for every outstanding task, up to the shutdown timeout, then send any logs still
    /// waiting in the batcher.
    pub fn finish_tasks(&self) {
        self.strategy.finish_tasks();
        let Some(batch) = self.log_batcher.flush() else {
            return;
        };
        debug!(entries = batch.len(), "Sending remaining logs");
        let client = self.client.clone();
        let task = self
            .strategy
            .create_task(async move { client.log_batch(&batch).await });
        if let Err(error) = task.blocking_result() {
            warn!(%error, "Unable to send remaining logs");
        }
    }

    /// Wait for outstanding work. The launch is left as it is.
    pub fn close(&self) {
        self.finish_tasks();
    }
}

impl<S: ExecutionStrategy> Clone for Reporter<S> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            strategy: Arc::clone(&self.strategy),
            log_batcher: Arc::clone(&self.log_batcher),
            launch_uuid: self.launch_uuid.clone(),
            own_launch: false,
            item_stack: self.current_item().cloned().into_iter().collect(),
        }
    }
}
