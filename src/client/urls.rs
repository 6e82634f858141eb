use crate::{config::ClientConfig, config::DEFAULT_LAUNCH_MODE, helpers::uri_join};

/// Endpoints of one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ApiUrls {
    endpoint: String,
    project: String,
    v1: String,
    v2: String,
}

impl ApiUrls {
    pub(crate) fn new(config: &ClientConfig) -> Self {
        let endpoint = config.endpoint().to_owned();
        let project = config.project().to_owned();
        Self {
            v1: uri_join([endpoint.as_str(), "api/v1", project.as_str()]),
            v2: uri_join([endpoint.as_str(), "api/v2", project.as_str()]),
            endpoint,
            project,
        }
    }

    pub(crate) fn launch(&self) -> String {
        uri_join([self.v2.as_str(), "launch"])
    }

    pub(crate) fn launch_finish(&self, launch_uuid: &str) -> String {
        uri_join([self.v2.as_str(), "launch", launch_uuid, "finish"])
    }

    pub(crate) fn launch_by_uuid(&self, launch_uuid: &str) -> String {
        uri_join([self.v1.as_str(), "launch", "uuid", launch_uuid])
    }

    /// Root item, or a child of `parent` when given.
    pub(crate) fn item(&self, parent: Option<&str>) -> String {
        match parent {
            Some(parent) => uri_join([self.v2.as_str(), "item", parent]),
            None => uri_join([self.v2.as_str(), "item"]),
        }
    }

    pub(crate) fn item_by_uuid(&self, item_uuid: &str) -> String {
        uri_join([self.v1.as_str(), "item", "uuid", item_uuid])
    }

    pub(crate) fn item_update(&self, item_id: &str) -> String {
        uri_join([self.v1.as_str(), "item", item_id, "update"])
    }

    pub(crate) fn settings(&self) -> String {
        uri_join([self.v1.as_str(), "settings"])
    }

    pub(crate) fn log(&self) -> String {
        uri_join([self.v2.as_str(), "log"])
    }

    /// Page of a launch in the web UI. Debug launches live under a different page.
    pub(crate) fn launch_ui(&self, launch_id: i64, mode: Option<&str>) -> String {
        let mode = mode.unwrap_or(DEFAULT_LAUNCH_MODE);
        let launch_type = if mode.eq_ignore_ascii_case(DEFAULT_LAUNCH_MODE) {
            "launches"
        } else {
            "userdebug"
        };
        let path = format!(
            "ui/#{}/{launch_type}/all/{launch_id}",
            self.project.to_lowercase()
        );
        uri_join([self.endpoint.as_str(), path.as_str()])
    }
}
