//! Request payloads and responses of the ReportPortal API.

mod id;
mod response;

use bon::Builder;
use serde::Serialize;

use crate::helpers::{timestamp, verify_value_length};

pub use id::IdRef;
pub use response::RpResponse;

/// A launch or item attribute: a tag with an optional key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    /// Attribute key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Attribute value.
    pub value: String,
    /// Hidden from the UI when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<bool>,
}

impl Attribute {
    /// Create a non-system attribute.
    pub fn new(key: Option<&str>, value: &str) -> Self {
        Self {
            key: key.map(str::to_owned),
            value: value.to_owned(),
            system: None,
        }
    }
}

/// Analysis result attached to a finished item.
#[derive(Debug, Clone, PartialEq, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(on(String, into))]
pub struct Issue {
    /// Issue type locator, e.g. `pb001` or `NOT_ISSUE`.
    pub issue_type: String,
    /// Comment shown next to the issue.
    pub comment: Option<String>,
    /// Whether the analyzer assigned this issue.
    #[builder(default)]
    pub auto_analyzed: bool,
    /// Keep the analyzer away from this item.
    #[builder(default = true)]
    pub ignore_analyzer: bool,
    /// Linked tickets in external bug trackers.
    #[builder(default)]
    pub external_system_issues: Vec<ExternalIssue>,
}

impl Issue {
    pub(crate) fn not_issue() -> Self {
        Self::builder().issue_type("NOT_ISSUE").build()
    }
}

/// A ticket in an external bug tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(on(String, into))]
#[allow(missing_docs)]
pub struct ExternalIssue {
    pub bts_url: Option<String>,
    pub bts_project: Option<String>,
    pub submit_date: Option<String>,
    pub ticket_id: Option<String>,
    pub url: Option<String>,
}

/// Payload to start a launch.
#[derive(Debug, Clone, PartialEq, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(on(String, into))]
pub struct LaunchStartRequest {
    /// Launch name.
    pub name: String,
    /// Start time in epoch milliseconds.
    #[builder(default = timestamp())]
    pub start_time: String,
    /// Launch description.
    pub description: Option<String>,
    /// Launch attributes.
    #[builder(default)]
    pub attributes: Vec<Attribute>,
    /// Start as a rerun of the latest launch with the same name.
    #[builder(default)]
    pub rerun: bool,
    /// UUID of the launch to rerun.
    pub rerun_of: Option<String>,
    /// Launch mode, filled from the client configuration.
    #[builder(skip)]
    pub mode: Option<String>,
}

/// Payload to finish a launch.
#[derive(Debug, Clone, PartialEq, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(on(String, into))]
pub struct LaunchFinishRequest {
    /// End time in epoch milliseconds.
    #[builder(default = timestamp())]
    pub end_time: String,
    /// Overall status, calculated by the server when absent.
    pub status: Option<String>,
    /// Launch description.
    pub description: Option<String>,
    /// Launch attributes.
    #[builder(default)]
    pub attributes: Vec<Attribute>,
}

/// Payload to start a test item.
#[derive(Debug, Clone, PartialEq, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(on(String, into))]
pub struct ItemStartRequest {
    /// Item name.
    pub name: String,
    /// Start time in epoch milliseconds.
    #[builder(default = timestamp())]
    pub start_time: String,
    /// Item type, e.g. `SUITE`, `TEST` or `STEP`.
    #[serde(rename = "type")]
    pub item_type: String,
    /// Item description.
    pub description: Option<String>,
    /// Item attributes.
    #[builder(default)]
    pub attributes: Vec<Attribute>,
    /// Item parameters, as key/value pairs.
    #[builder(default)]
    pub parameters: Vec<Attribute>,
    /// Code reference of the test.
    pub code_ref: Option<String>,
    /// Test case identifier.
    pub test_case_id: Option<String>,
    /// Whether the item contributes to statistics.
    #[builder(default = true)]
    pub has_stats: bool,
    /// Whether this item is a retry.
    #[builder(default)]
    pub retry: bool,
    /// Id of the item this one retries.
    pub retry_of: Option<String>,
    /// Client-generated item UUID, used instead of one from the server.
    pub uuid: Option<String>,
    /// Launch UUID, filled by the client.
    #[builder(skip)]
    pub launch_uuid: Option<String>,
}

/// Payload to finish a test item.
#[derive(Debug, Clone, PartialEq, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(on(String, into))]
pub struct ItemFinishRequest {
    /// End time in epoch milliseconds.
    #[builder(default = timestamp())]
    pub end_time: String,
    /// Item status, e.g. `PASSED`, `FAILED` or `SKIPPED`.
    pub status: Option<String>,
    /// Analysis result.
    pub issue: Option<Issue>,
    /// Item description.
    pub description: Option<String>,
    /// Item attributes.
    #[builder(default)]
    pub attributes: Vec<Attribute>,
    /// Test case identifier, overriding the one given on start.
    pub test_case_id: Option<String>,
    /// Whether this item is a retry.
    #[builder(default)]
    pub retry: bool,
    /// Id of the item this one retries.
    pub retry_of: Option<String>,
    /// Launch UUID, filled by the client.
    #[builder(skip)]
    pub launch_uuid: Option<String>,
}

impl LaunchStartRequest {
    pub(crate) fn prepare(mut self, mode: &str, truncate: bool) -> Self {
        self.mode = Some(mode.to_owned());
        if truncate {
            self.attributes = verify_value_length(self.attributes);
        }
        self
    }
}

impl LaunchFinishRequest {
    pub(crate) fn prepare(mut self, truncate: bool) -> Self {
        if truncate {
            self.attributes = verify_value_length(self.attributes);
        }
        self
    }
}

impl ItemStartRequest {
    pub(crate) fn prepare(mut self, launch_uuid: String, truncate: bool) -> Self {
        self.launch_uuid = Some(launch_uuid);
        if truncate {
            self.attributes = verify_value_length(self.attributes);
        }
        self
    }
}

impl ItemFinishRequest {
    pub(crate) fn prepare(
        mut self,
        launch_uuid: String,
        is_skipped_an_issue: bool,
        truncate: bool,
    ) -> Self {
        self.launch_uuid = Some(launch_uuid);
        let skipped = self
            .status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case("skipped"));
        if self.issue.is_none() && skipped && !is_skipped_an_issue {
            self.issue = Some(Issue::not_issue());
        }
        if truncate {
            self.attributes = verify_value_length(self.attributes);
        }
        self
    }
}
