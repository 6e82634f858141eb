use std::future::Future;

use serde::Serialize;
use uuid::Uuid;

use crate::{helpers::timestamp, model::IdRef};

/// Content type of attachments which do not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

macro_rules! boundary {
    () => {
        "--972dbca3abacfd01fb4aea0571532b52"
    };
}

/// Multipart boundary used to estimate request sizes.
pub const MULTIPART_BOUNDARY: &str = boundary!();
/// Line break between multipart sections.
pub const LINE_BREAK: &str = "\r\n";
/// Closing line of a multipart body.
pub const MULTIPART_FOOTER: &str = concat!("--", boundary!(), "--");

const JSON_PART_HEADER: &str = concat!(
    "--",
    boundary!(),
    "\r\nContent-Disposition: form-data; name=\"json_request_part\"\r\n",
    "Content-Type: application/json\r\n\r\n"
);
const FILE_PART_HEADER_START: &str = concat!(
    "--",
    boundary!(),
    "\r\nContent-Disposition: form-data; name=\"file\"; filename=\""
);
const FILE_PART_HEADER_MIDDLE: &str = "\"\r\nContent-Type: ";
const FILE_PART_HEADER_END: &str = "\r\n\r\n";

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(missing_docs)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Unknown,
}

impl LogLevel {
    /// Map a numeric level (`5000` TRACE up to `60000` UNKNOWN) to a level.
    ///
    /// Values between the known ones map to the nearest lower level.
    pub fn from_level_no(level: u32) -> Self {
        match level {
            60000.. => LogLevel::Unknown,
            50000.. => LogLevel::Fatal,
            40000.. => LogLevel::Error,
            30000.. => LogLevel::Warn,
            20000.. => LogLevel::Info,
            10000.. => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// The numeric level.
    pub fn level_no(self) -> u32 {
        match self {
            LogLevel::Trace => 5000,
            LogLevel::Debug => 10000,
            LogLevel::Info => 20000,
            LogLevel::Warn => 30000,
            LogLevel::Error => 40000,
            LogLevel::Fatal => 50000,
            LogLevel::Unknown => 60000,
        }
    }
}

/// A file attached to a log entry.
///
/// Only the name is part of the entry's JSON; the content travels as a separate multipart part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpFile {
    name: String,
    #[serde(skip)]
    content: Vec<u8>,
    #[serde(skip)]
    content_type: Option<String>,
}

impl RpFile {
    /// Create an attachment. A random name is used when none is given.
    pub fn new(name: Option<String>, content: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            name: name.unwrap_or_else(|| Uuid::new_v4().to_string()),
            content,
            content_type,
        }
    }

    /// File name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File content.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Content type, or [`DEFAULT_CONTENT_TYPE`].
    pub fn content_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    fn part_size(&self) -> usize {
        FILE_PART_HEADER_START.len()
            + self.name.len()
            + FILE_PART_HEADER_MIDDLE.len()
            + self.content_type().len()
            + FILE_PART_HEADER_END.len()
            + self.content.len()
            + LINE_BREAK.len()
    }
}

/// A log entry whose estimated multipart size is known up front.
pub trait MultipartSize {
    /// Estimated bytes this entry adds to a multipart request.
    fn multipart_size(&self) -> usize;
}

/// A log entry whose size depends on ids which may still be pending.
pub trait ResolveMultipartSize: Send + Sync {
    /// Estimated bytes this entry adds to a multipart request, once its ids are known.
    fn resolve_multipart_size(&self) -> impl Future<Output = usize> + Send;
}

/// A log entry with known launch and item ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRequest {
    /// Launch UUID.
    pub launch_uuid: Option<String>,
    /// Time in epoch milliseconds.
    pub time: String,
    /// Attachment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<RpFile>,
    /// Item UUID. Launch-level logs have none.
    pub item_uuid: Option<String>,
    /// Severity.
    pub level: Option<LogLevel>,
    /// Log message.
    pub message: String,
}

impl LogRequest {
    /// Create a log entry stamped with the current time.
    pub fn new(launch_uuid: Option<String>, message: impl Into<String>) -> Self {
        Self {
            launch_uuid,
            time: timestamp(),
            file: None,
            item_uuid: None,
            level: None,
            message: message.into(),
        }
    }

    /// Set the time.
    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = time.into();
        self
    }

    /// Set the item this entry belongs to.
    pub fn with_item(mut self, item_uuid: Option<String>) -> Self {
        self.item_uuid = item_uuid;
        self
    }

    /// Set the severity.
    pub fn with_level(mut self, level: Option<LogLevel>) -> Self {
        self.level = level;
        self
    }

    /// Attach a file.
    pub fn with_file(mut self, file: Option<RpFile>) -> Self {
        self.file = file;
        self
    }

    fn json_size(&self) -> usize {
        serde_json::to_vec(self).map_or(0, |json| json.len())
    }
}

impl MultipartSize for LogRequest {
    fn multipart_size(&self) -> usize {
        let json_part = self.json_size() + JSON_PART_HEADER.len() + LINE_BREAK.len();
        json_part + self.file.as_ref().map_or(0, RpFile::part_size)
    }
}

/// A log entry whose launch and item ids may still be pending.
#[derive(Debug, Clone)]
pub struct AsyncLogRequest {
    launch_uuid: IdRef,
    time: String,
    file: Option<RpFile>,
    item_uuid: Option<IdRef>,
    level: Option<LogLevel>,
    message: String,
}

impl AsyncLogRequest {
    /// Create a log entry stamped with the current time.
    pub fn new(launch_uuid: IdRef, message: impl Into<String>) -> Self {
        Self {
            launch_uuid,
            time: timestamp(),
            file: None,
            item_uuid: None,
            level: None,
            message: message.into(),
        }
    }

    /// Set the time.
    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = time.into();
        self
    }

    /// Set the item this entry belongs to.
    pub fn with_item(mut self, item_uuid: Option<IdRef>) -> Self {
        self.item_uuid = item_uuid;
        self
    }

    /// Set the severity.
    pub fn with_level(mut self, level: Option<LogLevel>) -> Self {
        self.level = level;
        self
    }

    /// Attach a file.
    pub fn with_file(mut self, file: Option<RpFile>) -> Self {
        self.file = file;
        self
    }

    /// Wait for the ids and produce a plain log entry.
    pub async fn resolve(&self) -> LogRequest {
        let item_uuid = match &self.item_uuid {
            Some(item_uuid) => item_uuid.resolve().await,
            None => None,
        };
        LogRequest {
            launch_uuid: self.launch_uuid.resolve().await,
            time: self.time.clone(),
            file: self.file.clone(),
            item_uuid,
            level: self.level,
            message: self.message.clone(),
        }
    }
}

impl ResolveMultipartSize for AsyncLogRequest {
    async fn resolve_multipart_size(&self) -> usize {
        self.resolve().await.multipart_size()
    }
}
