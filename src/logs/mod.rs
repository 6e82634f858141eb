//! Log entries and log batching.
//!
//! Log entries are sent to the server in multipart batches. A [`LogBatcher`] collects entries
//! until either the entry count limit or the estimated payload size limit is reached, then hands
//! the batch back to the caller to send.

mod batcher;
mod request;

use crate::http::{Body, Part};

pub use batcher::LogBatcher;
pub use request::{
    AsyncLogRequest, LogLevel, LogRequest, MultipartSize, ResolveMultipartSize, RpFile,
    DEFAULT_CONTENT_TYPE, LINE_BREAK, MULTIPART_BOUNDARY, MULTIPART_FOOTER,
};

/// Maximum number of entries in one log batch.
pub const MAX_LOG_BATCH_SIZE: usize = 20;

/// Maximum estimated size of one log batch: 98% of 64 MiB, minus the multipart footer.
pub const MAX_LOG_BATCH_PAYLOAD_SIZE: usize =
    (64u64 * 1024 * 1024 * 98 / 100) as usize - MULTIPART_FOOTER.len();

/// Name of the multipart part carrying the JSON array of entries.
pub const JSON_REQUEST_PART: &str = "json_request_part";

/// Build the multipart body for a batch: the JSON array of entries, then one `file` part per
/// attachment in entry order.
pub fn log_batch_body(entries: &[LogRequest]) -> serde_json::Result<Body> {
    let json = serde_json::to_vec(entries)?;
    let mut parts = vec![Part::new(JSON_REQUEST_PART, json, "application/json")];
    parts.extend(entries.iter().filter_map(|entry| entry.file.as_ref()).map(|file| {
        Part::new("file", file.content().to_vec(), file.content_type())
            .with_file_name(file.name())
    }));
    Ok(Body::Multipart(parts))
}
