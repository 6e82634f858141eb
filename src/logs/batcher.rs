use std::{mem, sync::Mutex};

use tracing::trace;

use crate::helpers::lock;

use super::{MultipartSize, ResolveMultipartSize, MAX_LOG_BATCH_PAYLOAD_SIZE, MAX_LOG_BATCH_SIZE};

/// Packs log entries into batches which respect an entry count and a payload size limit.
///
/// Entries are returned in the order they were appended. A batch is handed back as soon as one
/// of the limits is reached; anything left over is returned by [`LogBatcher::flush`].
///
/// Safe to share between threads.
#[derive(Debug)]
pub struct LogBatcher<T> {
    entry_num: usize,
    payload_limit: usize,
    state: Mutex<BatchState<T>>,
}

#[derive(Debug)]
struct BatchState<T> {
    batch: Vec<T>,
    payload_size: usize,
}

impl<T> BatchState<T> {
    fn take(&mut self) -> Vec<T> {
        self.payload_size = 0;
        mem::take(&mut self.batch)
    }
}

impl<T> LogBatcher<T> {
    /// Create a batcher returning at most `entry_num` entries per batch, and starting a new batch
    /// before the estimated size would reach `payload_limit` bytes.
    pub fn new(entry_num: usize, payload_limit: usize) -> Self {
        Self {
            entry_num,
            payload_limit,
            state: Mutex::new(BatchState {
                batch: Vec::new(),
                payload_size: 0,
            }),
        }
    }

    /// Maximum number of entries in a batch.
    pub fn entry_num(&self) -> usize {
        self.entry_num
    }

    /// Payload size limit, in bytes.
    pub fn payload_limit(&self) -> usize {
        self.payload_limit
    }

    /// Add an entry. Returns a completed batch when a limit is reached.
    ///
    /// When the entry would push the batch to the payload limit, the current batch is returned
    /// and the entry starts the next one. An entry which is too large on its own still goes
    /// into a batch by itself.
    pub fn append(&self, entry: T) -> Option<Vec<T>>
    where
        T: MultipartSize,
    {
        let size = entry.multipart_size();
        self.append_sized(size, entry)
    }

    /// Add an entry whose size depends on pending ids, waiting for them first.
    ///
    /// The wait happens without holding the lock.
    pub async fn append_async(&self, entry: T) -> Option<Vec<T>>
    where
        T: ResolveMultipartSize,
    {
        let size = entry.resolve_multipart_size().await;
        self.append_sized(size, entry)
    }

    fn append_sized(&self, size: usize, entry: T) -> Option<Vec<T>> {
        let mut state = lock(&self.state);

        if state.payload_size + size >= self.payload_limit && !state.batch.is_empty() {
            let batch = mem::replace(&mut state.batch, vec![entry]);
            state.payload_size = size;
            trace!(entries = batch.len(), "Log batch reached the payload limit");
            return Some(batch);
        }

        state.batch.push(entry);
        state.payload_size += size;
        if state.batch.len() >= self.entry_num {
            let batch = state.take();
            trace!(entries = batch.len(), "Log batch reached the entry limit");
            return Some(batch);
        }
        None
    }

    /// Return and clear whatever has accumulated, if anything.
    pub fn flush(&self) -> Option<Vec<T>> {
        let mut state = lock(&self.state);
        (!state.batch.is_empty()).then(|| state.take())
    }

    /// Number of entries waiting in the current batch.
    pub fn len(&self) -> usize {
        lock(&self.state).batch.len()
    }

    /// Whether the current batch is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Estimated size of the current batch, in bytes.
    pub fn payload_size(&self) -> usize {
        lock(&self.state).payload_size
    }
}

impl<T> Default for LogBatcher<T> {
    fn default() -> Self {
        Self::new(MAX_LOG_BATCH_SIZE, MAX_LOG_BATCH_PAYLOAD_SIZE)
    }
}
