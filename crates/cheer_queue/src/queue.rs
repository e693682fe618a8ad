use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;

use crate::{CheerEntry, EntryId, QueuedCheer};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("No cheers in queue")]
    Empty,
    #[error("Invalid index {index} for queue of length {len}")]
    InvalidIndex { index: usize, len: usize },
    #[error("No queued cheer with id {0}")]
    UnknownEntry(EntryId),
}

#[derive(Debug, Default)]
struct QueueState {
    entries: VecDeque<QueuedCheer>,
    next_id: u64,
}

/// FIFO queue of pending cheers.
///
/// Cloning yields another handle to the same queue. Every operation takes
/// the same lock, so a `remove_at` never races a concurrent `dequeue_front`
/// between bounds check and removal.
#[derive(Debug, Clone, Default)]
pub struct CheerQueue {
    state: Arc<Mutex<QueueState>>,
}

impl CheerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `cheer` to the tail and returns its stable id
    pub fn enqueue(&self, cheer: CheerEntry) -> EntryId {
        let mut state = self.state.lock();
        let id = EntryId(state.next_id);
        state.next_id += 1;
        state.entries.push_back(QueuedCheer { id, cheer });

        tracing::debug!(%id, len = state.entries.len(), "Cheer enqueued");
        id
    }

    /// Removes and returns the oldest entry
    pub fn dequeue_front(&self) -> Result<QueuedCheer, QueueError> {
        self.state.lock().entries.pop_front().ok_or(QueueError::Empty)
    }

    /// Removes the entry currently at `index`.
    ///
    /// The queue is left untouched when `index` is out of range.
    pub fn remove_at(&self, index: usize) -> Result<QueuedCheer, QueueError> {
        let mut state = self.state.lock();
        let len = state.entries.len();
        state
            .entries
            .remove(index)
            .ok_or(QueueError::InvalidIndex { index, len })
    }

    /// Removes the entry with the given id, wherever it currently sits
    pub fn remove(&self, id: EntryId) -> Result<QueuedCheer, QueueError> {
        let mut state = self.state.lock();
        let position = state
            .entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(QueueError::UnknownEntry(id))?;

        state
            .entries
            .remove(position)
            .ok_or(QueueError::UnknownEntry(id))
    }

    /// Copy of the queue contents, head first
    pub fn snapshot(&self) -> Vec<QueuedCheer> {
        self.state.lock().entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }
}
