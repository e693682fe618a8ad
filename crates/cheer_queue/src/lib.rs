//! # Cheer Queue
//!
//! Domain types for viewer cheers and the in-memory, ordered queue that holds
//! them between ingestion and processing.
//!
//! The queue is memory-only: nothing survives a restart. All mutations are
//! serialized behind a single lock so that positional removal, dequeueing and
//! appends never observe each other half-way.

mod domain;
mod queue;

pub use domain::{character_limit, truncate_message, CheerEntry, EntryId, QueuedCheer, ELLIPSIS};
pub use queue::{CheerQueue, QueueError};
