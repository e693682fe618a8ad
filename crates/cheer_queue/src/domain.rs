use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker appended to messages cut down by [`truncate_message`]
pub const ELLIPSIS: &str = "...";

/// A single viewer cheer, already normalized by the character-limit policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheerEntry {
    #[serde(rename = "user")]
    pub display_name: String,
    pub message: String,
    pub bits: u32,
}

impl CheerEntry {
    /// Builds an entry, applying the tiered character limit for `bits` to `message`.
    pub fn new(display_name: impl Into<String>, message: impl AsRef<str>, bits: u32) -> Self {
        let limit = character_limit(bits);
        CheerEntry {
            display_name: display_name.into(),
            message: truncate_message(message.as_ref(), limit),
            bits,
        }
    }

    /// The text read out loud and cross-posted for this cheer.
    pub fn attribution(&self) -> String {
        format!("Cheer from {}: {}", self.display_name, self.message)
    }
}

/// Stable identity handed out by the queue on enqueue.
///
/// Positional indices shift whenever something ahead of an entry is removed;
/// an `EntryId` does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedCheer {
    pub id: EntryId,
    #[serde(flatten)]
    pub cheer: CheerEntry,
}

/// Maximum message length (in characters) allowed for a cheer of `bits`.
pub fn character_limit(bits: u32) -> usize {
    match bits {
        0..=100 => 100,
        101..=1000 => 250,
        _ => 500,
    }
}

/// Cuts `message` down to exactly `limit` characters, the last three being
/// [`ELLIPSIS`]. Messages that already fit are returned unchanged.
///
/// Lengths are counted in `char`s so multi-byte text is never split inside a
/// code point.
pub fn truncate_message(message: &str, limit: usize) -> String {
    if message.chars().count() <= limit {
        return message.to_string();
    }

    let keep = limit.saturating_sub(ELLIPSIS.len());
    let mut truncated = message.chars().take(keep).collect::<String>();
    truncated.push_str(ELLIPSIS);
    truncated
}
