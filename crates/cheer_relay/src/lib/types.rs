use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope every Helix endpoint wraps its results in
#[derive(Debug, Deserialize)]
pub struct HelixPage<T> {
    pub data: Vec<T>,
}

/// Entry of `GET /helix/streams`; only present while the channel is live
#[derive(Debug, Clone, Deserialize)]
pub struct StreamSession {
    pub user_id: String,
    pub started_at: DateTime<Utc>,
}

/// Entry of `GET /helix/videos?type=archive`, most recent first
#[derive(Debug, Clone, Deserialize)]
pub struct RecordingReference {
    pub id: String,
}

/// Payload pushed to overlay clients for every processed cheer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsNotification {
    pub audio_url: String,
    pub message: String,
}
