pub mod chat;
pub mod helix;

use std::{
    fmt::{self, Debug, Display},
    future::Future,
};

use chrono::{DateTime, Utc};

/// Resolves the current live session of the configured channel into a link
/// that points at the same moment in the archived recording.
pub trait RecordingLocator {
    /// Base for recording deep links
    const PLATFORM_BASE_URL: &'static str;

    type Error: Debug + Display + Send + Sync;

    /// `Ok(None)` means the channel is not live, which is a normal state
    fn locate(&self) -> impl Future<Output = Result<Option<RecordingLink>, Self::Error>> + Send;
}

/// Time elapsed since the stream went live.
///
/// Minutes are not folded into hours: a stream running for 1h15m03s
/// renders as `75m3s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElapsedOffset {
    pub minutes: u64,
    pub seconds: u64,
}

impl ElapsedOffset {
    /// Whole seconds between `started_at` and `now`; a start in the future
    /// (clock skew) counts as zero.
    pub fn between(started_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let elapsed = (now - started_at).num_seconds().max(0) as u64;
        ElapsedOffset {
            minutes: elapsed / 60,
            seconds: elapsed % 60,
        }
    }
}

impl Display for ElapsedOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m{}s", self.minutes, self.seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingLink {
    pub url: String,
    pub offset: ElapsedOffset,
}

impl RecordingLink {
    /// `<base>/<channel>/v/<recording_id>?t=<M>m<S>s`
    pub fn new(base_url: &str, channel: &str, recording_id: &str, offset: ElapsedOffset) -> Self {
        let url = format!(
            "{}/{}/v/{}?t={}",
            base_url.trim_end_matches('/'),
            channel,
            recording_id,
            offset
        );
        RecordingLink { url, offset }
    }
}
