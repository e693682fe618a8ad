use std::sync::{Arc, Mutex};

use cheer_relay::twitch::{ElapsedOffset, RecordingLink, RecordingLocator};

#[derive(Clone)]
pub struct MockLocator {
    pub link: Option<RecordingLink>,
    pub calls: Arc<Mutex<usize>>,
    pub fail_with: Option<String>,
}

impl MockLocator {
    pub fn live(recording_id: &str, minutes: u64, seconds: u64) -> Self {
        let offset = ElapsedOffset { minutes, seconds };
        Self {
            link: Some(RecordingLink::new(
                Self::PLATFORM_BASE_URL,
                "streamer",
                recording_id,
                offset,
            )),
            calls: Arc::new(Mutex::new(0)),
            fail_with: None,
        }
    }

    pub fn not_live() -> Self {
        Self {
            link: None,
            calls: Arc::new(Mutex::new(0)),
            fail_with: None,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            link: None,
            calls: Arc::new(Mutex::new(0)),
            fail_with: Some(msg.to_string()),
        }
    }
}

impl RecordingLocator for MockLocator {
    const PLATFORM_BASE_URL: &'static str = "https://www.twitch.tv";
    type Error = anyhow::Error;

    async fn locate(&self) -> anyhow::Result<Option<RecordingLink>> {
        *self.calls.lock().unwrap() += 1;
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(self.link.clone())
    }
}
