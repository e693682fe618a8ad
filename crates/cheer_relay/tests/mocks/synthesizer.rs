use std::sync::{Arc, Mutex};

use bytes::Bytes;
use cheer_relay::tts::SpeechSynthesizer;

#[derive(Clone)]
pub struct MockSynthesizer {
    pub audio: Bytes,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_with: Option<String>,
}

impl MockSynthesizer {
    pub fn new(audio: &'static [u8]) -> Self {
        Self {
            audio: Bytes::from_static(audio),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            audio: Bytes::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: Some(msg.to_string()),
        }
    }
}

impl SpeechSynthesizer for MockSynthesizer {
    const AUDIO_EXTENSION: &'static str = "mp3";
    type Error = anyhow::Error;

    async fn synthesize(&self, text: &str) -> anyhow::Result<Bytes> {
        self.calls.lock().unwrap().push(text.to_string());
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(self.audio.clone())
    }
}
