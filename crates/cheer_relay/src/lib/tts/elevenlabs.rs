use bytes::Bytes;
use reqwest::Client;
use serde::Serialize;

use crate::tts::SpeechSynthesizer;

#[derive(Debug, thiserror::Error)]
pub enum ElevenLabsError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    client: Client,
    api_key: String,
    voice_id: String,
    model_id: String,
    voice_settings: VoiceSettings,
    base_url: String,
}

impl ElevenLabsClient {
    pub const DEFAULT_VOICE_ID: &'static str = "iP95p4xoKVk53GoZ742B";
    pub const DEFAULT_MODEL_ID: &'static str = "eleven_monolingual_v1";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            voice_id: Self::DEFAULT_VOICE_ID.into(),
            model_id: Self::DEFAULT_MODEL_ID.into(),
            voice_settings: VoiceSettings::default(),
            base_url: "https://api.elevenlabs.io/v1".into(),
        }
    }

    pub fn with_voice_id(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = voice_id.into();
        self
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl SpeechSynthesizer for ElevenLabsClient {
    const AUDIO_EXTENSION: &'static str = "mp3";

    type Error = ElevenLabsError;

    #[tracing::instrument(skip(self), fields(voice_id = %self.voice_id))]
    async fn synthesize(&self, text: &str) -> Result<Bytes, Self::Error> {
        let body = SpeechRequest {
            text,
            model_id: &self.model_id,
            voice_settings: self.voice_settings,
        };

        tracing::info!("Sending TTS request to ElevenLabs");
        let resp = self
            .client
            .post(format!("{}/text-to-speech/{}", self.base_url, self.voice_id))
            .header("xi-api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            tracing::error!(status, %message, "ElevenLabs rejected TTS request");
            return Err(ElevenLabsError::Api { status, message });
        }

        let audio = resp.bytes().await?;
        tracing::info!(size = audio.len(), "Received TTS response from ElevenLabs");

        Ok(audio)
    }
}
