use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::{
    twitch::{ElapsedOffset, RecordingLink, RecordingLocator},
    types::{HelixPage, RecordingReference, StreamSession},
};

#[derive(Debug, thiserror::Error)]
pub enum HelixError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("No archived recording found for broadcaster {user_id}")]
    NoRecording { user_id: String },
}

/// Twitch Helix client used to find the live session and its recording
#[derive(Debug, Clone)]
pub struct HelixClient {
    client: Client,
    client_id: String,
    access_token: String,
    channel: String,
    base_url: String,
}

impl HelixClient {
    pub fn new(
        client_id: impl Into<String>,
        access_token: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            client_id: client_id.into(),
            access_token: access_token.into(),
            channel: channel.into(),
            base_url: "https://api.twitch.tv/helix".into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<HelixPage<T>, HelixError> {
        let resp = self
            .client
            .get(format!("{}/{}", self.base_url, endpoint))
            .header("Client-ID", &self.client_id)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, endpoint, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(HelixError::Api { status, message });
        }

        Ok(resp.json::<HelixPage<T>>().await?)
    }

    /// The channel's current live session, `None` when offline
    #[tracing::instrument(skip(self), fields(channel = %self.channel))]
    pub async fn current_stream(&self) -> Result<Option<StreamSession>, HelixError> {
        let page = self
            .get_page::<StreamSession>("streams", &[("user_login", self.channel.as_str())])
            .await?;
        Ok(page.data.into_iter().next())
    }

    /// Most recent archived recording of `user_id`
    #[tracing::instrument(skip(self))]
    pub async fn latest_archive(
        &self,
        user_id: &str,
    ) -> Result<Option<RecordingReference>, HelixError> {
        let page = self
            .get_page::<RecordingReference>("videos", &[("user_id", user_id), ("type", "archive")])
            .await?;
        Ok(page.data.into_iter().next())
    }
}

impl RecordingLocator for HelixClient {
    const PLATFORM_BASE_URL: &'static str = "https://www.twitch.tv";

    type Error = HelixError;

    async fn locate(&self) -> Result<Option<RecordingLink>, Self::Error> {
        let Some(session) = self.current_stream().await? else {
            return Ok(None);
        };
        let offset = ElapsedOffset::between(session.started_at, Utc::now());

        let recording = self
            .latest_archive(&session.user_id)
            .await?
            .ok_or_else(|| HelixError::NoRecording {
                user_id: session.user_id.clone(),
            })?;

        let link = RecordingLink::new(
            Self::PLATFORM_BASE_URL,
            &self.channel,
            &recording.id,
            offset,
        );
        tracing::debug!(url = %link.url, "Located recording");

        Ok(Some(link))
    }
}
