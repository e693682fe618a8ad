use reqwest::Client;
use serde::Deserialize;

use crate::notify::NotificationDispatcher;

#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Channel {channel_id} (type {kind}) does not accept text messages")]
    UnsupportedChannel { channel_id: String, kind: u8 },
}

#[derive(Debug, Deserialize)]
struct DiscordChannel {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
}

impl DiscordChannel {
    /// Guild text, DM, group DM, announcement and thread channels
    fn accepts_messages(&self) -> bool {
        matches!(self.kind, 0 | 1 | 3 | 5 | 10 | 11 | 12)
    }
}

/// Posts to a single Discord channel through the bot REST API.
///
/// Every [`notify`](NotificationDispatcher::notify) call resolves the channel
/// and sends independently; no gateway session is kept between calls.
#[derive(Debug, Clone)]
pub struct DiscordClient {
    client: Client,
    bot_token: String,
    channel_id: String,
    base_url: String,
}

impl DiscordClient {
    pub fn new(bot_token: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            bot_token: bot_token.into(),
            channel_id: channel_id.into(),
            base_url: "https://discord.com/api/v10".into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn authorization(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, DiscordError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let message = resp.text().await.unwrap_or_default();
        Err(DiscordError::Api { status, message })
    }

    async fn resolve_channel(&self) -> Result<DiscordChannel, DiscordError> {
        let resp = self
            .client
            .get(format!("{}/channels/{}", self.base_url, self.channel_id))
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        let channel = Self::check(resp).await?.json::<DiscordChannel>().await?;
        if !channel.accepts_messages() {
            return Err(DiscordError::UnsupportedChannel {
                channel_id: channel.id,
                kind: channel.kind,
            });
        }
        Ok(channel)
    }
}

impl NotificationDispatcher for DiscordClient {
    type Error = DiscordError;

    #[tracing::instrument(skip(self, text), fields(channel_id = %self.channel_id))]
    async fn notify(&self, text: &str) -> Result<(), Self::Error> {
        let channel = self.resolve_channel().await?;

        let resp = self
            .client
            .post(format!("{}/channels/{}/messages", self.base_url, channel.id))
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .json(&serde_json::json!({ "content": text }))
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;
        Self::check(resp).await?;

        tracing::info!("Message sent to Discord");
        Ok(())
    }
}
