use std::time::Duration;

use cheer_queue::{CheerEntry, CheerQueue, EntryId};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

use crate::{error::Error, parser::IrcMessage};

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Channel login, without the leading `#`
    pub channel: String,
    /// Login the access token belongs to; anonymous read-only when `None`
    pub nick: Option<String>,
    pub access_token: String,
}

/// Exponential reconnect delay: `first × factor^attempt`, capped at `max`
#[derive(Debug, Clone, Copy)]
pub struct ReconnectBackoff {
    pub first: Duration,
    pub max: Duration,
    pub factor: f64,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self {
            first: Duration::from_secs(1),
            max: Duration::from_secs(60),
            factor: 2.0,
        }
    }
}

impl ReconnectBackoff {
    pub fn next(&self, attempt: u32) -> Duration {
        let exp = attempt.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

/// How a chat session ended without a transport error
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    Closed,
    ReconnectRequested,
}

/// Listens to one channel's chat and enqueues every cheer it sees
#[derive(Debug)]
pub struct TwitchChat {
    config: ChatConfig,
    queue: CheerQueue,
    backoff: ReconnectBackoff,
    url: String,
}

impl TwitchChat {
    const IRC_WS_URL: &'static str = "wss://irc-ws.chat.twitch.tv:443";

    pub fn new(config: ChatConfig, queue: CheerQueue) -> Self {
        Self {
            config,
            queue,
            backoff: ReconnectBackoff::default(),
            url: Self::IRC_WS_URL.into(),
        }
    }

    pub fn with_backoff(mut self, backoff: ReconnectBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Enqueues `message` if it is a cheer, returning the new entry's id
    pub fn handle_message(&self, message: &IrcMessage) -> Option<EntryId> {
        if message.command != "PRIVMSG" {
            return None;
        }
        let bits = message.bits()?;
        let display_name = message.display_name()?;
        let text = message.trailing().unwrap_or_default();

        let cheer = CheerEntry::new(display_name, text, bits);
        tracing::info!(
            user = %cheer.display_name,
            bits = cheer.bits,
            message = %cheer.message,
            "Cheer added to queue"
        );
        Some(self.queue.enqueue(cheer))
    }

    fn login_lines(&self) -> Vec<String> {
        let mut lines = vec!["CAP REQ :twitch.tv/tags twitch.tv/commands".to_string()];
        match &self.config.nick {
            Some(nick) => {
                let token = self.config.access_token.trim_start_matches("oauth:");
                lines.push(format!("PASS oauth:{token}"));
                lines.push(format!("NICK {}", nick.to_lowercase()));
            }
            None => lines.push(format!("NICK justinfan{}", rand::random::<u32>() % 90_000 + 10_000)),
        }
        lines.push(format!(
            "JOIN #{}",
            self.config.channel.trim_start_matches('#').to_lowercase()
        ));
        lines
    }

    /// One connection from handshake to close. `received` is set once any
    /// chat line arrives, which resets the reconnect backoff.
    #[tracing::instrument(skip_all, fields(channel = %self.config.channel))]
    async fn session(&self, received: &mut bool) -> Result<SessionEnd, Error> {
        let (ws, _) = connect_async(self.url.as_str()).await?;
        let (mut write, mut read) = ws.split();

        for line in self.login_lines() {
            write.send(Message::Text(line.into())).await?;
        }
        tracing::info!("Connected to Twitch chat");

        while let Some(frame) = read.next().await {
            let text = match frame? {
                Message::Text(text) => text,
                Message::Close(_) => return Ok(SessionEnd::Closed),
                _ => continue,
            };

            for line in text.as_str().lines().filter(|l| !l.trim().is_empty()) {
                *received = true;
                let message = match line.parse::<IrcMessage>() {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::debug!(error = %e, line, "Skipping unparseable chat line");
                        continue;
                    }
                };

                match message.command.as_str() {
                    "PING" => {
                        let pong = format!("PONG :{}", message.trailing().unwrap_or("tmi.twitch.tv"));
                        write.send(Message::Text(pong.into())).await?;
                    }
                    "RECONNECT" => return Ok(SessionEnd::ReconnectRequested),
                    "NOTICE"
                        if message
                            .trailing()
                            .is_some_and(|t| t.contains("Login authentication failed")) =>
                    {
                        return Err(Error::Authentication(
                            message.trailing().unwrap_or_default().to_string(),
                        ));
                    }
                    _ => {
                        self.handle_message(&message);
                    }
                }
            }
        }

        Ok(SessionEnd::Closed)
    }

    /// Keeps a chat session alive until `shutdown` fires, reconnecting with
    /// backoff after every disconnect.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut attempt = 0u32;

        loop {
            let mut received = false;
            let outcome = tokio::select! {
                _ = shutdown.cancelled() => break,
                outcome = self.session(&mut received) => outcome,
            };

            if received {
                attempt = 0;
            }
            match outcome {
                Ok(end) => tracing::warn!(?end, "Twitch chat session ended"),
                Err(e) => tracing::error!(error = %e, "Error in Twitch chat connection"),
            }

            let delay = self.backoff.next(attempt);
            attempt = attempt.saturating_add(1);
            tracing::info!(delay_secs = delay.as_secs_f64(), "Reconnecting to Twitch chat");

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        tracing::info!("Twitch chat listener stopped");
    }
}
