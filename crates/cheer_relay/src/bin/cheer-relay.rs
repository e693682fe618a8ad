use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use cheer_queue::CheerQueue;
use clap::Parser;
use cheer_relay::{
    artifacts::ArtifactStore,
    bus::LiveBus,
    notify::discord::DiscordClient,
    server::{self, AppState},
    tracing::init_tracing_subscriber,
    tts::elevenlabs::ElevenLabsClient,
    twitch::{
        chat::{ChatConfig, TwitchChat},
        helix::HelixClient,
    },
    CheerProcessorBuilder,
};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "cheer-relay", about = "Twitch cheer TTS relay")]
struct Cli {
    /// Twitch application client id
    #[arg(long, env = "TWITCH_CLIENT_ID")]
    twitch_client_id: String,

    /// Twitch user access token, used for Helix and chat login
    #[arg(long, env = "TWITCH_ACCESS_TOKEN")]
    twitch_access_token: String,

    /// Channel to listen to
    #[arg(long, env = "TWITCH_CHANNEL")]
    twitch_channel: String,

    /// Login the access token belongs to; chat is read anonymously when unset
    #[arg(long, env = "TWITCH_CHAT_NICK")]
    twitch_chat_nick: Option<String>,

    /// ElevenLabs API key
    #[arg(long, env = "ELEVEN_LABS_API_KEY")]
    eleven_labs_api_key: String,

    /// ElevenLabs voice used for announcements
    #[arg(long, env = "ELEVEN_LABS_VOICE_ID", default_value = ElevenLabsClient::DEFAULT_VOICE_ID)]
    eleven_labs_voice_id: String,

    /// Discord bot token
    #[arg(long, env = "DISCORD_TOKEN")]
    discord_token: String,

    /// Discord channel cheers are cross-posted to
    #[arg(long, env = "DISCORD_CHANNEL_ID")]
    discord_channel_id: String,

    #[arg(long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Directory holding the overlay pages and transient audio files
    #[arg(long, env = "PUBLIC_DIR", default_value = "public")]
    public_dir: PathBuf,

    /// Seconds an audio file is kept before deletion
    #[arg(long, default_value = "60")]
    artifact_ttl_secs: u64,

    /// Do not connect to Twitch chat; cheers can still be injected over HTTP
    #[arg(long)]
    no_chat: bool,
}

async fn shutdown_signal(shutdown: CancellationToken, bus: LiveBus) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");

    shutdown.cancel();
    // open SSE streams would otherwise hold graceful shutdown forever
    bus.disconnect_all();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let _guard = sentry::init((
        std::env::var("SENTRY_DSN").unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some("production".into()),
            ..Default::default()
        },
    ));

    let cli = Cli::parse();
    init_tracing_subscriber()?;

    let queue = CheerQueue::new();
    let bus = LiveBus::new();
    let artifacts = ArtifactStore::new_with_ttl(
        &cli.public_dir,
        "/audio",
        Duration::from_secs(cli.artifact_ttl_secs),
    );

    let processor = CheerProcessorBuilder::new(queue.clone(), artifacts.clone())
        .bus(bus.clone())
        .locator(HelixClient::new(
            &cli.twitch_client_id,
            &cli.twitch_access_token,
            &cli.twitch_channel,
        ))
        .dispatcher(DiscordClient::new(
            &cli.discord_token,
            &cli.discord_channel_id,
        ))
        .synthesizer(
            ElevenLabsClient::new(&cli.eleven_labs_api_key)
                .with_voice_id(&cli.eleven_labs_voice_id),
        )
        .build();

    let shutdown = CancellationToken::new();

    let chat_task = if cli.no_chat {
        tracing::info!("Twitch chat disabled");
        None
    } else {
        let chat = TwitchChat::new(
            ChatConfig {
                channel: cli.twitch_channel.clone(),
                nick: cli.twitch_chat_nick.clone(),
                access_token: cli.twitch_access_token.clone(),
            },
            queue.clone(),
        );
        Some(tokio::spawn(chat.run(shutdown.clone())))
    };

    let app = server::router(AppState::new(processor), &cli.public_dir);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cli.port))
        .await
        .with_context(|| format!("Failed to bind port {}", cli.port))?;
    tracing::info!(port = cli.port, "Server is running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone(), bus))
        .await
        .context("HTTP server failed")?;

    shutdown.cancel();
    if let Some(task) = chat_task {
        if let Err(e) = task.await {
            tracing::warn!(error = ?e, "Twitch chat task did not stop cleanly");
        }
    }
    artifacts.shutdown().await;

    Ok(())
}
