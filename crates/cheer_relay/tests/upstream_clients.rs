use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use cheer_queue::CheerQueue;
use cheer_relay::{
    notify::{
        discord::{DiscordClient, DiscordError},
        NotificationDispatcher,
    },
    tts::{
        elevenlabs::{ElevenLabsClient, ElevenLabsError},
        SpeechSynthesizer,
    },
    twitch::{
        chat::{ChatConfig, ReconnectBackoff, TwitchChat},
        helix::{HelixClient, HelixError},
        RecordingLocator,
    },
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

async fn spawn_upstream(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

// Helix

fn helix_authorized(headers: &HeaderMap) -> bool {
    header(headers, "client-id") == "client-123"
        && header(headers, "authorization") == "Bearer token-abc"
}

fn helix_unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Unauthorized", "status": 401, "message": "Invalid OAuth token" })),
    )
        .into_response()
}

async fn helix_streams(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Response {
    if !helix_authorized(&headers) {
        return helix_unauthorized();
    }
    let started_at = (Utc::now() - chrono::Duration::seconds(754)).to_rfc3339();
    let data = match query.get("user_login").map(String::as_str) {
        Some("streamer") => json!([{ "user_id": "42", "user_login": "streamer", "started_at": started_at }]),
        Some("fresh") => json!([{ "user_id": "43", "user_login": "fresh", "started_at": started_at }]),
        _ => json!([]),
    };
    Json(json!({ "data": data })).into_response()
}

async fn helix_videos(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Response {
    if !helix_authorized(&headers) {
        return helix_unauthorized();
    }
    assert_eq!(query.get("type").map(String::as_str), Some("archive"));
    let data = match query.get("user_id").map(String::as_str) {
        Some("42") => json!([
            { "id": "2039485761", "created_at": "2024-05-01T18:00:00Z" },
            { "id": "2039000000", "created_at": "2024-04-30T18:00:00Z" },
        ]),
        _ => json!([]),
    };
    Json(json!({ "data": data })).into_response()
}

async fn helix_base_url() -> String {
    let router = Router::new()
        .route("/helix/streams", get(helix_streams))
        .route("/helix/videos", get(helix_videos));
    format!("{}/helix", spawn_upstream(router).await)
}

#[tokio::test]
async fn test_helix_locates_live_recording() {
    let base_url = helix_base_url().await;
    let client = HelixClient::new("client-123", "token-abc", "streamer").with_base_url(base_url);

    let link = client.locate().await.unwrap().expect("channel is live");

    assert!(link
        .url
        .starts_with("https://www.twitch.tv/streamer/v/2039485761?t=12m3"));
    assert_eq!(link.offset.minutes, 12);
    assert!(link.offset.seconds >= 34);
}

#[tokio::test]
async fn test_helix_offline_channel_has_no_link() {
    let base_url = helix_base_url().await;
    let client = HelixClient::new("client-123", "token-abc", "sleeping").with_base_url(base_url);

    assert!(client.locate().await.unwrap().is_none());
}

#[tokio::test]
async fn test_helix_live_without_archive_is_an_error() {
    let base_url = helix_base_url().await;
    let client = HelixClient::new("client-123", "token-abc", "fresh").with_base_url(base_url);

    let err = client.locate().await.unwrap_err();
    assert!(matches!(err, HelixError::NoRecording { ref user_id } if user_id == "43"));
}

#[tokio::test]
async fn test_helix_rejected_token() {
    let base_url = helix_base_url().await;
    let client = HelixClient::new("client-123", "expired", "streamer").with_base_url(base_url);

    let err = client.locate().await.unwrap_err();
    assert!(matches!(err, HelixError::Api { status: 401, ref message } if message.contains("Invalid OAuth token")));
}

// ElevenLabs

type SpeechCalls = Arc<Mutex<Vec<(String, Value)>>>;

async fn text_to_speech(
    State(calls): State<SpeechCalls>,
    Path(voice_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if header(&headers, "xi-api-key") != "xi-key" {
        return (StatusCode::UNAUTHORIZED, "invalid api key").into_response();
    }
    assert_eq!(header(&headers, "accept"), "audio/mpeg");
    calls.lock().unwrap().push((voice_id, body));
    ([("content-type", "audio/mpeg")], b"ID3 synthesized".to_vec()).into_response()
}

async fn elevenlabs_base_url(calls: SpeechCalls) -> String {
    let router = Router::new()
        .route("/v1/text-to-speech/{voice_id}", post(text_to_speech))
        .with_state(calls);
    format!("{}/v1", spawn_upstream(router).await)
}

#[tokio::test]
async fn test_elevenlabs_synthesizes_with_voice_settings() {
    let calls = SpeechCalls::default();
    let base_url = elevenlabs_base_url(calls.clone()).await;
    let client = ElevenLabsClient::new("xi-key").with_base_url(base_url);

    let audio = client.synthesize("Cheer from alice: hype").await.unwrap();

    assert_eq!(&audio[..], b"ID3 synthesized");
    let calls = calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    let (voice_id, body) = &calls[0];
    assert_eq!(voice_id, ElevenLabsClient::DEFAULT_VOICE_ID);
    assert_eq!(body["text"], "Cheer from alice: hype");
    assert_eq!(body["model_id"], ElevenLabsClient::DEFAULT_MODEL_ID);
    assert_eq!(body["voice_settings"]["stability"], 0.5);
    assert_eq!(body["voice_settings"]["similarity_boost"], 0.5);
}

#[tokio::test]
async fn test_elevenlabs_custom_voice() {
    let calls = SpeechCalls::default();
    let base_url = elevenlabs_base_url(calls.clone()).await;
    let client = ElevenLabsClient::new("xi-key")
        .with_voice_id("custom-voice")
        .with_base_url(base_url);

    client.synthesize("hello").await.unwrap();

    assert_eq!(calls.lock().unwrap()[0].0, "custom-voice");
}

#[tokio::test]
async fn test_elevenlabs_rejected_key() {
    let base_url = elevenlabs_base_url(SpeechCalls::default()).await;
    let client = ElevenLabsClient::new("wrong").with_base_url(base_url);

    let err = client.synthesize("hello").await.unwrap_err();
    assert!(matches!(err, ElevenLabsError::Api { status: 401, ref message } if message == "invalid api key"));
}

// Discord

type PostedMessages = Arc<Mutex<Vec<(String, String)>>>;

async fn discord_channel(headers: HeaderMap, Path(channel_id): Path<String>) -> Response {
    if header(&headers, "authorization") != "Bot bot-token" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "401: Unauthorized", "code": 0 })),
        )
            .into_response();
    }
    let kind = match channel_id.as_str() {
        "missing" => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": "Unknown Channel", "code": 10003 })),
            )
                .into_response()
        }
        "voice" => 2,
        _ => 0,
    };
    Json(json!({ "id": channel_id, "type": kind, "name": "cheers" })).into_response()
}

async fn discord_post_message(
    State(posted): State<PostedMessages>,
    headers: HeaderMap,
    Path(channel_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    assert_eq!(header(&headers, "authorization"), "Bot bot-token");
    let content = body["content"].as_str().unwrap_or_default().to_string();
    posted.lock().unwrap().push((channel_id, content));
    Json(json!({ "id": "1", "type": 0 })).into_response()
}

async fn discord_base_url(posted: PostedMessages) -> String {
    let router = Router::new()
        .route("/api/v10/channels/{channel_id}", get(discord_channel))
        .route("/api/v10/channels/{channel_id}/messages", post(discord_post_message))
        .with_state(posted);
    format!("{}/api/v10", spawn_upstream(router).await)
}

#[tokio::test]
async fn test_discord_posts_to_text_channel() {
    let posted = PostedMessages::default();
    let base_url = discord_base_url(posted.clone()).await;
    let client = DiscordClient::new("bot-token", "123456").with_base_url(base_url);

    let text = "Cheer from alice: hype\nhttps://www.twitch.tv/streamer/v/1?t=0m5s";
    client.notify(text).await.unwrap();

    assert_eq!(
        *posted.lock().unwrap(),
        vec![("123456".to_string(), text.to_string())]
    );
}

#[tokio::test]
async fn test_discord_refuses_voice_channel() {
    let posted = PostedMessages::default();
    let base_url = discord_base_url(posted.clone()).await;
    let client = DiscordClient::new("bot-token", "voice").with_base_url(base_url);

    let err = client.notify("hello").await.unwrap_err();

    assert!(matches!(err, DiscordError::UnsupportedChannel { kind: 2, .. }));
    assert!(posted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_discord_unknown_channel() {
    let base_url = discord_base_url(PostedMessages::default()).await;
    let client = DiscordClient::new("bot-token", "missing").with_base_url(base_url);

    let err = client.notify("hello").await.unwrap_err();
    assert!(matches!(err, DiscordError::Api { status: 404, ref message } if message.contains("Unknown Channel")));
}

// Twitch chat

#[tokio::test]
async fn test_chat_session_answers_ping_and_enqueues_cheers() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let mut login = Vec::new();
        while login.len() < 3 {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => login.push(text.as_str().to_string()),
                Some(Ok(_)) => continue,
                other => panic!("login interrupted: {other:?}"),
            }
        }

        ws.send(Message::Text(":tmi.twitch.tv 001 justinfan12345 :Welcome, GLHF!".into()))
            .await
            .unwrap();
        ws.send(Message::Text("PING :tmi.twitch.tv".into()))
            .await
            .unwrap();
        let pong = match ws.next().await {
            Some(Ok(Message::Text(text))) => text.as_str().to_string(),
            other => panic!("expected PONG, got {other:?}"),
        };

        ws.send(Message::Text(
            "@bits=250;display-name=Alice :alice!alice@alice.tmi.twitch.tv PRIVMSG #streamer :Cheer250 great stream\r\n\
             @display-name=Bob :bob!bob@bob.tmi.twitch.tv PRIVMSG #streamer :no bits here"
                .into(),
        ))
        .await
        .unwrap();

        // hold the connection open until the client goes away
        while let Some(Ok(_)) = ws.next().await {}
        (login, pong)
    });

    let queue = CheerQueue::new();
    let shutdown = CancellationToken::new();
    let chat = TwitchChat::new(
        ChatConfig {
            channel: "Streamer".into(),
            nick: None,
            access_token: String::new(),
        },
        queue.clone(),
    )
    .with_url(format!("ws://{addr}"))
    .with_backoff(ReconnectBackoff {
        first: Duration::from_millis(10),
        max: Duration::from_millis(50),
        factor: 2.0,
    });
    let chat_task = tokio::spawn(chat.run(shutdown.clone()));

    tokio::time::timeout(Duration::from_secs(5), async {
        while queue.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("cheer should be enqueued");

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), chat_task)
        .await
        .unwrap()
        .unwrap();
    let (login, pong) = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(login[0], "CAP REQ :twitch.tv/tags twitch.tv/commands");
    assert!(login[1].starts_with("NICK justinfan"));
    assert_eq!(login[2], "JOIN #streamer");
    assert_eq!(pong, "PONG :tmi.twitch.tv");

    let queued = queue.snapshot();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].cheer.display_name, "Alice");
    assert_eq!(queued[0].cheer.bits, 250);
    assert_eq!(queued[0].cheer.message, "Cheer250 great stream");
}
