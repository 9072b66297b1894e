// Shared test helpers: not all items used by every test binary.
#![allow(unused)]

use reelay::channels::base::UserDirectory;
use reelay::channels::discord::DiscordChannel;
use reelay::channels::instagram::InstagramClient;
use reelay::coalesce::{CoalescingEngine, TokioScheduler};
use reelay::config::Config;
use reelay::gateway::{GatewayState, build_router};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const BOT_ID: &str = "17840000000";
pub const CHANNEL_ID: &str = "555000";
pub const WINDOW: Duration = Duration::from_millis(150);

/// One mock server standing in for Discord, the Graph API and the media CDN.
pub struct Relay {
    pub server: MockServer,
    pub config: Config,
    pub engine: CoalescingEngine,
    pub instagram: Arc<InstagramClient>,
    pub media_dir: TempDir,
}

impl Relay {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let media_dir = TempDir::new().expect("create media dir");

        let mut config = Config::default();
        config.instagram.bot_user_id = BOT_ID.into();
        config.instagram.access_token = "ig-token".into();
        config.instagram.verify_token = "verify".into();
        config.instagram.graph_api_base = format!("{}/graph", server.uri());
        config.discord.token = "bot-token".into();
        config.discord.channel_id = CHANNEL_ID.into();
        config.discord.api_base = format!("{}/discord", server.uri());
        config.discord.skip_signature_verification = true;
        config
            .discord
            .user_ids
            .insert("alice".into(), "111".into());
        config.relay.coalesce_window_ms = WINDOW.as_millis() as u64;
        config.relay.max_media_bytes = 4096;
        config.relay.media_dir = Some(media_dir.path().to_path_buf());

        mount_discord(&server).await;
        mount_graph(&server).await;

        let client = reqwest::Client::new();
        let instagram = Arc::new(InstagramClient::new(&config.instagram, client.clone()));
        let discord = Arc::new(
            DiscordChannel::new(&config.discord, &config.relay, client.clone(), client)
                .expect("discord channel"),
        );
        let directory: Arc<dyn UserDirectory> = instagram.clone();
        let engine = CoalescingEngine::new(
            directory,
            discord,
            Arc::new(TokioScheduler),
            config.instagram.bot_user_id.as_str(),
        )
        .with_window(config.relay.coalesce_window())
        .with_routes(config.discord.user_ids.clone());

        Self {
            server,
            config,
            engine,
            instagram,
            media_dir,
        }
    }

    pub fn router(&self) -> axum::Router {
        let state = GatewayState::new(self.engine.clone(), self.instagram.clone(), &self.config);
        build_router(state, &self.config.gateway.webhook_path)
    }

    pub fn media_url(&self, name: &str) -> String {
        format!("{}/cdn/{}", self.server.uri(), name)
    }

    /// Serve `name` from the mock CDN with the given status and body.
    pub async fn mount_media(&self, name: &str, status: u16, size: usize) {
        let route = format!("/cdn/{name}");
        Mock::given(method("HEAD"))
            .and(path(route.clone()))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_bytes(vec![7u8; size]))
            .mount(&self.server)
            .await;
    }

    /// Message posts Discord has received so far, oldest first.
    pub async fn discord_posts(&self) -> Vec<DiscordPost> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == "POST" && r.url.path().ends_with("/messages"))
            .map(DiscordPost::from_request)
            .collect()
    }

    /// Poll until at least `n` posts have arrived or the deadline passes.
    pub async fn wait_for_posts(&self, n: usize) -> Vec<DiscordPost> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let posts = self.discord_posts().await;
            if posts.len() >= n || tokio::time::Instant::now() >= deadline {
                return posts;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscordPost {
    pub channel_path: String,
    pub body: String,
    pub multipart: bool,
}

impl DiscordPost {
    fn from_request(r: &Request) -> Self {
        let multipart = r
            .headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));
        Self {
            channel_path: r.url.path().to_string(),
            body: String::from_utf8_lossy(&r.body).into_owned(),
            multipart,
        }
    }

    pub fn is_for_channel(&self, channel_id: &str) -> bool {
        self.channel_path
            .ends_with(&format!("/channels/{channel_id}/messages"))
    }
}

async fn mount_discord(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path_regex(r"^/discord/channels/[^/]+/messages$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg"})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/discord/users/@me/channels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "dm-111"})))
        .mount(server)
        .await;
}

async fn mount_graph(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/graph/\d+$"))
        .respond_with(|req: &Request| {
            let id = req.url.path().rsplit('/').next().unwrap_or_default().to_string();
            ResponseTemplate::new(200).set_body_json(json!({"id": id, "username": format!("ig_{id}")}))
        })
        .mount(server)
        .await;
}

pub fn text_item(sender: &str, text: &str) -> Value {
    json!({
        "sender": {"id": sender},
        "recipient": {"id": BOT_ID},
        "timestamp": 1_700_000_000_000_i64,
        "message": {"mid": "m", "text": text}
    })
}

pub fn media_item(sender: &str, kind: &str, url: &str, text: Option<&str>) -> Value {
    let mut message = json!({
        "mid": "m",
        "attachments": [{"type": kind, "payload": {"url": url}}]
    });
    if let Some(text) = text {
        message["text"] = json!(text);
    }
    json!({
        "sender": {"id": sender},
        "recipient": {"id": BOT_ID},
        "timestamp": 1_700_000_000_000_i64,
        "message": message
    })
}

pub fn webhook_body(items: &[Value]) -> Vec<u8> {
    serde_json::to_vec(&json!({"object": "instagram", "entry": [{"id": BOT_ID, "messaging": items}]}))
        .expect("serialize webhook")
}
