use crate::errors::RelayError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Generates a `Debug` impl that redacts secret fields.
///
/// Field specifiers:
/// - `field_name`           : printed normally via `&self.field_name`
/// - `redact(field_name)`   : `String` field: shows `[empty]` or `[REDACTED]`
macro_rules! redact_debug {
    (@field $builder:ident, $self:ident, redact($field:ident)) => {
        $builder.field(
            stringify!($field),
            &if $self.$field.is_empty() {
                "[empty]"
            } else {
                "[REDACTED]"
            },
        );
    };
    (@field $builder:ident, $self:ident, $field:ident) => {
        $builder.field(stringify!($field), &$self.$field);
    };

    (@fields $builder:ident, $self:ident,) => {};
    (@fields $builder:ident, $self:ident, redact($field:ident), $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, redact($field));
        redact_debug!(@fields $builder, $self, $($rest)*);
    };
    (@fields $builder:ident, $self:ident, $field:ident, $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, $field);
        redact_debug!(@fields $builder, $self, $($rest)*);
    };

    ($struct_name:ident, $($fields:tt)*) => {
        impl std::fmt::Debug for $struct_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let mut builder = f.debug_struct(stringify!($struct_name));
                redact_debug!(@fields builder, self, $($fields)*);
                builder.finish()
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Instagram
// ---------------------------------------------------------------------------

fn default_graph_api_base() -> String {
    "https://graph.instagram.com".to_string()
}

#[derive(Clone, Serialize, Deserialize)]
pub struct InstagramConfig {
    /// Instagram-scoped id of the account that receives the DMs.
    /// Events from this id are the bot's own messages and are skipped.
    #[serde(default, rename = "botUserId")]
    pub bot_user_id: String,
    #[serde(default, rename = "accessToken")]
    pub access_token: String,
    /// Token Meta echoes back in the subscription handshake.
    #[serde(default, rename = "verifyToken")]
    pub verify_token: String,
    /// App secret for `X-Hub-Signature-256`. Empty disables the check.
    #[serde(default, rename = "appSecret")]
    pub app_secret: String,
    #[serde(default = "default_graph_api_base", rename = "graphApiBase")]
    pub graph_api_base: String,
}

impl Default for InstagramConfig {
    fn default() -> Self {
        Self {
            bot_user_id: String::new(),
            access_token: String::new(),
            verify_token: String::new(),
            app_secret: String::new(),
            graph_api_base: default_graph_api_base(),
        }
    }
}

redact_debug!(
    InstagramConfig,
    bot_user_id,
    redact(access_token),
    redact(verify_token),
    redact(app_secret),
    graph_api_base,
);

// ---------------------------------------------------------------------------
// Discord
// ---------------------------------------------------------------------------

fn default_discord_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default, rename = "channelId")]
    pub channel_id: String,
    /// Application public key (hex) for interaction signatures.
    #[serde(default, rename = "publicKey")]
    pub public_key: String,
    /// Name → Discord user id. A message starting with a name is sent to
    /// that user as a DM instead of the channel.
    #[serde(default, rename = "userIds")]
    pub user_ids: HashMap<String, String>,
    #[serde(default = "default_discord_api_base", rename = "apiBase")]
    pub api_base: String,
    #[serde(default, rename = "skipSignatureVerification")]
    pub skip_signature_verification: bool,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            channel_id: String::new(),
            public_key: String::new(),
            user_ids: HashMap::new(),
            api_base: default_discord_api_base(),
            skip_signature_verification: false,
        }
    }
}

redact_debug!(
    DiscordConfig,
    redact(token),
    channel_id,
    public_key,
    user_ids,
    api_base,
    skip_signature_verification,
);

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_webhook_path", rename = "webhookPath")]
    pub webhook_path: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            webhook_path: default_webhook_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// Longest coalescing window accepted by validation.
pub const MAX_COALESCE_WINDOW_MS: u64 = 60_000;

fn default_coalesce_window_ms() -> u64 {
    2000
}

fn default_max_media_bytes() -> u64 {
    crate::utils::media::MAX_MEDIA_BYTES
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// How long a media item waits for a caption before it is sent alone.
    #[serde(default = "default_coalesce_window_ms", rename = "coalesceWindowMs")]
    pub coalesce_window_ms: u64,
    /// Downloads at or above this size are sent as a link instead.
    #[serde(default = "default_max_media_bytes", rename = "maxMediaBytes")]
    pub max_media_bytes: u64,
    /// Directory for temporary media files. Defaults to `<tmp>/reelay`.
    #[serde(default, rename = "mediaDir", skip_serializing_if = "Option::is_none")]
    pub media_dir: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            coalesce_window_ms: default_coalesce_window_ms(),
            max_media_bytes: default_max_media_bytes(),
            media_dir: None,
        }
    }
}

impl RelayConfig {
    pub fn coalesce_window(&self) -> Duration {
        Duration::from_millis(self.coalesce_window_ms)
    }
}

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub instagram: InstagramConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

fn is_snowflake(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

impl Config {
    /// Validate value ranges and id formats. Missing credentials are allowed
    /// here so that `init`/`check` work on a partial file.
    pub fn validate(&self) -> Result<(), RelayError> {
        self.validate_relay()?;
        self.validate_gateway()?;
        self.validate_discord()?;
        Ok(())
    }

    /// Everything `validate` checks plus the credentials the server needs.
    pub fn validate_for_serve(&self) -> Result<(), RelayError> {
        self.validate()?;
        let required: &[(&str, &str)] = &[
            ("discord.token", &self.discord.token),
            ("discord.channelId", &self.discord.channel_id),
            ("instagram.botUserId", &self.instagram.bot_user_id),
            ("instagram.accessToken", &self.instagram.access_token),
            ("instagram.verifyToken", &self.instagram.verify_token),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(RelayError::Config(format!("{name} is required")));
            }
        }
        if self.discord.public_key.is_empty() && !self.discord.skip_signature_verification {
            warn!("discord.publicKey is not set, the interactions endpoint will reject every request");
        }
        if self.instagram.app_secret.is_empty() {
            warn!("instagram.appSecret is not set, webhook signatures will not be checked");
        }
        Ok(())
    }

    fn validate_relay(&self) -> Result<(), RelayError> {
        let r = &self.relay;
        if r.coalesce_window_ms == 0 {
            return Err(RelayError::Config(
                "relay.coalesceWindowMs must be > 0".into(),
            ));
        }
        if r.coalesce_window_ms > MAX_COALESCE_WINDOW_MS {
            return Err(RelayError::Config(format!(
                "relay.coalesceWindowMs is unreasonably large (> {MAX_COALESCE_WINDOW_MS})"
            )));
        }
        if r.max_media_bytes == 0 {
            return Err(RelayError::Config("relay.maxMediaBytes must be > 0".into()));
        }
        if r.max_media_bytes > crate::utils::media::MAX_MEDIA_BYTES {
            warn!(
                "relay.maxMediaBytes ({}) is above Discord's default upload limit, large uploads may be rejected",
                r.max_media_bytes
            );
        }
        Ok(())
    }

    fn validate_gateway(&self) -> Result<(), RelayError> {
        if self.gateway.port == 0 {
            return Err(RelayError::Config("gateway.port must be > 0".into()));
        }
        if self.gateway.port < 1024 {
            warn!(
                "gateway.port {} is a privileged port (< 1024), may require elevated permissions",
                self.gateway.port
            );
        }
        let path = &self.gateway.webhook_path;
        if !path.starts_with('/') || path.len() < 2 {
            return Err(RelayError::Config(
                "gateway.webhookPath must start with '/' and name a route".into(),
            ));
        }
        if path == crate::gateway::HEALTH_PATH || path == crate::gateway::INTERACTIONS_PATH {
            return Err(RelayError::Config(format!(
                "gateway.webhookPath {path} collides with a built-in route"
            )));
        }
        Ok(())
    }

    fn validate_discord(&self) -> Result<(), RelayError> {
        let d = &self.discord;
        if !d.channel_id.is_empty() && !is_snowflake(&d.channel_id) {
            return Err(RelayError::Config(
                "discord.channelId must be a numeric Discord id".into(),
            ));
        }
        for (name, id) in &d.user_ids {
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(RelayError::Config(format!(
                    "discord.userIds key {name:?} must be a single word"
                )));
            }
            if !is_snowflake(id) {
                return Err(RelayError::Config(format!(
                    "discord.userIds.{name} must be a numeric Discord id"
                )));
            }
        }
        if !d.public_key.is_empty()
            && (d.public_key.len() != 64 || hex::decode(&d.public_key).is_err())
        {
            return Err(RelayError::Config(
                "discord.publicKey must be 64 hex characters".into(),
            ));
        }
        if d.skip_signature_verification {
            warn!("discord.skipSignatureVerification is enabled, interactions are not authenticated");
        }
        Ok(())
    }
}
