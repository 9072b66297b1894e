//! Discord interactions: reply to a relayed message from Discord.
//!
//! A message context command on a relayed message opens a modal; submitting
//! the modal sends the typed text to the Instagram user whose id is hidden in
//! that message.

use crate::channels::instagram::InstagramClient;
use crate::utils::invisible::decode_hidden_id;
use ed25519_dalek::{Signature, VerifyingKey};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub const INTERACTION_PING: u8 = 1;
pub const INTERACTION_APPLICATION_COMMAND: u8 = 2;
pub const INTERACTION_MODAL_SUBMIT: u8 = 5;

const RESPONSE_PONG: u8 = 1;
const RESPONSE_CHANNEL_MESSAGE: u8 = 4;
const RESPONSE_MODAL: u8 = 9;

/// `custom_id` prefix of the reply modal; the Instagram id follows it.
pub const MODAL_PREFIX: &str = "instamsg_modal_";
/// `custom_id` of the modal's text input.
pub const REPLY_INPUT_ID: &str = "dm_text";
pub const REPLY_MAX_CHARS: u32 = 2000;

pub const NOT_RELAYED_NOTICE: &str =
    "⚠️ You must respond to a message that was sent by an Instagram user";

#[derive(Debug, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub data: Option<InteractionData>,
    #[serde(default)]
    pub member: Option<Member>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InteractionData {
    #[serde(default)]
    pub custom_id: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub resolved: Option<Resolved>,
    #[serde(default)]
    pub components: Vec<ActionRow>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Resolved {
    #[serde(default)]
    pub messages: HashMap<String, ResolvedMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ResolvedMessage {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ActionRow {
    #[serde(default)]
    pub components: Vec<Component>,
}

#[derive(Debug, Deserialize)]
pub struct Component {
    #[serde(default)]
    pub custom_id: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

impl Interaction {
    /// Name of the Discord user who triggered the interaction. Guild
    /// interactions carry it under `member`, DMs under `user`.
    pub fn invoker_name(&self) -> Option<&str> {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
            .map(|u| u.username.as_str())
            .filter(|n| !n.is_empty())
    }

    /// Content of the message a context command was used on.
    fn target_message(&self) -> Option<&str> {
        let data = self.data.as_ref()?;
        let messages = &data.resolved.as_ref()?.messages;
        data.target_id
            .as_ref()
            .and_then(|id| messages.get(id))
            .or_else(|| messages.values().next())
            .map(|m| m.content.as_str())
    }

    fn modal_text(&self) -> Option<&str> {
        self.data
            .as_ref()?
            .components
            .iter()
            .flat_map(|row| &row.components)
            .find(|c| c.custom_id.as_deref() == Some(REPLY_INPUT_ID))
            .and_then(|c| c.value.as_deref())
            .filter(|v| !v.is_empty())
    }
}

/// Verify Discord's Ed25519 signature over `timestamp || body`.
pub fn verify_signature(public_key_hex: &str, signature_hex: &str, timestamp: &str, body: &[u8]) -> bool {
    if signature_hex.is_empty() || timestamp.is_empty() {
        debug!("interaction missing signature or timestamp");
        return false;
    }
    let Ok(key_bytes) = hex::decode(public_key_hex) else {
        warn!("discord public key is not valid hex");
        return false;
    };
    let Ok(key_array) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
        warn!("discord public key has wrong length");
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&key_array) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&sig_bytes) else {
        return false;
    };

    let mut message = Vec::with_capacity(timestamp.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);
    key.verify_strict(&message, &signature).is_ok()
}

pub fn pong() -> Value {
    json!({ "type": RESPONSE_PONG })
}

pub fn channel_message(content: &str) -> Value {
    json!({
        "type": RESPONSE_CHANNEL_MESSAGE,
        "data": { "content": content },
    })
}

pub fn reply_modal(recipient_id: &str) -> Value {
    json!({
        "type": RESPONSE_MODAL,
        "data": {
            "custom_id": format!("{MODAL_PREFIX}{recipient_id}"),
            "title": "Send Instagram DM",
            "components": [{
                "type": 1,
                "components": [{
                    "type": 4,
                    "custom_id": REPLY_INPUT_ID,
                    "style": 2,
                    "label": "Message to send",
                    "min_length": 1,
                    "max_length": REPLY_MAX_CHARS,
                    "placeholder": "Type your Instagram DM here...",
                    "required": true,
                }],
            }],
        },
    })
}

/// Produce the interaction response for an already-verified interaction.
pub async fn handle_interaction(interaction: &Interaction, instagram: &InstagramClient) -> Value {
    match interaction.kind {
        INTERACTION_PING => pong(),
        INTERACTION_APPLICATION_COMMAND => handle_command(interaction),
        INTERACTION_MODAL_SUBMIT => handle_modal_submit(interaction, instagram).await,
        other => {
            debug!("ignoring interaction type {}", other);
            pong()
        }
    }
}

fn handle_command(interaction: &Interaction) -> Value {
    match interaction.target_message().and_then(decode_hidden_id) {
        Some(recipient_id) => {
            debug!("opening reply modal for instagram user {}", recipient_id);
            reply_modal(&recipient_id)
        }
        None => channel_message(NOT_RELAYED_NOTICE),
    }
}

async fn handle_modal_submit(interaction: &Interaction, instagram: &InstagramClient) -> Value {
    let recipient_id = interaction
        .data
        .as_ref()
        .and_then(|d| d.custom_id.as_deref())
        .and_then(|id| id.strip_prefix(MODAL_PREFIX))
        .filter(|id| !id.is_empty());
    let Some(recipient_id) = recipient_id else {
        return channel_message("Invalid modal context.");
    };
    let Some(text) = interaction.modal_text() else {
        return channel_message("No message provided.");
    };

    let outgoing = match interaction.invoker_name() {
        Some(name) => format!("{name}: {text}"),
        None => text.to_string(),
    };
    match instagram.send_direct_message(recipient_id, &outgoing).await {
        Ok(_) => {
            info!("relayed discord reply to instagram user {}", recipient_id);
            channel_message(&format!("Message sent: {text}"))
        }
        Err(e) => {
            warn!("instagram reply to {} failed: {:#}", recipient_id, e);
            channel_message(&format!("Failed to send message: {text}"))
        }
    }
}
