//! Typed Instagram messaging webhook payload.
//!
//! Only the fields the relay reads are modelled. Unknown fields are ignored;
//! a body that does not have the `entry[].messaging[]` shape is rejected as
//! [`RelayError::MalformedEvent`].

use crate::bus::{InboundEvent, MediaAttachment, MediaKind};
use crate::errors::{RelayError, RelayResult};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub messaging: Vec<Messaging>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Messaging {
    pub sender: Participant,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Participant {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Option<AttachmentPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentPayload {
    #[serde(default)]
    pub url: Option<String>,
}

impl WebhookPayload {
    pub fn parse(body: &[u8]) -> RelayResult<Self> {
        serde_json::from_slice(body)
            .map_err(|e| RelayError::MalformedEvent(format!("invalid webhook payload: {e}")))
    }

    /// Normalise every `entry[].messaging[]` item that carries a message.
    ///
    /// Items without a `message` (reads, reactions, postbacks) are dropped.
    /// A payload with no messaging items at all is malformed.
    pub fn events(&self) -> RelayResult<Vec<InboundEvent>> {
        let items: Vec<&Messaging> = self.entry.iter().flat_map(|e| &e.messaging).collect();
        if items.is_empty() {
            return Err(RelayError::MalformedEvent(
                "payload has no messaging items".to_string(),
            ));
        }
        Ok(items.into_iter().filter_map(Messaging::to_event).collect())
    }
}

impl Messaging {
    fn to_event(&self) -> Option<InboundEvent> {
        let message = self.message.as_ref()?;
        // several supported attachments: the last one wins
        let media = message.attachments.iter().rev().find_map(|a| {
            let kind = MediaKind::from_attachment_type(&a.kind)?;
            let url = a.payload.as_ref()?.url.clone()?;
            Some(MediaAttachment { url, kind })
        });
        Some(InboundEvent {
            sender_id: self.sender.id.clone(),
            text: message.text.clone(),
            media,
            timestamp: self
                .timestamp
                .and_then(millis_to_datetime)
                .unwrap_or_else(Utc::now),
        })
    }
}

fn millis_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}
