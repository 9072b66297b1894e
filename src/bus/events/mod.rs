use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Kind of Instagram media that can be relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Reel,
    Post,
}

impl MediaKind {
    /// Map an Instagram webhook attachment `type` to a relayable kind.
    pub fn from_attachment_type(kind: &str) -> Option<Self> {
        match kind {
            "ig_reel" => Some(Self::Reel),
            "share" => Some(Self::Post),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reel => "reel",
            Self::Post => "post",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub url: String,
    pub kind: MediaKind,
}

/// One normalized Instagram DM event, decoded at the webhook boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub sender_id: String,
    pub text: Option<String>,
    pub media: Option<MediaAttachment>,
    pub timestamp: DateTime<Utc>,
}

impl InboundEvent {
    /// Message text, treating an empty string as absent.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}

/// Where an outbound message is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Destination {
    DirectMessage { user_id: String },
    Channel,
}

impl Destination {
    /// Route on a leading name token.
    ///
    /// When the first whitespace-separated word of `text` is a key of
    /// `user_ids`, the message goes to that user's DMs and the word is
    /// consumed; the remaining words (if any) become the body. Otherwise the
    /// text is returned as-is for the configured channel.
    pub fn resolve<S: std::hash::BuildHasher>(
        text: Option<&str>,
        user_ids: &HashMap<String, String, S>,
    ) -> (Self, Option<String>) {
        let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
            return (Self::Channel, None);
        };
        let mut words = text.split_whitespace();
        if let Some(first) = words.next()
            && let Some(user_id) = user_ids.get(first)
        {
            let rest = words.collect::<Vec<_>>().join(" ");
            let body = if rest.is_empty() { None } else { Some(rest) };
            return (
                Self::DirectMessage {
                    user_id: user_id.clone(),
                },
                body,
            );
        }
        (Self::Channel, Some(text.to_string()))
    }
}

/// A finalized message handed to the dispatcher. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub username: String,
    pub sender_id: String,
    pub text: Option<String>,
    pub media: Option<MediaAttachment>,
    pub destination: Destination,
}

impl OutboundMessage {
    /// Build an outbound message, resolving its destination from `text`.
    pub fn compose<S: std::hash::BuildHasher>(
        username: String,
        sender_id: String,
        text: Option<&str>,
        media: Option<MediaAttachment>,
        user_ids: &HashMap<String, String, S>,
    ) -> Self {
        let (destination, text) = Destination::resolve(text, user_ids);
        Self {
            username,
            sender_id,
            text,
            media,
            destination,
        }
    }

    /// Short label for logs, e.g. `reel+text`.
    pub fn shape(&self) -> &'static str {
        match (&self.media, &self.text) {
            (Some(m), Some(_)) if m.kind == MediaKind::Reel => "reel+text",
            (Some(_), Some(_)) => "post+text",
            (Some(m), None) if m.kind == MediaKind::Reel => "reel",
            (Some(_), None) => "post",
            (None, _) => "text",
        }
    }
}

#[cfg(test)]
mod tests;
