//! Message rendering for the Discord side of the relay.

use crate::bus::{MediaKind, OutboundMessage};
use crate::utils::invisible::encode_hidden_id;
use crate::utils::regex::RegexPatterns;
use std::collections::HashMap;

/// Discord's per-message content limit.
pub const DISCORD_MAX_CHARS: usize = 2000;

/// Rewrite `@name` tokens found in `table` into `<@id>` mentions.
/// Lookup is case-sensitive; unknown names are left as written.
pub fn resolve_mentions<S: std::hash::BuildHasher>(
    text: &str,
    table: &HashMap<String, String, S>,
) -> String {
    RegexPatterns::mention()
        .replace_all(text, |caps: &regex::Captures<'_>| match table.get(&caps[1]) {
            Some(id) => format!("<@{id}>"),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// The `**From**` line (with the hidden sender id) and, when the message has
/// text, the `**Message**` line.
pub fn message_lines<S: std::hash::BuildHasher>(
    msg: &OutboundMessage,
    mentions: &HashMap<String, String, S>,
) -> Vec<String> {
    let mut lines = vec![format!(
        "**From**: {}{}",
        msg.username,
        encode_hidden_id(&msg.sender_id)
    )];
    if let Some(text) = msg.text.as_deref().filter(|t| !t.is_empty()) {
        lines.push(format!("**Message**: {}", resolve_mentions(text, mentions)));
    }
    lines
}

/// Render lines as one Discord block quote. Entries containing newlines are
/// split so every physical line carries the `> ` prefix.
pub fn quote(lines: &[String]) -> String {
    lines
        .iter()
        .flat_map(|entry| entry.lines())
        .map(|line| format!("> {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn limit_label(max_bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if max_bytes % MIB == 0 {
        format!("{}MB", max_bytes / MIB)
    } else {
        format!("{max_bytes} bytes")
    }
}

/// Notice used when the media is sent as a link instead of a file.
pub fn link_notice(url: &str, max_bytes: u64) -> String {
    format!(
        "-# File is bigger than {}, sending [__temporary link__]({}) instead",
        limit_label(max_bytes),
        url
    )
}

/// Notice used when the CDN reports the media as gone.
pub fn unavailable_notice(kind: MediaKind) -> String {
    format!("-# This {kind} is unavailable (it may be private or deleted)")
}
