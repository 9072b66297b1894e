use crate::bus::OutboundMessage;
use async_trait::async_trait;

/// Outbound side of the relay. One finished message per call.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    fn name(&self) -> &str;

    async fn dispatch(&self, msg: &OutboundMessage) -> anyhow::Result<()>;
}

/// Resolves an Instagram-scoped sender id to a display name.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn username(&self, sender_id: &str) -> anyhow::Result<String>;
}

/// Split block-quoted content into chunks of at most `limit` bytes.
///
/// Whole lines are packed together where they fit. A single line longer than
/// `limit` is cut at a char boundary and each continuation keeps the `> `
/// quote prefix so the rendering stays intact across messages.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    const QUOTE: &str = "> ";
    if text.len() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.split('\n') {
        let needed = if current.is_empty() {
            line.len()
        } else {
            current.len() + 1 + line.len()
        };
        if needed <= limit {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
            continue;
        }
        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        let mut rest = line;
        let mut continuation = false;
        loop {
            let prefix = if continuation && line.starts_with(QUOTE) {
                QUOTE
            } else {
                ""
            };
            let budget = limit.saturating_sub(prefix.len()).max(1);
            if rest.len() <= budget {
                current = format!("{prefix}{rest}");
                break;
            }
            let mut cut = budget;
            while cut > 0 && !rest.is_char_boundary(cut) {
                cut -= 1;
            }
            if cut == 0 {
                cut = rest.char_indices().nth(1).map_or(rest.len(), |(i, _)| i);
            }
            chunks.push(format!("{prefix}{}", &rest[..cut]));
            rest = &rest[cut..];
            continuation = true;
            if rest.is_empty() {
                break;
            }
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
