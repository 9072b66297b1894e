//! Invisible sender-id tagging.
//!
//! Relayed messages carry the Instagram sender id as a run of zero-width code
//! points appended to the visible username, so a Discord reply can be routed
//! back without changing what readers see. Only ASCII digits survive encoding.

/// Marks the start of an encoded id. Shares no code point with [`DIGITS`].
pub const MARKER: &str = "\u{feff}\u{feff}\u{feff}";

/// Marker written by earlier deployments. It reuses the digit-0 code point, so
/// the payload starts right after its first occurrence.
pub const LEGACY_MARKER: &str = "\u{200b}\u{200b}\u{200b}";

/// Zero-width code point for each decimal digit, indexed by digit value.
const DIGITS: [char; 10] = [
    '\u{200b}', // zero-width space
    '\u{200c}', // zero-width non-joiner
    '\u{200d}', // zero-width joiner
    '\u{2060}', // word joiner
    '\u{2061}', // function application
    '\u{2062}', // invisible times
    '\u{2063}', // invisible separator
    '\u{2064}', // invisible plus
    '\u{206a}', // inhibit symmetric swapping
    '\u{206b}', // activate symmetric swapping
];

fn digit_for(c: char) -> Option<char> {
    DIGITS
        .iter()
        .position(|&d| d == c)
        .and_then(|i| char::from_digit(i as u32, 10))
}

/// Map each ASCII digit of `id` to its zero-width code point, without marker.
/// Non-digit characters are dropped.
pub fn encode_digits(id: &str) -> String {
    id.chars()
        .filter_map(|c| c.to_digit(10).map(|d| DIGITS[d as usize]))
        .collect()
}

/// Encode `id` as marker + zero-width digits. Lossless only for numeric ids.
pub fn encode_hidden_id(id: &str) -> String {
    let mut out = String::with_capacity(MARKER.len() + id.len() * 3);
    out.push_str(MARKER);
    out.push_str(&encode_digits(id));
    out
}

/// Recover an id hidden by [`encode_hidden_id`] anywhere inside `text`.
///
/// Returns `None` when no marker is present or no digits follow it.
pub fn decode_hidden_id(text: &str) -> Option<String> {
    let payload = text
        .find(MARKER)
        .map(|idx| &text[idx + MARKER.len()..])
        .or_else(|| {
            text.find(LEGACY_MARKER)
                .map(|idx| &text[idx + LEGACY_MARKER.len()..])
        })?;

    let id: String = payload.chars().map_while(digit_for).collect();
    if id.is_empty() { None } else { Some(id) }
}

/// Remove the marker and encoded payload, leaving only visible text.
pub fn strip_hidden_id(text: &str) -> String {
    let Some((idx, marker)) = text
        .find(MARKER)
        .map(|i| (i, MARKER))
        .or_else(|| text.find(LEGACY_MARKER).map(|i| (i, LEGACY_MARKER)))
    else {
        return text.to_string();
    };
    let rest = &text[idx + marker.len()..];
    let tail = rest.trim_start_matches(|c| digit_for(c).is_some());
    format!("{}{}", &text[..idx], tail)
}

#[cfg(test)]
mod tests;
