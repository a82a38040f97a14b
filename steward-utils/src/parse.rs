/// Longest message body the platform accepts, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Cut `raw` down to at most `max_chars` characters without splitting a character.
pub fn truncate_chars(raw: &str, max_chars: usize) -> &str {
    match raw.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &raw[..byte_index],
        None => raw,
    }
}

/// Keep the non-blank payloads in order, each clipped to the message limit.
///
/// Blank payloads are dropped, never an error; kept payloads keep their
/// original whitespace.
pub fn normalize_payloads<'a, I>(payloads: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    payloads
        .into_iter()
        .flatten()
        .filter(|payload| !payload.trim().is_empty())
        .map(|payload| truncate_chars(payload, MAX_MESSAGE_CHARS).to_owned())
        .collect()
}
