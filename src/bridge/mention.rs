//! Question extraction from raw chat text

use std::sync::LazyLock;

use regex::Regex;

use crate::types::request::{ChatEvent, EventKind};

/// Slack-encoded user mention, e.g. `<@U123ABC>` or `<@U123ABC|name>`
static USER_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@[A-Z0-9]+(?:\|[^>]*)?>\s*").expect("valid mention regex"));

/// Leading plain-text mention, as some clients render it (`@Bot ...`)
static LEADING_PLAIN_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*@\S+").expect("valid plain mention regex"));

/// Whether the text contains an encoded user mention
#[must_use]
pub fn contains_mention(text: &str) -> bool {
    USER_MENTION.is_match(text)
}

/// Strip mention tokens and surrounding whitespace
///
/// Returns an empty string when nothing but mentions and whitespace remain.
///
/// A leading plain `@name` is only treated as the mention when the text has
/// no encoded one, so `<@U1> @timestamp ...` keeps its first word.
#[must_use]
pub fn strip_mentions(text: &str) -> String {
    if contains_mention(text) {
        USER_MENTION.replace_all(text, "").trim().to_string()
    } else {
        LEADING_PLAIN_MENTION.replace(text, "").trim().to_string()
    }
}

/// Whether the bridge should act on this event at all
///
/// Plain messages are skipped when a bot wrote them, when they carry a
/// subtype (edits, joins, ...), or when they mention someone: mentions of the
/// bot arrive separately as mention events.
#[must_use]
pub fn should_handle(event: &ChatEvent) -> bool {
    match event.kind {
        EventKind::Mention => true,
        EventKind::Message => {
            event.bot_id.is_none() && event.subtype.is_none() && !contains_mention(&event.text)
        }
    }
}

/// The question carried by an event
#[must_use]
pub fn extract_question(event: &ChatEvent) -> String {
    match event.kind {
        EventKind::Mention => strip_mentions(&event.text),
        EventKind::Message => event.text.trim().to_string(),
    }
}
