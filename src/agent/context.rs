//! Outgoing message assembly and history windowing.
//!
//! Stored history is never pruned. Each turn sends only the most recent
//! `max_history_length` stored messages, framed by the instruction text and
//! the new user message.

use crate::providers::Message;

/// Approximate characters per token, used only for log fields.
///
/// Conservative for CJK text, where a token is often a single character.
const CHARS_PER_TOKEN: u64 = 2;

/// The last `max` entries of `history` (all of it when shorter).
pub fn history_window<T>(history: &[T], max: usize) -> &[T] {
    let start = history.len().saturating_sub(max);
    history.get(start..).unwrap_or_default()
}

/// Build the message list for one turn.
///
/// Order: instruction text, windowed history, new user message. Blank
/// messages are dropped at every position.
pub fn build_outgoing_messages<'a>(
    instruction: &str,
    recent_history: impl IntoIterator<Item = &'a Message>,
    user_text: &str,
) -> Vec<Message> {
    std::iter::once(Message::system(instruction))
        .chain(recent_history.into_iter().cloned())
        .chain(std::iter::once(Message::user(user_text)))
        .filter(|message| !message.is_blank())
        .collect()
}

/// Estimate tokens for a slice of messages.
pub fn estimate_messages_tokens(messages: &[Message]) -> u64 {
    messages.iter().map(estimate_message_tokens).sum()
}

fn estimate_message_tokens(message: &Message) -> u64 {
    let char_count = u64::try_from(message.content.chars().count()).unwrap_or(u64::MAX);
    char_count.saturating_add(CHARS_PER_TOKEN.saturating_sub(1)) / CHARS_PER_TOKEN
}
