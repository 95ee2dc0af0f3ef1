//! Approximate token accounting for history budgeting.
//!
//! Exact tokenization is model-specific; for budgeting purposes a chars/4
//! heuristic is close enough and keeps this crate free of tokenizer
//! dependencies. Both `load_recent` and `prune` share the suffix selection
//! here so the two can never disagree about which messages survive.

use agentry_types::chat::ChatMessage;

/// Fixed per-message overhead (role, framing) in approximate tokens.
const MESSAGE_OVERHEAD: u32 = 4;

/// Approximate token count for a text: ceil(chars / 4), minimum 1.
pub fn approximate_tokens(text: &str) -> u32 {
    let chars = text.chars().count() as u32;
    (chars.div_ceil(4)).max(1)
}

/// Approximate token cost of one stored message.
pub fn message_tokens(message: &ChatMessage) -> u32 {
    approximate_tokens(&message.content) + MESSAGE_OVERHEAD
}

/// The smallest `seq` kept by the budgeted suffix, given the chat's messages
/// in DESC seq order. Walks from the newest message backwards, stopping
/// before the message that would overflow `token_budget`; the newest message
/// is always kept even when it alone exceeds the budget.
///
/// Returns None for an empty chat.
pub fn budget_cutoff_seq(messages_desc: &[ChatMessage], token_budget: u32) -> Option<i64> {
    let mut spent: u64 = 0;
    let mut cutoff = None;
    for (i, message) in messages_desc.iter().enumerate() {
        spent += u64::from(message_tokens(message));
        if i > 0 && spent > u64::from(token_budget) {
            break;
        }
        cutoff = Some(message.seq);
    }
    cutoff
}

/// Select the budgeted suffix from messages in DESC seq order, returning it
/// in chronological (ASC) order.
pub fn take_recent_within_budget(
    mut messages_desc: Vec<ChatMessage>,
    token_budget: u32,
) -> Vec<ChatMessage> {
    let Some(cutoff) = budget_cutoff_seq(&messages_desc, token_budget) else {
        return Vec::new();
    };
    messages_desc.retain(|m| m.seq >= cutoff);
    messages_desc.reverse();
    messages_desc
}
