//! Token estimation and overflow detection for context window.
//!
//! Uses a heuristic (~4 chars per token) over message content.

use crate::message::Message;

/// Heuristic: approximate characters per token for English/mixed text.
const CHARS_PER_TOKEN: u32 = 4;

/// Heuristic token estimate: ~4 characters per token, summed over every message's content.
pub fn estimate_tokens(messages: &[Message]) -> u32 {
    let total: usize = messages.iter().map(|m| m.content().len()).sum();
    (total / CHARS_PER_TOKEN as usize) as u32
}

/// Input for overflow check: only the fields needed to decide if context overflows.
#[derive(Debug)]
pub struct ContextWindowCheck<'a> {
    pub messages: &'a [Message],
    pub max_context_tokens: u32,
    pub reserve_tokens: u32,
}

/// Overflow when the estimated token count plus the generation reserve exceeds the limit.
pub fn is_overflow(input: &ContextWindowCheck<'_>) -> bool {
    estimate_tokens(input.messages) + input.reserve_tokens > input.max_context_tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_tokens_empty_is_zero() {
        assert_eq!(estimate_tokens(&[]), 0);
    }

    #[test]
    fn estimate_tokens_uses_four_chars_per_token() {
        let msgs = vec![Message::user("12345678")];
        assert_eq!(estimate_tokens(&msgs), 2);
    }

    #[test]
    fn estimate_tokens_sums_all_messages() {
        let msgs = vec![
            Message::system("ab"),
            Message::user("cdef"),
            Message::assistant("ghij"),
        ];
        assert_eq!(estimate_tokens(&msgs), 2);
    }

    #[test]
    fn is_overflow_true_past_limit() {
        let messages = vec![Message::user("x".repeat(400))];
        let input = ContextWindowCheck {
            messages: &messages,
            max_context_tokens: 100,
            reserve_tokens: 10,
        };
        assert!(is_overflow(&input));
    }

    #[test]
    fn is_overflow_false_under_limit() {
        let messages = vec![Message::user("x".repeat(100))];
        let input = ContextWindowCheck {
            messages: &messages,
            max_context_tokens: 1000,
            reserve_tokens: 10,
        };
        assert!(!is_overflow(&input));
    }
}
