//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~2 characters per token, a middle
//! ground between CJK text (closer to 1.5) and English (closer to 4).

use petmind_core::ChatTurn;

/// Estimate the token count for a string. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(2)
}

/// Estimate tokens for a whole request: system prompt, user turn and history.
pub fn estimate_bundle_tokens(
    system_prompt: &str,
    user_message: &str,
    history: &[ChatTurn],
) -> usize {
    let chars = system_prompt.chars().count()
        + user_message.chars().count()
        + history
            .iter()
            .map(|turn| turn.content.chars().count())
            .sum::<usize>();
    chars.div_ceil(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn counts_chars_not_bytes() {
        assert_eq!(estimate_tokens("你好"), 1);
        assert_eq!(estimate_tokens("你好呀"), 2);
    }

    #[test]
    fn bundle_sums_all_parts() {
        let history = vec![ChatTurn::user("abcd"), ChatTurn::assistant("ef")];
        // 3 + 2 + 6 = 11 chars
        assert_eq!(estimate_bundle_tokens("abc", "de", &history), 6);
    }
}
