//! Cross-protocol vocabulary mapping.

/// Map an OpenAI-style finish reason to the Anthropic stop reason.
/// Total over all inputs, unknown reasons map to `end_turn`.
#[must_use]
pub fn finish_reason_to_stop_reason(finish_reason: &str) -> &'static str {
    match finish_reason {
        "stop" => "end_turn",
        "length" => "max_tokens",
        "tool_calls" => "tool_use",
        "content_filter" => "end_turn",
        _ => "end_turn",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_finish_reasons() {
        assert_eq!(finish_reason_to_stop_reason("stop"), "end_turn");
        assert_eq!(finish_reason_to_stop_reason("length"), "max_tokens");
        assert_eq!(finish_reason_to_stop_reason("tool_calls"), "tool_use");
        assert_eq!(finish_reason_to_stop_reason("content_filter"), "end_turn");
    }

    #[test]
    fn test_unknown_finish_reason_defaults_to_end_turn() {
        assert_eq!(finish_reason_to_stop_reason(""), "end_turn");
        assert_eq!(finish_reason_to_stop_reason("eos_token"), "end_turn");
    }
}
