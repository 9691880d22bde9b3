//! Chat completions response to Anthropic Messages response.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::protocol::anthropic::{MessagesResponse, ResponseBlock, Usage};
use crate::protocol::mapping::finish_reason_to_stop_reason;
use crate::protocol::openai::ChatResponse;

/// Translate a buffered chat completions response. The result always
/// carries at least one content block.
#[must_use]
pub fn translate_response(response: &ChatResponse, model: &str) -> MessagesResponse {
    let id = if response.id.is_empty() {
        fallback_message_id()
    } else {
        response.id.clone()
    };
    let Some(choice) = response.choices.first() else {
        return MessagesResponse {
            id,
            type_: "message".to_string(),
            role: "assistant".to_string(),
            model: model.to_string(),
            content: vec![ResponseBlock::Text {
                text: String::new(),
            }],
            stop_reason: Some("end_turn".to_string()),
            usage: Usage {
                input_tokens: 0,
                output_tokens: 0,
            },
        };
    };

    let usage = response.usage.clone().unwrap_or_default();

    let mut content = Vec::new();
    if let Some(text) = &choice.message.content {
        if !text.is_empty() {
            content.push(ResponseBlock::Text { text: text.clone() });
        }
    }
    if let Some(tool_calls) = &choice.message.tool_calls {
        for call in tool_calls {
            let input = serde_json::from_str::<Value>(&call.function.arguments)
                .unwrap_or_else(|_| serde_json::json!({}));
            content.push(ResponseBlock::ToolUse {
                id: call.id.clone(),
                name: call.function.name.clone(),
                input,
            });
        }
    }
    if content.is_empty() {
        content.push(ResponseBlock::Text {
            text: String::new(),
        });
    }

    let stop_reason = finish_reason_to_stop_reason(choice.finish_reason.as_deref().unwrap_or(""));

    MessagesResponse {
        id,
        type_: "message".to_string(),
        role: "assistant".to_string(),
        model: model.to_string(),
        content,
        stop_reason: Some(stop_reason.to_string()),
        usage: Usage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        },
    }
}

pub(crate) fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

fn fallback_message_id() -> String {
    format!("msg_{}", unix_millis())
}
