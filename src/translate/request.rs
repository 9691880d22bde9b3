//! Anthropic Messages request to chat completions request.

use serde_json::Value;

use crate::protocol::anthropic::{
    ContentBlock, Message, MessageContent, MessagesRequest, SystemPrompt, Tool, ToolChoice,
    ToolResultContent,
};
use crate::protocol::openai::{
    ChatMessage, ChatRequest, FunctionDef, FunctionName, ToolCall, ToolCallFunction,
    ToolChoiceValue, ToolSchema, VeniceParameters,
};

/// Translate a Messages request into a chat completions request.
#[must_use]
pub fn translate_request(request: &MessagesRequest) -> ChatRequest {
    let mut messages = Vec::new();

    if let Some(system) = &request.system {
        if let Some(text) = system_text(system) {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: Some(text),
                ..ChatMessage::default()
            });
        }
    }
    messages.extend(translate_messages(&request.messages));

    // Tool fields only go out when at least one tool is offered.
    let tools = request.tools.as_deref().filter(|tools| !tools.is_empty());
    let tool_choice = tools.and_then(|_| translate_tool_choice(request.tool_choice.as_ref()));

    ChatRequest {
        model: request.model.clone(),
        messages,
        max_tokens: request.max_tokens,
        stream: request.stream.unwrap_or(false),
        temperature: request.temperature,
        top_p: request.top_p,
        stop: request.stop_sequences.clone(),
        tools: tools.map(translate_tools),
        tool_choice,
        venice_parameters: VeniceParameters {
            include_venice_system_prompt: false,
        },
    }
}

fn system_text(system: &SystemPrompt) -> Option<String> {
    match system {
        SystemPrompt::Text(text) => Some(text.clone()),
        SystemPrompt::Segments(segments) => Some(
            segments
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        SystemPrompt::Other(_) => None,
    }
}

/// Translate the conversation history. Each Anthropic message may fan
/// out into several chat messages (tool results become `tool`-role
/// messages of their own), or none at all for unknown roles.
#[must_use]
pub fn translate_messages(messages: &[Message]) -> Vec<ChatMessage> {
    let mut out = Vec::new();
    for message in messages {
        match message.role.as_str() {
            "user" => translate_user_message(&message.content, &mut out),
            "assistant" => translate_assistant_message(&message.content, &mut out),
            _ => {}
        }
    }
    out
}

fn translate_user_message(content: &MessageContent, out: &mut Vec<ChatMessage>) {
    match content {
        MessageContent::Text(text) => out.push(ChatMessage {
            role: "user".to_string(),
            content: Some(text.clone()),
            ..ChatMessage::default()
        }),
        MessageContent::Blocks(blocks) => {
            let has_tool_results = blocks
                .iter()
                .any(|b| matches!(b, ContentBlock::ToolResult { .. }));
            let has_text = blocks.iter().any(|b| matches!(b, ContentBlock::Text { .. }));

            if has_tool_results || has_text {
                for block in blocks {
                    if let ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                    } = block
                    {
                        out.push(ChatMessage {
                            role: "tool".to_string(),
                            content: Some(tool_result_text(content.as_ref())),
                            tool_call_id: Some(tool_use_id.clone().unwrap_or_default()),
                            ..ChatMessage::default()
                        });
                    }
                }
                let text = blocks
                    .iter()
                    .filter_map(|b| match b {
                        ContentBlock::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                if !text.is_empty() {
                    out.push(ChatMessage {
                        role: "user".to_string(),
                        content: Some(text),
                        ..ChatMessage::default()
                    });
                }
            } else {
                // No recognizable blocks, forward a best-effort rendering.
                let text = blocks
                    .iter()
                    .map(|b| match b {
                        ContentBlock::Text { text } => text.clone(),
                        other => block_json_repr(other),
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                out.push(ChatMessage {
                    role: "user".to_string(),
                    content: Some(text),
                    ..ChatMessage::default()
                });
            }
        }
        // Content that is neither a string nor a block array is dropped.
        MessageContent::Other(_) => {}
    }
}

fn block_json_repr(block: &ContentBlock) -> String {
    match block {
        ContentBlock::Other(value) => value.to_string(),
        ContentBlock::ToolUse { id, name, input } => serde_json::json!({
            "type": "tool_use",
            "id": id,
            "name": name,
            "input": input,
        })
        .to_string(),
        _ => String::new(),
    }
}

fn tool_result_text(content: Option<&ToolResultContent>) -> String {
    match content {
        Some(ToolResultContent::Text(text)) => text.clone(),
        Some(ToolResultContent::Blocks(blocks)) => blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Some(ToolResultContent::Other(_)) | None => String::new(),
    }
}

fn translate_assistant_message(content: &MessageContent, out: &mut Vec<ChatMessage>) {
    match content {
        MessageContent::Text(text) => out.push(ChatMessage {
            role: "assistant".to_string(),
            content: Some(text.clone()),
            ..ChatMessage::default()
        }),
        MessageContent::Blocks(blocks) => {
            let text_parts: Vec<&str> = blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect();
            // An empty join collapses to null content, as with a pure
            // tool-call turn.
            let joined = text_parts.join("\n");
            let text = if joined.is_empty() { None } else { Some(joined) };

            let tool_calls: Vec<ToolCall> = blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                        id: id.clone().unwrap_or_else(fallback_call_id),
                        type_: "function".to_string(),
                        function: ToolCallFunction {
                            name: name.clone().unwrap_or_default(),
                            arguments: tool_arguments(input.as_ref()),
                        },
                    }),
                    _ => None,
                })
                .collect();

            out.push(ChatMessage {
                role: "assistant".to_string(),
                content: text,
                tool_calls: if tool_calls.is_empty() {
                    None
                } else {
                    Some(tool_calls)
                },
                tool_call_id: None,
            });
        }
        MessageContent::Other(_) => {}
    }
}

fn tool_arguments(input: Option<&Value>) -> String {
    match input {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "{}".to_string(),
        Some(other) => other.to_string(),
    }
}

fn fallback_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

/// Translate tool definitions into function schemas.
#[must_use]
pub fn translate_tools(tools: &[Tool]) -> Vec<ToolSchema> {
    tools
        .iter()
        .map(|tool| ToolSchema {
            type_: "function".to_string(),
            function: FunctionDef {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        })
        .collect()
}

/// Translate the tool choice directive. Absent means `auto`, and an
/// unrecognized shape omits the field entirely.
#[must_use]
pub fn translate_tool_choice(choice: Option<&ToolChoice>) -> Option<ToolChoiceValue> {
    match choice {
        None => Some(ToolChoiceValue::Mode("auto".to_string())),
        Some(ToolChoice::Auto) => Some(ToolChoiceValue::Mode("auto".to_string())),
        Some(ToolChoice::Any) => Some(ToolChoiceValue::Mode("required".to_string())),
        Some(ToolChoice::Tool { name }) => Some(ToolChoiceValue::Function {
            type_: "function".to_string(),
            function: FunctionName { name: name.clone() },
        }),
        Some(ToolChoice::Other(_)) => None,
    }
}
