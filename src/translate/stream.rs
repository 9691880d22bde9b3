//! Streaming re-framer: consumes raw SSE bytes in the OpenAI chunk
//! format and produces Anthropic-style SSE event frames.
//!
//! Feeding is chunk-boundary agnostic. A line split across two chunks
//! is carried over in `line_buffer` and re-parsed once the newline
//! arrives, so the emitted event sequence depends only on the byte
//! stream, not on how the network happened to slice it.

use bytes::Bytes;
use memchr::memchr_iter;

use crate::protocol::anthropic::{
    BlockDelta, ErrorBody, MessageDeltaBody, MessageStartBody, OutputUsage, ResponseBlock,
    StreamEvent, Usage,
};
use crate::protocol::mapping::finish_reason_to_stop_reason;
use crate::protocol::openai::StreamChunk;
use crate::translate::response::unix_millis;

pub struct StreamTranslator {
    message_id: String,
    model: String,
    line_buffer: Vec<u8>,
    sent_message_start: bool,
    block_index: usize,
    block_open: bool,
    input_json_buffer: String,
    ended: bool,
}

impl StreamTranslator {
    #[must_use]
    pub fn new(model: String, message_id: String) -> Self {
        Self {
            message_id,
            model,
            line_buffer: Vec::new(),
            sent_message_start: false,
            block_index: 0,
            block_open: false,
            input_json_buffer: String::new(),
            ended: false,
        }
    }

    /// True once the terminating triple or an error event went out.
    #[must_use]
    pub fn ended(&self) -> bool {
        self.ended
    }

    /// Consume a chunk of upstream bytes, appending any completed
    /// event frames to `out`. No-op after termination.
    pub fn feed(&mut self, chunk: &[u8], out: &mut Vec<Bytes>) {
        if self.ended {
            return;
        }
        let mut buffer = std::mem::take(&mut self.line_buffer);
        buffer.extend_from_slice(chunk);

        let mut start = 0;
        for newline in memchr_iter(b'\n', &buffer) {
            let line = &buffer[start..newline];
            start = newline + 1;
            let line = String::from_utf8_lossy(line);
            if self.process_line(line.trim_end_matches('\r'), out) {
                // Terminated, anything after the final chunk is noise.
                return;
            }
        }
        self.line_buffer = buffer.split_off(start);
    }

    /// Handle one SSE line. Returns true when the stream terminated.
    fn process_line(&mut self, line: &str, out: &mut Vec<Bytes>) -> bool {
        let Some(payload) = line.strip_prefix("data: ") else {
            return false;
        };
        let payload = payload.trim();
        if payload == "[DONE]" {
            self.finish("end_turn", out);
            return true;
        }
        let Ok(chunk) = serde_json::from_str::<StreamChunk>(payload) else {
            return false;
        };

        if !self.sent_message_start {
            self.sent_message_start = true;
            self.emit(
                &StreamEvent::MessageStart {
                    message: MessageStartBody {
                        id: self.message_id.clone(),
                        type_: "message".to_string(),
                        role: "assistant".to_string(),
                        model: self.model.clone(),
                        content: Vec::new(),
                        stop_reason: None,
                        usage: Usage {
                            input_tokens: 0,
                            output_tokens: 0,
                        },
                    },
                },
                out,
            );
        }

        let Some(choice) = chunk.choices.first() else {
            return false;
        };

        if let Some(text) = &choice.delta.content {
            // Switching back to text after tool-call deltas closes the
            // tool block even though both are "open" states.
            if !self.block_open || !self.input_json_buffer.is_empty() {
                self.close_open_block(out);
                self.emit(
                    &StreamEvent::ContentBlockStart {
                        index: self.block_index,
                        content_block: ResponseBlock::Text {
                            text: String::new(),
                        },
                    },
                    out,
                );
                self.block_open = true;
                self.input_json_buffer.clear();
            }
            self.emit(
                &StreamEvent::ContentBlockDelta {
                    index: self.block_index,
                    delta: BlockDelta::TextDelta { text: text.clone() },
                },
                out,
            );
        }

        if let Some(tool_calls) = &choice.delta.tool_calls {
            for tc in tool_calls {
                let function = tc.function.clone().unwrap_or_default();
                if let Some(name) = function.name.as_deref().filter(|n| !n.is_empty()) {
                    self.close_open_block(out);
                    let id = tc
                        .id
                        .clone()
                        .filter(|id| !id.is_empty())
                        .unwrap_or_else(fallback_tool_id);
                    self.emit(
                        &StreamEvent::ContentBlockStart {
                            index: self.block_index,
                            content_block: ResponseBlock::ToolUse {
                                id,
                                name: name.to_string(),
                                input: serde_json::json!({}),
                            },
                        },
                        out,
                    );
                    self.block_open = true;
                    self.input_json_buffer.clear();
                }
                if let Some(arguments) = function.arguments.as_deref().filter(|a| !a.is_empty()) {
                    self.input_json_buffer.push_str(arguments);
                    self.emit(
                        &StreamEvent::ContentBlockDelta {
                            index: self.block_index,
                            delta: BlockDelta::InputJsonDelta {
                                partial_json: arguments.to_string(),
                            },
                        },
                        out,
                    );
                }
            }
        }

        if let Some(finish_reason) = choice.finish_reason.as_deref() {
            self.finish(finish_reason_to_stop_reason(finish_reason), out);
            return true;
        }
        false
    }

    fn close_open_block(&mut self, out: &mut Vec<Bytes>) {
        if self.block_open {
            self.emit(
                &StreamEvent::ContentBlockStop {
                    index: self.block_index,
                },
                out,
            );
            self.block_open = false;
            self.block_index += 1;
        }
    }

    /// Emit the terminating triple. Idempotent, later calls no-op.
    pub fn finish(&mut self, stop_reason: &str, out: &mut Vec<Bytes>) {
        if self.ended {
            return;
        }
        self.close_open_block(out);
        self.emit(
            &StreamEvent::MessageDelta {
                delta: MessageDeltaBody {
                    stop_reason: stop_reason.to_string(),
                },
                usage: OutputUsage { output_tokens: 0 },
            },
            out,
        );
        self.emit(&StreamEvent::MessageStop {}, out);
        self.ended = true;
    }

    /// Emit an error event and terminate. No-op once ended.
    pub fn fail(&mut self, error_type: &str, message: &str, out: &mut Vec<Bytes>) {
        if self.ended {
            return;
        }
        self.emit(
            &StreamEvent::Error {
                error: ErrorBody {
                    type_: error_type.to_string(),
                    message: message.to_string(),
                },
            },
            out,
        );
        self.ended = true;
    }

    fn emit(&self, event: &StreamEvent, out: &mut Vec<Bytes>) {
        out.push(Bytes::from(encode_event_frame(event)));
    }
}

fn fallback_tool_id() -> String {
    format!("toolu_{}", unix_millis())
}

/// Frame an event for the wire: `event:` line, `data:` line, blank line.
#[must_use]
pub fn encode_event_frame(event: &StreamEvent) -> String {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    format!("event: {}\ndata: {}\n\n", event.event_name(), data)
}
