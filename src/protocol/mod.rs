//! Wire-format types for the two protocols the relay sits between:
//! the Anthropic Messages API on the client side and the Venice
//! (OpenAI-compatible) chat completions API on the upstream side.

pub mod anthropic;
pub mod mapping;
pub mod openai;
