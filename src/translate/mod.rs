//! Translation between the Anthropic Messages protocol and the
//! OpenAI-compatible chat completions protocol, in both directions and
//! for both buffered and streaming responses.

pub mod request;
pub mod response;
pub mod stream;
