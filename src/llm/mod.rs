//! Bundled LLM clients. The engine talks to any [`LlmClient`]
//! (crate::collaborator::LlmClient); this module ships an OpenAI-compatible
//! implementation over the chat-completions API.

pub mod openai;

pub use openai::{OpenAiClient, OpenAiConfig};
