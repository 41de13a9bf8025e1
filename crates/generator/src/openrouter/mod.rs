//! OpenAI-compatible chat completions client (OpenRouter and proxies in front of it)

pub mod client;
pub mod types;

pub use client::{ChatClient, LlmGenerator};
pub use types::*;
