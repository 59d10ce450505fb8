//! Dwell LLM crate - generative collaborators over an OpenAI-compatible
//! chat-completions endpoint.
//!
//! [`LlmAgent`] implements filter extraction, query synthesis, query repair
//! and response wording. Prompts live in [`prompts`]; transport and response
//! parsing live in [`client`].

pub mod agent;
pub mod client;
pub mod error;
pub mod prompts;

pub use agent::LlmAgent;
pub use client::{strip_code_fences, ChatClient};
pub use error::LlmError;
