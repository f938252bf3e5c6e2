//! Language-model integration.
//!
//! - [`client`]: the chat-completion transport ([`ChatBackend`] and the
//!   OpenAI-compatible HTTP implementation)
//! - [`prompts`]: typed prompt templates
//! - [`copilot`]: insight, question, recommendation and explanation flows
//!   that combine a [`crate::session::Session`] with a backend

pub mod client;
pub mod copilot;
pub mod prompts;

pub use client::{ChatBackend, ChatMessage, CompletionOptions, OpenAiClient};
pub use copilot::{Copilot, InsightKind, RecommendationKind};
