//! Text-generation collaborators: the chat-model trait, the
//! OpenAI-compatible provider, and the retrying structured extractor.

pub mod extract;
pub mod model;
pub mod providers;

pub use {
    extract::{ExtractError, extract_json},
    model::{ChatMessage, ChatModel, GenerationError},
    providers::openai::OpenAiChat,
};
