// crates/core/src/lib.rs
//! Collaborators for the storybook generator: page parsing, prompt building,
//! text generation, moderation and image generation.

pub mod illustration;
pub mod llm;
pub mod pages;
pub mod prompts;

pub use illustration::{create_image_generator, ImageBackend, ImageConfig, ImageError, ImageGenerator};
pub use llm::{
    CompletionRequest, CompletionResponse, LlmConfig, LlmError, LlmProvider, ModerationProvider,
    ModerationVerdict, ProviderType,
};
pub use pages::parse_pages;
