//! Configuration module for Scout.
//!
//! Handles loading settings, API credentials and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, Prompts};
pub use settings::{
    AgentSettings, Credentials, EmbeddingSettings, GeneralSettings, LlmSettings, PromptSettings,
    RetrievalSettings, RetrySettings, SearchSettings, ServerSettings, Settings,
    VectorStoreSettings,
};
