//! Prompt system for the NSS query pipeline.
//!
//! - YAML-based prompt definitions, built in and overridable per workspace
//! - Strict Handlebars rendering of system and user templates

pub mod builder;
pub mod loader;
pub mod types;

pub use builder::build_prompt;
pub use loader::{builtin_prompt, load_prompt, INTERPRET_PROMPT_ID, SYNTHESIZE_PROMPT_ID};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptOutputSpec, PromptParameters,
    PromptSource,
};
