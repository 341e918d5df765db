//! LLM integration crate.
//!
//! A provider-agnostic [`LlmClient`] trait with two implementations:
//! - **OpenAI-compatible** chat completions (OpenRouter, OpenAI)
//! - **Ollama** local runtime
//!
//! # Example
//! ```no_run
//! use nss_llm::{create_client, LlmRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = create_client("ollama", None, None, 60)?;
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;
