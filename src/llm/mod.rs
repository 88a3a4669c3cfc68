//! Language-model boundary: contracts, built-in prompts, and the
//! Ollama-backed client.

pub mod contract;
pub mod ollama;
pub mod prompts;

pub use contract::{FieldSpec, LanguageModel, PromptContract, StructuredOutput};
pub use ollama::{OllamaClient, OllamaConfig};
