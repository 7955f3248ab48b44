//! Instruction resolution
//!
//! - [`resolver::Resolver`] - cache, dataset and backend, in that order
//! - [`provider`] - LLM backends (Ollama, OpenAI)
//! - [`prompts`] - prompts sent to the backends

pub mod prompts;
pub mod provider;
pub mod resolver;

pub use provider::{create_provider, ModelProvider, ProviderError};
pub use resolver::{Resolution, ResolutionSource, Resolver, ResolverConfig};
