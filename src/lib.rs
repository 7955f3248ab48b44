//! ai-cli - natural-language to shell command resolver
//!
//! Resolves an instruction such as "list all files in the current directory"
//! into a command line while keeping calls to the LLM backend to a minimum.
//!
//! # Architecture
//!
//! - **Normalization**: instructions are reduced to a canonical key
//!   (lowercase, no punctuation or stopwords, synonyms folded, words sorted)
//! - **Sharded cache**: backend answers are kept in N independently locked
//!   LRU shards with a TTL, and a background reaper drops expired entries
//! - **Command catalog**: CSV files of command/description pairs, matched by
//!   edit-distance similarity
//! - **Backends**: Ollama (streaming) and OpenAI-compatible chat APIs
//!
//! # Main modules
//!
//! - [`agent`] - Resolver, backends and prompts
//! - [`cache`] - Sharded TTL/LRU cache and its reaper
//! - [`dataset`] - Static command catalog
//! - [`text`] - Normalization and similarity
//! - [`app`] - Process-wide context wiring everything together
//!
//! # Example
//!
//! ```rust,no_run
//! use ai_cli::{app::App, config::AppConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut app = App::start(AppConfig::load(None)?);
//! let resolution = app.resolve("show disk usage of this folder").await?;
//! println!("{} (from {})", resolution.text, resolution.source);
//! app.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod app;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod history;
pub mod logging;
pub mod text;
pub mod tools;

pub use agent::{Resolution, ResolutionSource, Resolver};
pub use app::App;
pub use cache::ShardedCache;
pub use config::AppConfig;
pub use dataset::DatasetIndex;
