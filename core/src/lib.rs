// Provider clients and shared domain types for the papers suite:
// - arXiv search client (Atom feed over HTTP)
// - Gemini generation client
// - CachedPaper data model and configuration

pub mod arxiv;
pub mod client;
pub mod config;
pub mod errors;
pub mod providers;
pub mod types;

pub use arxiv::ArxivClient;
pub use client::GeminiClient;
pub use config::PapersConfig;
pub use errors::{ProviderError, ProviderResult};
pub use providers::{SearchProvider, TextGenerator};
pub use types::CachedPaper;
