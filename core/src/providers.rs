use async_trait::async_trait;

use crate::errors::ProviderResult;
use crate::types::CachedPaper;

/// Search side of the external world: given a query, return raw paper
/// records in relevance order. Callers must not assume success — the
/// upstream is rate limited and occasionally errors.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> ProviderResult<Vec<CachedPaper>>;
}

/// Generation side of the external world: turn a prompt into text.
/// May legitimately return an empty string; callers decide the fallback.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> ProviderResult<String>;
}
