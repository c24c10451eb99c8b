use log::{info, warn};
use std::sync::Arc;

use papers_core::{CachedPaper, ProviderResult, SearchProvider, TextGenerator};

use crate::server::analysis::{self, AnalysisKind, ANALYSIS_UNAVAILABLE};
use crate::server::cache::PaperCache;
use crate::server::intent;

/// Requested result counts are clamped into this range server-side, no
/// matter what the host asked for — protects downstream formatting and the
/// search provider's quota.
pub const MIN_RESULTS: usize = 1;
pub const MAX_RESULTS: usize = 10;

/// How many results an auto-triggered chat search fetches.
const CHAT_SEARCH_RESULTS: i64 = 5;

/// Shown when the generator returns no usable chat text.
pub const CHAT_UNAVAILABLE: &str = "Could not generate a response.";

pub fn clamp_max_results(requested: i64) -> usize {
    requested.clamp(MIN_RESULTS as i64, MAX_RESULTS as i64) as usize
}

/// The server's business logic and state, constructed once at startup and
/// handed by reference into every tool handler. Owns the result cache and
/// the two provider clients; nothing here is a process-wide global.
pub struct PapersService {
    cache: PaperCache,
    search: Arc<dyn SearchProvider>,
    generator: Arc<dyn TextGenerator>,
}

impl PapersService {
    pub fn new(search: Arc<dyn SearchProvider>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            cache: PaperCache::new(),
            search,
            generator,
        }
    }

    pub fn cache(&self) -> &PaperCache {
        &self.cache
    }

    /// Run a search and atomically replace the cache with the results.
    /// The effective count is the requested one clamped into
    /// `[MIN_RESULTS, MAX_RESULTS]`.
    pub async fn search_papers(
        &self,
        query: &str,
        requested: i64,
    ) -> ProviderResult<Vec<CachedPaper>> {
        let limit = clamp_max_results(requested);
        info!("Searching papers: '{}' (limit {})", query, limit);

        let mut papers = self.search.search(query, limit).await?;
        papers.truncate(limit);

        info!("Found {} relevant papers", papers.len());
        self.cache.replace(papers.clone());
        Ok(papers)
    }

    /// Run one analysis strategy over the given papers. The caller has
    /// already rejected the empty case; this never mutates the cache.
    pub async fn analyze(
        &self,
        kind: AnalysisKind,
        papers: &[CachedPaper],
    ) -> ProviderResult<String> {
        let context = analysis::format_papers_context(papers);
        let prompt = analysis::analysis_prompt(kind, &context);

        let text = self.generator.generate(&prompt).await?;
        if text.trim().is_empty() {
            warn!("Generator returned empty analysis text");
            return Ok(ANALYSIS_UNAVAILABLE.to_string());
        }
        Ok(text)
    }

    /// Answer a free-form question. When the message reads as a search
    /// request, a search runs first (repopulating the cache) and the
    /// answer draws on the fresh results; otherwise the current cache is
    /// the context. Returns the answer and how many papers were in
    /// context.
    pub async fn chat(&self, message: &str) -> ProviderResult<(String, usize)> {
        let prompt = match intent::detect_search_intent(message) {
            Some(query) => {
                info!("Chat message triggered a search for '{}'", query);
                let papers = self.search_papers(&query, CHAT_SEARCH_RESULTS).await?;
                if papers.is_empty() {
                    format!(
                        "User question: {}\n\n\
                         No papers were found on this topic. Suggest alternatives \
                         or provide general information about the topic.",
                        message
                    )
                } else {
                    format!(
                        "User question: {}\n\n\
                         Papers found:\n{}\n\
                         Answer clearly and informatively about the papers found.",
                        message,
                        analysis::format_papers_context(&papers)
                    )
                }
            }
            None => {
                let papers = self.cache.snapshot();
                if papers.is_empty() {
                    format!(
                        "User question: {}\n\n\
                         Answer as an assistant specialized in academic papers. \
                         Suggest running a search if that would help.",
                        message
                    )
                } else {
                    format!(
                        "User question: {}\n\n\
                         Papers available as context:\n{}\n\
                         Answer based on the available papers.",
                        message,
                        analysis::format_papers_context(&papers)
                    )
                }
            }
        };

        let text = self.generator.generate(&prompt).await?;
        let answer = if text.trim().is_empty() {
            warn!("Generator returned empty chat text");
            CHAT_UNAVAILABLE.to_string()
        } else {
            text
        };
        Ok((answer, self.cache.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::testing::{papers_fixture, FakeGenerator, FakeSearch};

    fn service(search: FakeSearch, generator: FakeGenerator) -> PapersService {
        PapersService::new(Arc::new(search), Arc::new(generator))
    }

    #[test]
    fn requested_counts_clamp_into_range() {
        assert_eq!(clamp_max_results(-3), 1);
        assert_eq!(clamp_max_results(0), 1);
        assert_eq!(clamp_max_results(1), 1);
        assert_eq!(clamp_max_results(5), 5);
        assert_eq!(clamp_max_results(10), 10);
        assert_eq!(clamp_max_results(50), 10);
    }

    #[tokio::test]
    async fn search_replaces_cache_with_new_batch() {
        let svc = service(
            FakeSearch::returning(papers_fixture(3)),
            FakeGenerator::saying("ok"),
        );

        svc.search_papers("quantum", 3).await.unwrap();
        assert_eq!(svc.cache().len(), 3);

        // A second search fully discards the first batch.
        svc.search_papers("neural", 2).await.unwrap();
        assert_eq!(svc.cache().len(), 2);
    }

    #[tokio::test]
    async fn search_passes_clamped_limit_to_provider() {
        let search = FakeSearch::returning(papers_fixture(10));
        let seen = search.seen_limits();
        let svc = service(search, FakeGenerator::saying("ok"));

        svc.search_papers("q", 99).await.unwrap();
        svc.search_papers("q", -1).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![10, 1]);
    }

    #[tokio::test]
    async fn search_failure_leaves_error_not_fabricated_data() {
        let svc = service(FakeSearch::failing(), FakeGenerator::saying("ok"));
        assert!(svc.search_papers("q", 5).await.is_err());
        assert!(svc.cache().is_empty());
    }

    #[tokio::test]
    async fn empty_generation_falls_back_to_unavailable_text() {
        let svc = service(
            FakeSearch::returning(vec![]),
            FakeGenerator::saying("   \n"),
        );
        let papers = papers_fixture(2);
        let text = svc.analyze(AnalysisKind::Summary, &papers).await.unwrap();
        assert_eq!(text, ANALYSIS_UNAVAILABLE);
    }

    #[tokio::test]
    async fn chat_with_search_intent_repopulates_cache() {
        let generator = FakeGenerator::saying("answer");
        let prompts = generator.seen_prompts();
        let svc = service(FakeSearch::returning(papers_fixture(4)), generator);

        let (answer, in_context) = svc.chat("find papers about quantum computing").await.unwrap();
        assert_eq!(answer, "answer");
        assert_eq!(in_context, 4);
        assert_eq!(svc.cache().len(), 4);
        assert!(prompts.lock().unwrap()[0].contains("Papers found:"));
    }

    #[tokio::test]
    async fn chat_without_intent_uses_cache_context() {
        let generator = FakeGenerator::saying("answer");
        let prompts = generator.seen_prompts();
        let svc = service(FakeSearch::returning(papers_fixture(2)), generator);

        svc.search_papers("q", 2).await.unwrap();
        let (_, in_context) = svc.chat("what methods do they use?").await.unwrap();
        assert_eq!(in_context, 2);
        let prompt = prompts.lock().unwrap().last().unwrap().clone();
        assert!(prompt.contains("Papers available as context:"));
    }

    #[tokio::test]
    async fn chat_on_empty_cache_answers_generically() {
        let generator = FakeGenerator::saying("answer");
        let prompts = generator.seen_prompts();
        let svc = service(FakeSearch::returning(vec![]), generator);

        let (_, in_context) = svc.chat("hello there").await.unwrap();
        assert_eq!(in_context, 0);
        assert!(prompts.lock().unwrap()[0].contains("assistant specialized"));
    }
}
