use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Mutex;

use papers_core::CachedPaper;

// Caps applied when deriving stats, so the info payload stays bounded no
// matter what the feed returned.
const STATS_CATEGORY_CAP: usize = 10;
const STATS_TITLE_CHARS: usize = 100;

/// Server-side store of the most recent search batch, in provider
/// relevance order. Single writer (the owning service); the whole set is
/// replaced atomically on a new search — readers never observe a partial
/// batch. The lock is never held across an await.
#[derive(Debug, Default)]
pub struct PaperCache {
    papers: Mutex<Vec<CachedPaper>>,
}

/// Non-mutating summary of the cache contents
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub count: usize,
    pub titles: Vec<String>,
    pub categories: Vec<String>,
    pub years: Vec<String>,
    pub total_authors: usize,
}

impl PaperCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a fresh batch, discarding whatever was cached. Never
    /// appends.
    pub fn replace(&self, papers: Vec<CachedPaper>) {
        *self.papers.lock().expect("cache lock poisoned") = papers;
    }

    /// Bounds-checked read. `Err` carries the current length so callers
    /// can report a usable range — the length may have changed since the
    /// caller last looked, so it is re-validated here, every time.
    pub fn get(&self, index: usize) -> Result<CachedPaper, usize> {
        let papers = self.papers.lock().expect("cache lock poisoned");
        papers.get(index).cloned().ok_or(papers.len())
    }

    /// Empty the cache, returning how many entries were dropped.
    pub fn clear(&self) -> usize {
        let mut papers = self.papers.lock().expect("cache lock poisoned");
        let previous = papers.len();
        papers.clear();
        previous
    }

    pub fn len(&self) -> usize {
        self.papers.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone of the current batch, for read-only consumers (analysis and
    /// chat context building).
    pub fn snapshot(&self) -> Vec<CachedPaper> {
        self.papers.lock().expect("cache lock poisoned").clone()
    }

    /// Derive counts and tag/year sets without touching the contents.
    pub fn stats(&self) -> CacheStats {
        let papers = self.papers.lock().expect("cache lock poisoned");

        let titles = papers
            .iter()
            .map(|p| p.title.chars().take(STATS_TITLE_CHARS).collect())
            .collect();

        let categories: BTreeSet<&str> = papers
            .iter()
            .flat_map(|p| p.categories.iter().map(String::as_str))
            .collect();

        let years: BTreeSet<&str> = papers.iter().filter_map(|p| p.year()).collect();

        CacheStats {
            count: papers.len(),
            titles,
            categories: categories
                .into_iter()
                .take(STATS_CATEGORY_CAP)
                .map(String::from)
                .collect(),
            years: years.into_iter().map(String::from).collect(),
            total_authors: papers.iter().map(|p| p.authors.len()).sum(),
        }
    }
}
