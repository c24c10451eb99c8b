// In-process provider doubles for the server tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use papers_core::errors::ProviderError;
use papers_core::{CachedPaper, ProviderResult, SearchProvider, TextGenerator};

pub fn papers_fixture(count: usize) -> Vec<CachedPaper> {
    (0..count)
        .map(|i| CachedPaper {
            title: format!("Paper {}", i),
            authors: vec![format!("Author {}a", i), format!("Author {}b", i)],
            published: format!("202{}-01-01", i % 5),
            summary: format!("Abstract of paper {}", i),
            url: format!("http://arxiv.org/abs/{}", i),
            pdf_url: format!("http://arxiv.org/pdf/{}", i),
            categories: vec!["cs.LG".to_string()],
        })
        .collect()
}

pub struct FakeSearch {
    papers: Vec<CachedPaper>,
    fail: bool,
    calls: AtomicUsize,
    seen_limits: Arc<Mutex<Vec<usize>>>,
}

impl FakeSearch {
    pub fn returning(papers: Vec<CachedPaper>) -> Self {
        Self {
            papers,
            fail: false,
            calls: AtomicUsize::new(0),
            seen_limits: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::returning(Vec::new())
        }
    }

    pub fn seen_limits(&self) -> Arc<Mutex<Vec<usize>>> {
        self.seen_limits.clone()
    }

    pub fn search_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, _query: &str, limit: usize) -> ProviderResult<Vec<CachedPaper>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_limits.lock().unwrap().push(limit);
        if self.fail {
            return Err(ProviderError::RequestError("arXiv unavailable".to_string()));
        }
        let mut papers = self.papers.clone();
        papers.truncate(limit);
        Ok(papers)
    }
}

pub struct FakeGenerator {
    reply: String,
    fail: bool,
    calls: AtomicUsize,
    seen_prompts: Arc<Mutex<Vec<String>>>,
}

impl FakeGenerator {
    pub fn saying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail: false,
            calls: AtomicUsize::new(0),
            seen_prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::saying("")
        }
    }

    pub fn seen_prompts(&self) -> Arc<Mutex<Vec<String>>> {
        self.seen_prompts.clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> ProviderResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(ProviderError::ResponseError(
                "generation failed".to_string(),
            ));
        }
        Ok(self.reply.clone())
    }
}
