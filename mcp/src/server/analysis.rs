// Analysis strategies: each kind maps to a prompt template over a bounded
// textual rendering of the cached papers.

use papers_core::CachedPaper;

/// Most papers included in a generation context.
pub const CONTEXT_PAPER_CAP: usize = 5;
/// Most characters of one summary included in a generation context.
pub const CONTEXT_SUMMARY_CHARS: usize = 500;
/// Authors listed per paper before the "et al." marker.
pub const CONTEXT_AUTHOR_CAP: usize = 2;

/// Shown when the generator returns no usable text.
pub const ANALYSIS_UNAVAILABLE: &str = "Analysis not available.";

/// The closed set of analysis strategies. Tool input is validated against
/// `from_name` before anything else happens, so an unrecognized key never
/// reaches a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    Summary,
    Trends,
    Comparison,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 3] = [
        AnalysisKind::Summary,
        AnalysisKind::Trends,
        AnalysisKind::Comparison,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AnalysisKind::Summary => "summary",
            AnalysisKind::Trends => "trends",
            AnalysisKind::Comparison => "comparison",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "summary" => Some(AnalysisKind::Summary),
            "trends" => Some(AnalysisKind::Trends),
            "comparison" => Some(AnalysisKind::Comparison),
            _ => None,
        }
    }

    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|k| k.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Render papers into the bounded context block handed to the generator:
/// at most the first five papers, summaries cut to 500 characters, at most
/// two named authors. Prompt size stays deterministic regardless of cache
/// size.
pub fn format_papers_context(papers: &[CachedPaper]) -> String {
    let mut context = String::new();
    for (i, paper) in papers.iter().take(CONTEXT_PAPER_CAP).enumerate() {
        let mut authors = paper
            .authors
            .iter()
            .take(CONTEXT_AUTHOR_CAP)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        if paper.authors.len() > CONTEXT_AUTHOR_CAP {
            authors.push_str(" et al.");
        }

        let summary: String = paper.summary.chars().take(CONTEXT_SUMMARY_CHARS).collect();

        context.push_str(&format!(
            "Paper {}:\nTitle: {}\nAuthors: {}\nDate: {}\nSummary: {}\nURL: {}\n\n",
            i + 1,
            paper.title,
            authors,
            paper.published,
            summary,
            paper.url,
        ));
    }
    context
}

/// Prompt template for one analysis strategy over an already-formatted
/// context block.
pub fn analysis_prompt(kind: AnalysisKind, context: &str) -> String {
    match kind {
        AnalysisKind::Summary => format!(
            "Analyze the following academic papers and provide an executive summary covering:\n\
             1. Main themes and trends\n\
             2. Most common methodologies\n\
             3. Significant findings\n\
             4. Identified research gaps\n\
             \n\
             Papers:\n{}",
            context
        ),
        AnalysisKind::Trends => format!(
            "Identify the main research trends in the papers below:\n\
             - Emerging technologies\n\
             - Paradigm shifts\n\
             - Growth areas\n\
             \n\
             Papers:\n{}",
            context
        ),
        AnalysisKind::Comparison => format!(
            "Compare and contrast the papers below, considering:\n\
             - Methodological approaches\n\
             - Results obtained\n\
             - Unique contributions\n\
             \n\
             Papers:\n{}",
            context
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(n: usize, author_count: usize, summary_len: usize) -> CachedPaper {
        CachedPaper {
            title: format!("Paper {}", n),
            authors: (0..author_count).map(|i| format!("Author {}", i)).collect(),
            published: "2024-01-01".to_string(),
            summary: "s".repeat(summary_len),
            url: format!("http://arxiv.org/abs/{}", n),
            pdf_url: String::new(),
            categories: vec![],
        }
    }

    #[test]
    fn kind_round_trips_names() {
        for kind in AnalysisKind::ALL {
            assert_eq!(AnalysisKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(AnalysisKind::from_name("bogus"), None);
    }

    #[test]
    fn context_takes_at_most_five_papers() {
        let papers: Vec<_> = (0..8).map(|n| paper(n, 1, 50)).collect();
        let context = format_papers_context(&papers);
        assert!(context.contains("Paper 5:"));
        assert!(!context.contains("Paper 6:"));
    }

    #[test]
    fn context_truncates_summaries() {
        let papers = vec![paper(0, 1, 2000)];
        let context = format_papers_context(&papers);
        let summary_line = context
            .lines()
            .find(|l| l.starts_with("Summary: "))
            .unwrap();
        assert_eq!(summary_line.len(), "Summary: ".len() + CONTEXT_SUMMARY_CHARS);
    }

    #[test]
    fn context_marks_elided_authors() {
        let context = format_papers_context(&[paper(0, 4, 10)]);
        assert!(context.contains("Author 0, Author 1 et al."));
        assert!(!context.contains("Author 2"));

        let short = format_papers_context(&[paper(0, 2, 10)]);
        assert!(short.contains("Author 0, Author 1\n"));
        assert!(!short.contains("et al."));
    }

    #[test]
    fn prompts_embed_the_context() {
        for kind in AnalysisKind::ALL {
            let prompt = analysis_prompt(kind, "CONTEXT-MARKER");
            assert!(prompt.contains("CONTEXT-MARKER"));
        }
    }
}
