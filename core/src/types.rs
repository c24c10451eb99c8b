use serde::{Deserialize, Serialize};

/// Maximum characters of abstract text kept per cached paper.
pub const SUMMARY_CAP: usize = 1000;
/// Maximum authors kept per cached paper.
pub const AUTHOR_CAP: usize = 5;
/// Maximum category tags kept per cached paper.
pub const CATEGORY_CAP: usize = 3;

/// One search result held in the server-side cache.
///
/// Produced by a successful `search_papers` call and read by the
/// detail/analysis tools. Field caps are applied on ingest, so a
/// `CachedPaper` is always within wire-payload bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedPaper {
    pub title: String,
    pub authors: Vec<String>,
    /// Publication date as `YYYY-MM-DD`, or `"N/A"` when the feed omits it.
    pub published: String,
    pub summary: String,
    pub url: String,
    pub pdf_url: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl CachedPaper {
    /// Publication year, when the date is known.
    pub fn year(&self) -> Option<&str> {
        if self.published == "N/A" {
            return None;
        }
        self.published.split('-').next().filter(|y| !y.is_empty())
    }
}

/// Helper struct to encapsulate model details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GeminiModel {
    pub api_key: String,
    pub model_name: String,
}

impl GeminiModel {
    pub fn new(api_key: String, model_name: Option<String>) -> Self {
        Self {
            api_key,
            model_name: model_name.unwrap_or_else(|| "gemini-2.5-pro".to_string()),
        }
    }
}

/// Request to Gemini API to generate content
#[derive(Serialize, Debug)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// Content structure for requests and responses
#[derive(Serialize, Clone, Debug, Deserialize)]
pub struct Content {
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Part structure for a piece of content
#[derive(Serialize, Clone, Debug, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: String) -> Self {
        Self { text: Some(text) }
    }
}

/// Generation configuration for the request
#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

/// Response from the Gemini API
#[derive(Deserialize, Debug)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// A single response candidate
#[derive(Deserialize, Debug)]
pub struct Candidate {
    pub content: Option<Content>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_from_published_date() {
        let paper = CachedPaper {
            title: "t".into(),
            authors: vec![],
            published: "2024-03-15".into(),
            summary: String::new(),
            url: String::new(),
            pdf_url: String::new(),
            categories: vec![],
        };
        assert_eq!(paper.year(), Some("2024"));
    }

    #[test]
    fn year_absent_when_unknown() {
        let paper = CachedPaper {
            title: "t".into(),
            authors: vec![],
            published: "N/A".into(),
            summary: String::new(),
            url: String::new(),
            pdf_url: String::new(),
            categories: vec![],
        };
        assert_eq!(paper.year(), None);
    }
}
