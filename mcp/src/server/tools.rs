// The tool registry: a closed set of operations, each with a declared
// argument shape, dispatched against the service instance. Every handler
// returns the same envelope shape — `success`, an optional human-readable
// `message` and a payload — so the host needs exactly one decoding path.
// Handler failures (bad arguments, index out of range, upstream errors)
// are envelope data, never transport faults.

use log::info;
use serde_json::{json, Value};

use crate::rpc::Tool;
use crate::server::analysis::AnalysisKind;
use crate::server::service::PapersService;

/// The fixed set of operations this server publishes. Adding a tool means
/// adding a variant, and the compiler walks every match that needs to
/// learn about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    SearchPapers,
    GetPaperDetails,
    AnalyzePapers,
    ChatAboutPapers,
    GetCacheInfo,
    ClearCache,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::SearchPapers,
        ToolKind::GetPaperDetails,
        ToolKind::AnalyzePapers,
        ToolKind::ChatAboutPapers,
        ToolKind::GetCacheInfo,
        ToolKind::ClearCache,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::SearchPapers => "search_papers",
            ToolKind::GetPaperDetails => "get_paper_details",
            ToolKind::AnalyzePapers => "analyze_papers",
            ToolKind::ChatAboutPapers => "chat_about_papers",
            ToolKind::GetCacheInfo => "get_cache_info",
            ToolKind::ClearCache => "clear_cache",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn descriptor(self) -> Tool {
        let (description, input_schema) = match self {
            ToolKind::SearchPapers => (
                "Search arXiv for academic papers and cache the results",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Search keywords"
                        },
                        "max_results": {
                            "type": "integer",
                            "description": "Number of results to return (clamped to 1-10)",
                            "minimum": 1,
                            "maximum": 10,
                            "default": 5
                        }
                    },
                    "required": ["query"]
                }),
            ),
            ToolKind::GetPaperDetails => (
                "Return the full cached record of one paper by its index",
                json!({
                    "type": "object",
                    "properties": {
                        "paper_index": {
                            "type": "integer",
                            "description": "Zero-based index into the cached results",
                            "default": 0
                        }
                    }
                }),
            ),
            ToolKind::AnalyzePapers => (
                "Analyze the cached papers with the generation model",
                json!({
                    "type": "object",
                    "properties": {
                        "analysis_type": {
                            "type": "string",
                            "enum": ["summary", "trends", "comparison"],
                            "default": "summary"
                        }
                    }
                }),
            ),
            ToolKind::ChatAboutPapers => (
                "Ask a free-form question about the cached papers",
                json!({
                    "type": "object",
                    "properties": {
                        "message": {
                            "type": "string",
                            "description": "The question or request"
                        }
                    },
                    "required": ["message"]
                }),
            ),
            ToolKind::GetCacheInfo => (
                "Report statistics about the cached papers",
                json!({"type": "object", "properties": {}}),
            ),
            ToolKind::ClearCache => (
                "Remove all cached papers",
                json!({"type": "object", "properties": {}}),
            ),
        };

        Tool {
            name: self.name().to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// The registry published to hosts. Fixed at server start.
pub fn descriptors() -> Vec<Tool> {
    ToolKind::ALL.iter().map(|kind| kind.descriptor()).collect()
}

fn failure(message: impl Into<String>) -> Value {
    json!({"success": false, "message": message.into()})
}

/// Route one call to its handler. Always yields an envelope.
pub async fn dispatch(kind: ToolKind, args: &Value, service: &PapersService) -> Value {
    info!("Dispatching tool '{}'", kind.name());
    match kind {
        ToolKind::SearchPapers => search_papers(args, service).await,
        ToolKind::GetPaperDetails => get_paper_details(args, service),
        ToolKind::AnalyzePapers => analyze_papers(args, service).await,
        ToolKind::ChatAboutPapers => chat_about_papers(args, service).await,
        ToolKind::GetCacheInfo => get_cache_info(service),
        ToolKind::ClearCache => clear_cache(service),
    }
}

/// Read an optional integer argument, distinguishing "absent" (use the
/// default) from "present but not an integer" (a validation failure).
fn optional_int(args: &Value, key: &str, default: i64) -> Result<i64, Value> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value
            .as_i64()
            .ok_or_else(|| failure(format!("'{}' must be an integer", key))),
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, Value> {
    match args.get(key).and_then(Value::as_str).map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(failure(format!("A non-empty '{}' string is required", key))),
    }
}

async fn search_papers(args: &Value, service: &PapersService) -> Value {
    let query = match required_str(args, "query") {
        Ok(q) => q,
        Err(envelope) => return envelope,
    };
    let requested = match optional_int(args, "max_results", 5) {
        Ok(n) => n,
        Err(envelope) => return envelope,
    };

    match service.search_papers(query, requested).await {
        Ok(papers) => json!({
            "success": !papers.is_empty(),
            "count": papers.len(),
            "papers": papers,
            "message": format!("Found {} papers for '{}'", papers.len(), query),
        }),
        Err(e) => failure(format!("Search failed: {}", e)),
    }
}

fn get_paper_details(args: &Value, service: &PapersService) -> Value {
    let index = match optional_int(args, "paper_index", 0) {
        Ok(n) => n,
        Err(envelope) => return envelope,
    };

    let cache = service.cache();
    if cache.is_empty() {
        return failure("No papers in cache. Run a search first.");
    }

    let lookup = usize::try_from(index)
        .map_err(|_| cache.len())
        .and_then(|i| cache.get(i));

    match lookup {
        Ok(paper) => json!({
            "success": true,
            "paper": paper,
            "index": index,
            "total_cached": cache.len(),
        }),
        Err(len) => failure(format!("Invalid index. Cache holds {} papers.", len)),
    }
}

async fn analyze_papers(args: &Value, service: &PapersService) -> Value {
    let papers = service.cache().snapshot();
    if papers.is_empty() {
        return failure("No papers in cache. Run a search first.");
    }

    let kind_name = args
        .get("analysis_type")
        .and_then(Value::as_str)
        .unwrap_or("summary");
    let kind = match AnalysisKind::from_name(kind_name) {
        Some(kind) => kind,
        None => {
            return failure(format!(
                "Invalid analysis type '{}'. Use: {}",
                kind_name,
                AnalysisKind::valid_names()
            ))
        }
    };

    info!("Analyzing {} papers ({})", papers.len(), kind.name());
    match service.analyze(kind, &papers).await {
        Ok(text) => json!({
            "success": true,
            "analysis_type": kind.name(),
            "papers_analyzed": papers.len(),
            "analysis": text,
        }),
        Err(e) => failure(format!("Analysis failed: {}", e)),
    }
}

async fn chat_about_papers(args: &Value, service: &PapersService) -> Value {
    let message = match required_str(args, "message") {
        Ok(m) => m,
        Err(envelope) => return envelope,
    };

    match service.chat(message).await {
        Ok((answer, in_context)) => json!({
            "success": true,
            "message": message,
            "response": answer,
            "papers_in_context": in_context,
        }),
        Err(e) => failure(format!("Failed to process message: {}", e)),
    }
}

fn get_cache_info(service: &PapersService) -> Value {
    let stats = service.cache().stats();
    if stats.count == 0 {
        return json!({
            "success": true,
            "cached_papers": 0,
            "message": "Cache is empty",
        });
    }

    json!({
        "success": true,
        "cached_papers": stats.count,
        "paper_titles": stats.titles,
        "categories": stats.categories,
        "publication_years": stats.years,
        "total_authors": stats.total_authors,
        "message": format!("Cache holds {} papers", stats.count),
    })
}

fn clear_cache(service: &PapersService) -> Value {
    let previous = service.cache().clear();
    json!({
        "success": true,
        "message": format!("Cache cleared. {} papers removed.", previous),
    })
}
