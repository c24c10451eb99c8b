// End-to-end host↔server exercise over an in-process duplex pipe: the real
// session state machine, framing, correlation and dispatch — everything but
// a child process.

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::task::JoinHandle;

use papers_core::errors::ProviderError;
use papers_core::{CachedPaper, ProviderResult, SearchProvider, TextGenerator};
use papers_mcp::server;
use papers_mcp::{McpError, McpResult, PapersService, Session, SessionState};

fn fixture(count: usize) -> Vec<CachedPaper> {
    (0..count)
        .map(|i| CachedPaper {
            title: format!("Paper {}", i),
            authors: vec![format!("Author {}", i)],
            published: "2024-01-01".to_string(),
            summary: format!("Abstract {}", i),
            url: format!("http://arxiv.org/abs/{}", i),
            pdf_url: format!("http://arxiv.org/pdf/{}", i),
            categories: vec!["cs.LG".to_string()],
        })
        .collect()
}

struct StubSearch {
    papers: Vec<CachedPaper>,
}

#[async_trait]
impl SearchProvider for StubSearch {
    async fn search(&self, _query: &str, limit: usize) -> ProviderResult<Vec<CachedPaper>> {
        let mut papers = self.papers.clone();
        papers.truncate(limit);
        Ok(papers)
    }
}

struct CountingGenerator {
    calls: AtomicUsize,
}

impl CountingGenerator {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TextGenerator for CountingGenerator {
    async fn generate(&self, _prompt: &str) -> ProviderResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("generated analysis".to_string())
    }
}

struct FailingGenerator;

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> ProviderResult<String> {
        Err(ProviderError::ResponseError("generator down".to_string()))
    }
}

/// Wire a session to a served connection over a duplex pipe.
async fn connect(service: Arc<PapersService>) -> (Session, JoinHandle<McpResult<()>>) {
    let (host_side, server_side) = tokio::io::duplex(64 * 1024);

    let (server_read, server_write) = tokio::io::split(server_side);
    let server_task = tokio::spawn(server::serve_connection(
        service,
        BufReader::new(server_read),
        server_write,
    ));

    let (host_read, host_write) = tokio::io::split(host_side);
    let session = Session::connect_streams(host_read, host_write)
        .await
        .expect("handshake should succeed");

    (session, server_task)
}

fn stub_service(papers: usize, generator: Arc<dyn TextGenerator>) -> Arc<PapersService> {
    Arc::new(PapersService::new(
        Arc::new(StubSearch {
            papers: fixture(papers),
        }),
        generator,
    ))
}

#[tokio::test]
async fn handshake_then_discovery_publishes_the_registry() {
    let (mut session, server_task) = connect(stub_service(3, CountingGenerator::new())).await;
    assert_eq!(session.state(), SessionState::Ready);

    let tools = session.list_tools().await.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "search_papers",
            "get_paper_details",
            "analyze_papers",
            "chat_about_papers",
            "get_cache_info",
            "clear_cache"
        ]
    );
    for tool in &tools {
        assert_eq!(tool.input_schema["type"], "object");
    }

    session.close().await;
    server_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn unknown_tool_fails_fast_before_the_wire() {
    let (mut session, server_task) = connect(stub_service(0, CountingGenerator::new())).await;

    // Before discovery, the registry is empty: everything is unknown.
    match session.call_tool("search_papers", json!({})).await {
        Err(McpError::UnknownTool(name)) => assert_eq!(name, "search_papers"),
        other => panic!("expected UnknownTool, got {:?}", other.map(|_| ())),
    }

    session.list_tools().await.unwrap();
    match session.call_tool("frobnicate", json!({})).await {
        Err(McpError::UnknownTool(name)) => assert_eq!(name, "frobnicate"),
        other => panic!("expected UnknownTool, got {:?}", other.map(|_| ())),
    }

    session.close().await;
    server_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn search_details_clear_flow_over_the_wire() {
    let (mut session, server_task) = connect(stub_service(5, CountingGenerator::new())).await;
    session.list_tools().await.unwrap();

    let searched = session
        .call_tool(
            "search_papers",
            json!({"query": "quantum computing", "max_results": 3}),
        )
        .await
        .unwrap();
    assert_eq!(searched["success"], true);
    assert_eq!(searched["count"], 3);

    let info = session.call_tool("get_cache_info", json!({})).await.unwrap();
    assert_eq!(info["cached_papers"], 3);
    assert_eq!(info["total_authors"], 3);

    let second = session
        .call_tool("get_paper_details", json!({"paper_index": 1}))
        .await
        .unwrap();
    assert_eq!(second["success"], true);
    assert_eq!(second["paper"]["title"], "Paper 1");

    let miss = session
        .call_tool("get_paper_details", json!({"paper_index": 5}))
        .await
        .unwrap();
    assert_eq!(miss["success"], false);
    assert!(miss["message"].as_str().unwrap().contains("3 papers"));
    assert!(miss.get("paper").is_none());

    let cleared = session.call_tool("clear_cache", json!({})).await.unwrap();
    assert!(cleared["message"]
        .as_str()
        .unwrap()
        .contains("3 papers removed"));

    let info = session.call_tool("get_cache_info", json!({})).await.unwrap();
    assert_eq!(info["cached_papers"], 0);

    session.close().await;
    server_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn requested_count_is_clamped_server_side() {
    let (mut session, server_task) = connect(stub_service(12, CountingGenerator::new())).await;
    session.list_tools().await.unwrap();

    let searched = session
        .call_tool("search_papers", json!({"query": "q", "max_results": 50}))
        .await
        .unwrap();
    assert_eq!(searched["count"], 10);

    let searched = session
        .call_tool("search_papers", json!({"query": "q", "max_results": 0}))
        .await
        .unwrap();
    assert_eq!(searched["count"], 1);

    session.close().await;
    server_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn analysis_guards_run_before_the_generator() {
    let generator = CountingGenerator::new();
    let (mut session, server_task) = connect(stub_service(2, generator.clone())).await;
    session.list_tools().await.unwrap();

    // Empty cache: rejected with no generator contact.
    let empty = session
        .call_tool("analyze_papers", json!({"analysis_type": "summary"}))
        .await
        .unwrap();
    assert_eq!(empty["success"], false);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);

    session
        .call_tool("search_papers", json!({"query": "q", "max_results": 2}))
        .await
        .unwrap();

    // Bad analysis type: rejected with no generator contact.
    let bogus = session
        .call_tool("analyze_papers", json!({"analysis_type": "bogus"}))
        .await
        .unwrap();
    assert_eq!(bogus["success"], false);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);

    let trends = session
        .call_tool("analyze_papers", json!({"analysis_type": "trends"}))
        .await
        .unwrap();
    assert_eq!(trends["success"], true);
    assert_eq!(trends["analysis_type"], "trends");
    assert_eq!(trends["papers_analyzed"], 2);
    assert_eq!(trends["analysis"], "generated analysis");
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

    session.close().await;
    server_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn upstream_failure_is_an_envelope_not_a_session_error() {
    let (mut session, server_task) = connect(stub_service(2, Arc::new(FailingGenerator))).await;
    session.list_tools().await.unwrap();
    session
        .call_tool("search_papers", json!({"query": "q", "max_results": 2}))
        .await
        .unwrap();

    let failed = session
        .call_tool("analyze_papers", json!({"analysis_type": "summary"}))
        .await
        .unwrap();
    assert_eq!(failed["success"], false);
    assert!(failed["message"].as_str().unwrap().contains("generator down"));

    // The session survives a tool failure.
    assert_eq!(session.state(), SessionState::Ready);
    let info = session.call_tool("get_cache_info", json!({})).await.unwrap();
    assert_eq!(info["success"], true);

    session.close().await;
    server_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn back_to_back_calls_stay_correlated() {
    let (mut session, server_task) = connect(stub_service(4, CountingGenerator::new())).await;
    session.list_tools().await.unwrap();

    // Rapid alternation; each response must belong to its own request.
    for round in 0..10 {
        let count = round % 4 + 1;
        let searched = session
            .call_tool(
                "search_papers",
                json!({"query": format!("round {}", round), "max_results": count}),
            )
            .await
            .unwrap();
        assert_eq!(searched["count"], count);

        let info = session.call_tool("get_cache_info", json!({})).await.unwrap();
        assert_eq!(info["cached_papers"], count);
    }

    session.close().await;
    server_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn closed_session_refuses_further_calls() {
    let (mut session, server_task) = connect(stub_service(1, CountingGenerator::new())).await;
    session.list_tools().await.unwrap();

    session.close().await;
    assert_eq!(session.state(), SessionState::Closed);

    match session.call_tool("get_cache_info", json!({})).await {
        Err(McpError::NotConnected) => {}
        other => panic!("expected NotConnected, got {:?}", other.map(|_| ())),
    }
    match session.list_tools().await {
        Err(McpError::NotConnected) => {}
        other => panic!("expected NotConnected, got {:?}", other.map(|_| ())),
    }

    // Idempotent close.
    session.close().await;
    assert_eq!(session.state(), SessionState::Closed);

    // The server loop winds down once the host is gone.
    tokio::time::timeout(Duration::from_secs(5), server_task)
        .await
        .expect("server should exit after close")
        .unwrap()
        .unwrap();
}
