// The papers tool server. Spawned by the host with piped stdio; speaks
// Content-Length framed JSON-RPC on stdin/stdout and logs to stderr.

use log::{error, info};
use std::sync::Arc;

use papers_core::{ArxivClient, GeminiClient, PapersConfig};
use papers_mcp::server;
use papers_mcp::PapersService;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = PapersConfig::load();
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or(config.log_level.as_deref().unwrap_or("info")),
    )
    .init();

    // A missing credential is a startup-fatal configuration error, not
    // something to rediscover on every analyze call.
    let generator = match GeminiClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("Cannot start: {}", e);
            std::process::exit(1);
        }
    };

    let service = Arc::new(PapersService::new(
        Arc::new(ArxivClient::new()),
        Arc::new(generator),
    ));

    info!("Starting papers tool server");
    if let Err(e) = server::serve_stdio(service).await {
        error!("Server loop failed: {}", e);
        std::process::exit(1);
    }
}
