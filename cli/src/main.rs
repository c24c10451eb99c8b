use clap::Parser;
use colored::*;
use log::info;
use std::collections::HashMap;

mod app;
mod cli;
mod output;

use crate::cli::Args;
use papers_core::PapersConfig;
use papers_mcp::Session;

/// Main function — spawns the tool server, runs the handshake and hands
/// control to the menu loop (or a one-shot query).
#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = PapersConfig::load();
    // Keep the menu quiet by default; RUST_LOG/PAPERS_LOG opt into more.
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or(config.log_level.as_deref().unwrap_or("warn")),
    )
    .init();

    let args = Args::parse();
    output::print_banner();

    let command = resolve_server_command(&args, &config);
    println!("{}", "Connecting to the papers server…".yellow());

    // The child inherits our environment, which carries GOOGLE_API_KEY
    // through to the server.
    let mut session = match Session::connect(&command, &HashMap::new()).await {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{}", format!("Failed to connect: {}", e).red());
            eprintln!(
                "{}",
                "Is the papers-server binary built and on the expected path?".dimmed()
            );
            std::process::exit(1);
        }
    };

    let tools = match session.list_tools().await {
        Ok(tools) => tools,
        Err(e) => {
            eprintln!("{}", format!("Tool discovery failed: {}", e).red());
            session.close().await;
            std::process::exit(1);
        }
    };
    println!("{}", "Connected.".green());
    output::print_tool_list(&tools);

    let outcome = match args.query.as_deref() {
        Some(query) => app::run_single_query(&mut session, query, args.max_results).await,
        None => app::run_interactive(&mut session).await,
    };

    session.close().await;
    println!("{}", "Disconnected from server".green());

    if let Err(e) = outcome {
        info!("Session ended with error: {}", e);
        std::process::exit(1);
    }
}

/// The server command: CLI flag, then config, then the sibling binary from
/// this build, then whatever `papers-server` resolves to on PATH.
fn resolve_server_command(args: &Args, config: &PapersConfig) -> Vec<String> {
    if let Some(command) = args.server.as_ref().or(config.server_command.as_ref()) {
        return command.split_whitespace().map(String::from).collect();
    }

    let sibling = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("papers-server")));
    match sibling {
        Some(path) if path.exists() => vec![path.to_string_lossy().into_owned()],
        _ => vec!["papers-server".to_string()],
    }
}
