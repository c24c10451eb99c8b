// The interactive menu loop. Every tool failure is presented and the loop
// keeps going; only a dead channel ends the session.

use colored::*;
use dialoguer::{theme::ColorfulTheme, Confirm};
use serde_json::{json, Value};
use std::io::{self, Write};

use papers_mcp::{McpError, Session};

use crate::output;

fn show_menu() {
    println!("\n{}", "Menu".cyan().bold());
    println!("{}", "=".repeat(40).cyan());
    println!("  {} - Search papers", "1".green());
    println!("  {} - Paper details", "2".green());
    println!("  {} - Analyze papers (summary)", "3".green());
    println!("  {} - Analyze papers (trends)", "4".green());
    println!("  {} - Analyze papers (comparison)", "5".green());
    println!("  {} - Chat about papers", "6".green());
    println!("  {} - Cache info", "7".green());
    println!("  {} - Clear cache", "8".green());
    println!("  {} - Help", "9".green());
    println!("  {} - Quit", "0".red());
    println!("{}", "=".repeat(40).cyan());
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label.yellow());
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Issue one call and hand back the envelope. `Err` means the channel is
/// unusable and the loop should stop; per-call failures inside a healthy
/// session come back as `success: false` envelopes instead.
async fn call(session: &mut Session, name: &str, args: Value) -> Result<Option<Value>, McpError> {
    match session.call_tool(name, args).await {
        Ok(envelope) => Ok(Some(envelope)),
        Err(e @ (McpError::Transport(_) | McpError::Protocol(_) | McpError::NotConnected)) => {
            println!("{}", format!("Connection lost: {}", e).red());
            Err(e)
        }
        Err(e) => {
            println!("{}", format!("Call failed: {}", e).red());
            Ok(None)
        }
    }
}

fn is_success(envelope: &Value) -> bool {
    envelope.get("success").and_then(Value::as_bool).unwrap_or(false)
}

/// One-shot mode: run a single search, print the results, done.
pub async fn run_single_query(
    session: &mut Session,
    query: &str,
    max_results: i64,
) -> Result<(), McpError> {
    let Some(envelope) = call(
        session,
        "search_papers",
        json!({"query": query, "max_results": max_results}),
    )
    .await?
    else {
        return Ok(());
    };

    if is_success(&envelope) {
        print_search_results(&envelope);
    } else {
        output::print_failure(&envelope);
    }
    Ok(())
}

/// The interactive loop. Returns when the user quits or the channel dies.
pub async fn run_interactive(session: &mut Session) -> Result<(), McpError> {
    let mut last_count: usize = 0;
    println!(
        "{}",
        "Ready. Pick a menu option to interact with the server.".green()
    );

    loop {
        show_menu();
        let choice = match prompt("Choose an option: ") {
            Ok(choice) => choice,
            Err(e) => {
                println!("{}", format!("Input error: {}", e).red());
                break;
            }
        };

        let outcome = match choice.as_str() {
            "0" => {
                println!("\n{}", "Closing session…".cyan());
                break;
            }
            "1" => search(session, &mut last_count).await,
            "2" => details(session, last_count).await,
            "3" => analyze(session, "summary").await,
            "4" => analyze(session, "trends").await,
            "5" => analyze(session, "comparison").await,
            "6" => chat(session).await,
            "7" => cache_info(session).await,
            "8" => clear_cache(session, &mut last_count).await,
            "9" => {
                show_help();
                Ok(())
            }
            _ => {
                println!("{}", "Invalid option".red());
                Ok(())
            }
        };

        if outcome.is_err() {
            // Channel gone; nothing more to do here.
            break;
        }
    }
    Ok(())
}

fn print_search_results(envelope: &Value) {
    if let Some(message) = envelope.get("message").and_then(Value::as_str) {
        println!("{}", message.green());
        println!();
    }
    if let Some(papers) = envelope.get("papers").and_then(Value::as_array) {
        for (i, paper) in papers.iter().enumerate() {
            output::print_paper_summary(i + 1, paper);
        }
    }
}

async fn search(session: &mut Session, last_count: &mut usize) -> Result<(), McpError> {
    let query = prompt("Search terms: ").unwrap_or_default();
    if query.is_empty() {
        return Ok(());
    }
    let raw = prompt("Number of results (1-10, default 5): ").unwrap_or_default();
    let max_results = raw.parse::<i64>().unwrap_or(5);

    println!("\n{}", format!("Searching for '{}'…", query).yellow());
    let Some(envelope) = call(
        session,
        "search_papers",
        json!({"query": query, "max_results": max_results}),
    )
    .await?
    else {
        return Ok(());
    };

    if is_success(&envelope) {
        *last_count = envelope
            .get("count")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        print_search_results(&envelope);
    } else {
        output::print_failure(&envelope);
    }
    Ok(())
}

async fn details(session: &mut Session, last_count: usize) -> Result<(), McpError> {
    if last_count == 0 {
        println!("{}", "Run a search first".yellow());
        return Ok(());
    }

    let raw = prompt(&format!("Paper number (1-{}): ", last_count)).unwrap_or_default();
    let number = match raw.parse::<usize>() {
        Ok(n) if (1..=last_count).contains(&n) => n,
        _ => {
            println!("{}", "Invalid paper number".red());
            return Ok(());
        }
    };

    let Some(envelope) = call(
        session,
        "get_paper_details",
        json!({"paper_index": number - 1}),
    )
    .await?
    else {
        return Ok(());
    };

    if is_success(&envelope) {
        output::print_paper_details(&envelope);
    } else {
        output::print_failure(&envelope);
    }
    Ok(())
}

async fn analyze(session: &mut Session, analysis_type: &str) -> Result<(), McpError> {
    println!("\n{}", format!("Analyzing papers ({})…", analysis_type).yellow());
    let Some(envelope) = call(
        session,
        "analyze_papers",
        json!({"analysis_type": analysis_type}),
    )
    .await?
    else {
        return Ok(());
    };

    if is_success(&envelope) {
        output::print_analysis(&envelope);
    } else {
        output::print_failure(&envelope);
    }
    Ok(())
}

async fn chat(session: &mut Session) -> Result<(), McpError> {
    let message = prompt("Your question: ").unwrap_or_default();
    if message.is_empty() {
        return Ok(());
    }

    println!("\n{}", "Thinking…".yellow());
    let Some(envelope) = call(session, "chat_about_papers", json!({"message": message})).await?
    else {
        return Ok(());
    };

    if is_success(&envelope) {
        output::print_chat_response(&envelope);
    } else {
        output::print_failure(&envelope);
    }
    Ok(())
}

async fn cache_info(session: &mut Session) -> Result<(), McpError> {
    if let Some(envelope) = call(session, "get_cache_info", json!({})).await? {
        if is_success(&envelope) {
            output::print_cache_info(&envelope);
        } else {
            output::print_failure(&envelope);
        }
    }
    Ok(())
}

async fn clear_cache(session: &mut Session, last_count: &mut usize) -> Result<(), McpError> {
    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Clear the cached papers?")
        .default(false)
        .interact()
        .unwrap_or(false);
    if !confirmed {
        return Ok(());
    }

    if let Some(envelope) = call(session, "clear_cache", json!({})).await? {
        if is_success(&envelope) {
            *last_count = 0;
            if let Some(message) = envelope.get("message").and_then(Value::as_str) {
                println!("{}", message.green());
            }
        } else {
            output::print_failure(&envelope);
        }
    }
    Ok(())
}

fn show_help() {
    println!("\n{}", "Help".cyan().bold());
    println!("{}", "=".repeat(50).cyan());
    println!(
        "\nThis client talks to a papers tool server over a private pipe.\n"
    );
    println!("{}", "What you can do:".yellow());
    println!("  {} Search arXiv by keywords; results are cached server-side", "•".green());
    println!("  {} View the full record of any cached paper", "•".green());
    println!("  {} Run AI analysis over the cache:", "•".green());
    println!("      summary    — executive overview");
    println!("      trends     — emerging directions");
    println!("      comparison — methods and results side by side");
    println!("  {} Chat — ask free-form questions about the cached papers", "•".green());
    println!("  {} Inspect or clear the cache", "•".green());
    println!("\n{}", "Tips:".yellow());
    println!("  • Specific queries give better results");
    println!("  • Chat understands phrases like \"find papers about …\"");
    println!("  • The cache persists between operations until cleared");
    println!("\n{}", "Example searches:".yellow());
    println!("  \"machine learning\"");
    println!("  \"neural networks attention\"");
    println!("  \"quantum computing applications\"");
}
