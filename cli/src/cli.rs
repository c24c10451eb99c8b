use clap::Parser;

/// Interactive client for the papers tool server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Run a single search and exit instead of starting the menu
    #[arg(index = 1)]
    pub query: Option<String>,

    /// Number of results for a one-shot search (clamped to 1-10 server-side)
    #[arg(short = 'n', long, default_value_t = 5)]
    pub max_results: i64,

    /// Command used to spawn the tool server (overrides config)
    #[arg(long)]
    pub server: Option<String>,
}
