// Terminal rendering: colored paper listings and a small markdown
// renderer for generated analysis/chat text.

use colored::*;
use pulldown_cmark::{Event as MdEvent, HeadingLevel, Options, Parser as MdParser, Tag};
use serde_json::Value;

use papers_mcp::rpc::Tool;

pub fn print_banner() {
    println!("{}", "╔═══════════════════════════════════════╗".cyan().bold());
    println!("{}", "║     Papers Client — arXiv over MCP    ║".cyan().bold());
    println!("{}", "╚═══════════════════════════════════════╝".cyan().bold());
    println!();
}

pub fn print_tool_list(tools: &[Tool]) {
    println!(
        "{}",
        format!("{} tools available:", tools.len()).green()
    );
    for tool in tools {
        println!("   • {} — {}", tool.name.cyan(), tool.description.dimmed());
    }
    println!();
}

fn field<'a>(envelope: &'a Value, key: &str) -> &'a str {
    envelope.get(key).and_then(Value::as_str).unwrap_or("N/A")
}

/// One line-capped listing entry, as shown after a search.
pub fn print_paper_summary(number: usize, paper: &Value) {
    let title: String = field(paper, "title").chars().take(80).collect();
    println!("{}", format!("[{}] {}", number, title).cyan().bold());

    if let Some(authors) = paper.get("authors").and_then(Value::as_array) {
        let mut names: Vec<&str> = authors.iter().filter_map(Value::as_str).take(2).collect();
        if authors.len() > 2 {
            names.push("et al.");
        }
        if !names.is_empty() {
            println!("    {}", names.join(", ").blue());
        }
    }

    println!("    {}", field(paper, "published").magenta());

    let summary: String = field(paper, "summary").chars().take(150).collect();
    if !summary.is_empty() {
        println!("    {}…", summary.dimmed());
    }
    println!("    {}", field(paper, "url").yellow());
    println!();
}

/// Full record view for `get_paper_details` results.
pub fn print_paper_details(envelope: &Value) {
    let Some(paper) = envelope.get("paper") else {
        println!("{}", "No paper in response".red());
        return;
    };

    println!("\n{}", "Paper details".cyan().bold());
    println!("{}", "=".repeat(50).cyan());

    println!("{} {}", "Title:".green(), field(paper, "title"));

    if let Some(authors) = paper.get("authors").and_then(Value::as_array) {
        println!("{}", "Authors:".green());
        for author in authors.iter().filter_map(Value::as_str) {
            println!("  • {}", author);
        }
    }

    println!("{} {}", "Published:".green(), field(paper, "published"));

    if let Some(categories) = paper.get("categories").and_then(Value::as_array) {
        let list: Vec<&str> = categories.iter().filter_map(Value::as_str).collect();
        if !list.is_empty() {
            println!("{} {}", "Categories:".green(), list.join(", "));
        }
    }

    println!("{}", "Summary:".green());
    for line in wrap_text(field(paper, "summary"), 80) {
        println!("  {}", line);
    }

    println!("{}", "Links:".green());
    println!("  • arXiv: {}", field(paper, "url").yellow());
    println!("  • PDF:   {}", field(paper, "pdf_url").yellow());
}

pub fn print_cache_info(envelope: &Value) {
    println!("\n{}", "Cache info".cyan().bold());
    println!("{}", "=".repeat(40).cyan());

    let cached = envelope
        .get("cached_papers")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    if cached == 0 {
        println!("{}", "Cache is empty".yellow());
        return;
    }

    println!("{}", format!("Papers in cache: {}", cached).green());

    if let Some(titles) = envelope.get("paper_titles").and_then(Value::as_array) {
        println!("{}", "Titles:".yellow());
        for (i, title) in titles.iter().filter_map(Value::as_str).enumerate().take(5) {
            let short: String = title.chars().take(60).collect();
            println!("  {}. {}", i + 1, short);
        }
        if titles.len() > 5 {
            println!("  … and {} more", titles.len() - 5);
        }
    }

    if let Some(categories) = envelope.get("categories").and_then(Value::as_array) {
        let list: Vec<&str> = categories.iter().filter_map(Value::as_str).collect();
        if !list.is_empty() {
            println!("{} {}", "Categories:".yellow(), list.join(", "));
        }
    }

    if let Some(years) = envelope.get("publication_years").and_then(Value::as_array) {
        let list: Vec<&str> = years.iter().filter_map(Value::as_str).collect();
        if !list.is_empty() {
            println!("{} {}", "Publication years:".yellow(), list.join(", "));
        }
    }

    if let Some(total) = envelope.get("total_authors").and_then(Value::as_u64) {
        println!("{} {}", "Total authors:".yellow(), total);
    }
}

pub fn print_analysis(envelope: &Value) {
    println!("{}", "Analysis complete:".green());
    println!(
        "{}",
        format!("Type: {}", field(envelope, "analysis_type")).cyan()
    );
    if let Some(count) = envelope.get("papers_analyzed").and_then(Value::as_u64) {
        println!("{}", format!("Papers analyzed: {}", count).cyan());
    }
    println!();
    println!("{}", render_markdown(field(envelope, "analysis")));
}

pub fn print_chat_response(envelope: &Value) {
    println!("{}", "Response:".green());
    println!("{}", render_markdown(field(envelope, "response")));
    if let Some(n) = envelope.get("papers_in_context").and_then(Value::as_u64) {
        println!("{}", format!("(papers in context: {})", n).cyan());
    }
}

pub fn print_failure(envelope: &Value) {
    let message = envelope
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("The call failed with no message");
    println!("{} {}", "✗".red().bold(), message.red());
}

/// Render the generator's markdown for the terminal: styled headings and
/// list bullets, dimmed code, everything else as plain text.
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = MdParser::new_ext(markdown, options);

    let mut output = String::new();
    let mut in_code_block = false;

    for event in parser {
        match event {
            MdEvent::Start(Tag::Heading(level, ..)) => {
                let marker = match level {
                    HeadingLevel::H1 => "##",
                    HeadingLevel::H2 => "#",
                    _ => "•",
                };
                output.push('\n');
                output.push_str(&format!("{} ", marker.bright_cyan().bold()));
            }
            MdEvent::End(Tag::Heading(..)) => output.push('\n'),
            MdEvent::Start(Tag::Paragraph) => {
                if !output.is_empty() && !output.ends_with('\n') {
                    output.push('\n');
                }
            }
            MdEvent::End(Tag::Paragraph) => output.push('\n'),
            MdEvent::Start(Tag::Item) => {
                output.push_str(&format!("{}  ", "•".yellow()));
            }
            MdEvent::End(Tag::Item) => output.push('\n'),
            MdEvent::End(Tag::List(_)) => output.push('\n'),
            MdEvent::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
                output.push('\n');
            }
            MdEvent::End(Tag::CodeBlock(_)) => {
                in_code_block = false;
                output.push('\n');
            }
            MdEvent::Code(code) => {
                output.push_str(&format!("`{}`", code.white().on_bright_black()));
            }
            MdEvent::Text(text) => {
                if in_code_block {
                    output.push_str(&text.dimmed().to_string());
                } else {
                    output.push_str(&text);
                }
            }
            MdEvent::SoftBreak => output.push(' '),
            MdEvent::HardBreak => output.push('\n'),
            _ => {}
        }
    }

    output.trim_end().to_string()
}

/// Greedy word wrap for abstract display.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.len() + word.len() + 1 > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_respects_width() {
        let lines = wrap_text("one two three four five six seven eight", 12);
        assert!(lines.iter().all(|l| l.len() <= 12));
        assert_eq!(lines.join(" "), "one two three four five six seven eight");
    }

    #[test]
    fn wrap_of_empty_text_is_empty() {
        assert!(wrap_text("", 10).is_empty());
    }

    #[test]
    fn markdown_renders_lists_and_headings() {
        let rendered = render_markdown("# Trends\n\n- first\n- second\n");
        assert!(rendered.contains("first"));
        assert!(rendered.contains("second"));
        assert!(rendered.contains("Trends"));
    }
}
