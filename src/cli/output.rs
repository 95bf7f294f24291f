//! CLI output formatting utilities.

use crate::agent::{AgentResponse, AgentStep, RunStatus, StepAction};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print one reasoning step.
    pub fn step(index: usize, step: &AgentStep) {
        let action = match &step.action {
            StepAction::Tool { name, input } => {
                format!("{} {}", style(name).bold(), style(input).dim())
            }
            StepAction::Malformed { .. } => style("invalid output").yellow().to_string(),
        };
        println!("  {} {}", style(format!("[{}]", index + 1)).cyan(), action);
        println!("      {}", content_preview(&step.observation, 200));
    }

    /// Print a final answer, marking runs that hit the iteration limit.
    pub fn answer(response: &AgentResponse) {
        match response.status {
            RunStatus::Done => println!("\n{} {}", style("Answer:").green().bold(), response.output),
            RunStatus::Failed => println!("\n{} {}", style("Answer:").yellow().bold(), response.output),
        }
    }

    /// Print a document search result.
    pub fn search_result(source: &str, page: &str, score: f32, content: &str) {
        println!(
            "\n{} {} page {} (score: {:.2})",
            style(">>").green(),
            style(source).bold(),
            style(page).cyan(),
            score
        );
        println!("   {}", content_preview(content, 200));
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis, on a character boundary.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
