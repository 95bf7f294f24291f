//! Batch run command: answers a fixed list of questions.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use console::style;

/// Questions exercising web search, the date tool and the calculator.
pub const BATCH_QUERIES: [&str; 3] = [
    "What is the latest version of Python and when was it released?",
    "What is today's date?",
    "What is 2547 multiplied by 13?",
];

const SEPARATOR_WIDTH: usize = 50;

/// Run the batch command.
pub async fn run_batch(settings: Settings) -> Result<()> {
    let operation = Operation::CoreAgent;
    let credentials = match preflight::check(operation, &settings) {
        Ok(Some(credentials)) => credentials,
        Ok(None) => anyhow::bail!("missing credentials"),
        Err(e) => {
            Output::error(&format!("{}", e));
            Output::info("Run 'scout doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    };

    let orchestrator = Orchestrator::new(settings, &credentials, operation.tool_set())?;
    let agent = orchestrator.agent()?;
    let separator = "=".repeat(SEPARATOR_WIDTH);

    for (i, query) in BATCH_QUERIES.iter().enumerate() {
        if i > 0 {
            println!("\n{}\n", separator);
        }
        println!("{} {}", style("Question:").bold(), query);

        match agent.run(query).await {
            Ok(response) => {
                for (index, step) in response.steps.iter().enumerate() {
                    Output::step(index, step);
                }
                Output::answer(&response);
            }
            Err(e) => Output::error(&format!("Agent failed: {}", e)),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_covers_search_date_and_math() {
        assert_eq!(BATCH_QUERIES.len(), 3);
        assert!(BATCH_QUERIES.iter().any(|q| q.contains("Python")));
        assert!(BATCH_QUERIES.iter().any(|q| q.contains("date")));
        assert!(BATCH_QUERIES.iter().any(|q| q.contains("2547")));
    }
}
