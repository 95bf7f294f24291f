//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    model: Option<String>,
    show_steps: bool,
    mut settings: Settings,
) -> Result<()> {
    let operation = Operation::FullAgent;
    let credentials = match preflight::check(operation, &settings) {
        Ok(Some(credentials)) => credentials,
        Ok(None) => anyhow::bail!("missing credentials"),
        Err(e) => {
            Output::error(&format!("{}", e));
            Output::info("Run 'scout doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    };

    if let Some(model) = model {
        settings.llm.model = model;
    }

    let orchestrator = Orchestrator::new(settings, &credentials, operation.tool_set())?;
    let agent = orchestrator.agent()?;

    let spinner = Output::spinner("Agent is thinking...");

    match agent.run(question).await {
        Ok(response) => {
            spinner.finish_and_clear();

            if show_steps && !response.steps.is_empty() {
                Output::header(&format!("Steps ({})", response.steps.len()));
                for (index, step) in response.steps.iter().enumerate() {
                    Output::step(index, step);
                }
            }

            Output::answer(&response);
            println!();

            let tools_used: Vec<String> =
                response.steps.iter().map(|s| s.action.to_string()).collect();
            if !show_steps && !tools_used.is_empty() {
                Output::info(&format!("Steps: {}", tools_used.join(", ")));
            }
            Output::info(&format!(
                "Completed in {} iteration(s)",
                response.iterations
            ));
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Agent failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
