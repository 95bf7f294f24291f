//! Interactive terminal chat.

use crate::agent::{Agent, RunStatus};
use crate::chat::Transcript;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
pub async fn run_chat(model: Option<String>, mut settings: Settings) -> Result<()> {
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
    let mut session = ChatSession::new(orchestrator.agent()?);

    println!("\n{}", style("Scout Chat").bold().cyan());
    println!(
        "{}",
        style(format!(
            "Tools: {} | Model: {}",
            orchestrator.toolbox().names(),
            orchestrator.model_name()
        ))
        .dim()
    );
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset the conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            // EOF
            println!();
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            session.clear();
            Output::info("Conversation cleared.");
            continue;
        }

        let spinner = Output::spinner("Agent is thinking...");
        let result = session.send(input).await;
        spinner.finish_and_clear();

        match result {
            Ok(reply) => {
                for call in &reply.tools_used {
                    println!("  {}", style(format!("[{}]", call)).dim());
                }
                let label = match reply.status {
                    RunStatus::Done => style("Scout:").cyan().bold(),
                    RunStatus::Failed => style("Scout:").yellow().bold(),
                };
                println!("\n{} {}\n", label, reply.answer);
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}

/// What the terminal shows for one answered message.
struct ChatReply {
    answer: String,
    status: RunStatus,
    tools_used: Vec<String>,
}

/// A terminal chat session: a transcript plus the agent answering into it.
struct ChatSession {
    agent: Agent,
    transcript: Transcript,
}

impl ChatSession {
    fn new(agent: Agent) -> Self {
        Self {
            agent,
            transcript: Transcript::new(),
        }
    }

    fn clear(&mut self) {
        self.transcript.clear();
    }

    /// Answer one message. The agent sees only this message, not the history.
    async fn send(&mut self, message: &str) -> crate::error::Result<ChatReply> {
        self.transcript.push_user(message);

        let response = match self.agent.run(message).await {
            Ok(response) => response,
            Err(e) => {
                self.transcript
                    .push_assistant(format!("Sorry, something went wrong: {}", e));
                return Err(e);
            }
        };

        self.transcript.push_assistant(&response.output);

        Ok(ChatReply {
            tools_used: response.steps.iter().map(|s| s.action.to_string()).collect(),
            answer: response.output,
            status: response.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::scripted::ScriptedModel;
    use crate::tools::Toolbox;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_session_appends_both_turns() {
        let model = Arc::new(ScriptedModel::new([
            "Action: calculator\nAction Input: 15 * 8",
            "Final Answer: 120",
        ]));
        let mut session = ChatSession::new(Agent::new(model.clone(), Toolbox::offline()).unwrap());

        let reply = session.send("What is 15 * 8?").await.unwrap();

        assert_eq!(reply.answer, "120");
        assert_eq!(reply.tools_used, vec!["calculator(15 * 8)".to_string()]);
        assert_eq!(session.transcript.len(), 2);

        // Only the latest message reaches the model.
        session.send("And the date?").await.unwrap();
        let last_prompt = model.prompts().pop().unwrap();
        assert!(last_prompt.contains("Question: And the date?"));
        assert!(!last_prompt.contains("What is 15 * 8?"));

        session.clear();
        assert!(session.transcript.is_empty());
    }
}
