//! Agent runner: the ReAct decision loop.

use super::parser::{Decision, FormatError, OutputParser};
use crate::config::Prompts;
use crate::error::Result;
use crate::llm::LanguageModel;
use crate::tools::Toolbox;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Answer given when the iteration cap is reached.
pub const ITERATION_LIMIT_ANSWER: &str =
    "Agent stopped: unable to complete the request within the iteration limit.";

/// Stop sequence that keeps the model from writing its own observations.
pub const STOP_SEQUENCE: &str = "\nObservation";

/// Agent that answers a question by alternating model decisions and tool calls.
pub struct Agent {
    model: Arc<dyn LanguageModel>,
    tools: Toolbox,
    parser: OutputParser,
    prompts: Prompts,
    max_iterations: usize,
}

/// Where the loop is.
enum State {
    AwaitingDecision,
    ExecutingTool {
        log: String,
        tool: String,
        input: String,
    },
    Done(String),
    Failed,
}

impl Agent {
    /// Create an agent with the default ReAct prompt and a cap of 5 rounds.
    pub fn new(model: Arc<dyn LanguageModel>, tools: Toolbox) -> Result<Self> {
        Ok(Self {
            model,
            tools,
            parser: OutputParser::new()?,
            prompts: Prompts::default(),
            max_iterations: 5,
        })
    }

    /// Use custom prompt templates.
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set maximum decision rounds for the agent loop.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    /// The tools this agent may call.
    pub fn tools(&self) -> &Toolbox {
        &self.tools
    }

    /// Name of the model behind the agent.
    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Run the loop on one user input.
    ///
    /// Reaching the iteration cap is not an error; the response comes back
    /// with `RunStatus::Failed`. Model transport errors are returned.
    pub async fn run(&self, input: &str) -> Result<AgentResponse> {
        let header = self.render_header();
        let stop = vec![STOP_SEQUENCE.to_string()];

        let mut steps: Vec<AgentStep> = Vec::new();
        let mut iterations = 0;
        let mut state = State::AwaitingDecision;

        loop {
            state = match state {
                State::AwaitingDecision => {
                    if iterations >= self.max_iterations {
                        warn!("Agent hit the iteration limit ({})", self.max_iterations);
                        State::Failed
                    } else {
                        iterations += 1;
                        debug!("Agent iteration {}", iterations);

                        let prompt = build_prompt(&header, input, &scratchpad(&steps));
                        let completion = self.model.complete(&prompt, &stop).await?;

                        match self.parser.parse(&completion) {
                            Ok(Decision::FinalAnswer(answer)) => State::Done(answer),
                            Ok(Decision::ToolCall { tool, input }) => State::ExecutingTool {
                                log: completion,
                                tool,
                                input,
                            },
                            Err(error) => {
                                info!("Malformed model output: {}", error);
                                steps.push(AgentStep::malformed(completion, error));
                                State::AwaitingDecision
                            }
                        }
                    }
                }
                State::ExecutingTool { log, tool, input } => {
                    let observation = match self.tools.resolve(&tool) {
                        Some(kind) => self.tools.execute(kind, &input).await,
                        None => format!(
                            "{} is not a valid tool, try one of [{}].",
                            tool,
                            self.tools.names()
                        ),
                    };
                    info!(tool = %tool, "Observation: {}", preview(&observation));

                    steps.push(AgentStep {
                        log,
                        action: StepAction::Tool { name: tool, input },
                        observation,
                    });
                    State::AwaitingDecision
                }
                State::Done(output) => {
                    return Ok(AgentResponse {
                        output,
                        status: RunStatus::Done,
                        steps,
                        iterations,
                    });
                }
                State::Failed => {
                    return Ok(AgentResponse {
                        output: ITERATION_LIMIT_ANSWER.to_string(),
                        status: RunStatus::Failed,
                        steps,
                        iterations,
                    });
                }
            };
        }
    }

    /// Render everything in the template except the question and scratchpad.
    fn render_header(&self) -> String {
        let mut vars = HashMap::new();
        vars.insert("tools".to_string(), self.tools.describe());
        vars.insert("tool_names".to_string(), self.tools.names());
        vars.insert("input".to_string(), "{{input}}".to_string());
        vars.insert("agent_scratchpad".to_string(), "{{agent_scratchpad}}".to_string());
        self.prompts.render_with_custom(&self.prompts.agent.react, &vars)
    }
}

/// Fill in the question and scratchpad without rescanning either.
fn build_prompt(header: &str, input: &str, scratchpad: &str) -> String {
    match header.split_once("{{agent_scratchpad}}") {
        Some((head, tail)) => format!(
            "{}{}{}",
            head.replace("{{input}}", input),
            scratchpad,
            tail.replace("{{input}}", input)
        ),
        None => format!("{}{}", header.replace("{{input}}", input), scratchpad),
    }
}

/// Prior steps in the form the model continues from.
fn scratchpad(steps: &[AgentStep]) -> String {
    steps
        .iter()
        .map(|s| format!("{}\nObservation: {}\nThought: ", s.log, s.observation))
        .collect()
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(120).collect();
    if out.len() < text.len() {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Done,
    Failed,
}

/// Response from an agent run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentResponse {
    /// The final answer, or the iteration-limit message.
    pub output: String,
    pub status: RunStatus,
    /// Intermediate steps in order.
    pub steps: Vec<AgentStep>,
    /// Number of decision rounds (model calls) used.
    pub iterations: usize,
}

/// One round of the loop that did not end it.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStep {
    /// Raw model output for the round.
    pub log: String,
    pub action: StepAction,
    pub observation: String,
}

impl AgentStep {
    fn malformed(log: String, error: FormatError) -> Self {
        Self {
            log,
            observation: error.observation().to_string(),
            action: StepAction::Malformed {
                error: error.to_string(),
            },
        }
    }
}

/// What a step did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepAction {
    Tool { name: String, input: String },
    Malformed { error: String },
}

impl std::fmt::Display for StepAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepAction::Tool { name, input } => write!(f, "{}({})", name, input),
            StepAction::Malformed { error } => write!(f, "invalid output: {}", error),
        }
    }
}
