//! Parsing of ReAct-formatted model output.

use crate::error::{Result, ScoutError};
use regex::Regex;
use std::fmt;

/// Marker that introduces the final answer.
pub const FINAL_ANSWER: &str = "Final Answer:";

/// What the model decided to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// The model is done.
    FinalAnswer(String),
    /// The model wants a tool run.
    ToolCall { tool: String, input: String },
}

/// Model output that does not follow the ReAct format.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatError {
    MissingAction,
    MissingActionInput,
    AnswerAndAction,
    Unparseable,
}

impl FormatError {
    /// Observation fed back to the model so it can correct itself.
    pub fn observation(&self) -> &'static str {
        match self {
            FormatError::MissingAction => "Invalid Format: Missing 'Action:' after 'Thought:'",
            FormatError::MissingActionInput => {
                "Invalid Format: Missing 'Action Input:' after 'Action:'"
            }
            FormatError::AnswerAndAction => {
                "Invalid Format: Parsing LLM output produced both a final answer and a \
                 parse-able action. Reply with either an Action or a Final Answer, not both."
            }
            FormatError::Unparseable => "Invalid or incomplete response",
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.observation())
    }
}

/// Parses completions into `Decision`s.
pub struct OutputParser {
    action_regex: Regex,
    action_only_regex: Regex,
    action_input_regex: Regex,
}

impl OutputParser {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ScoutError::Agent(format!("Invalid pattern: {}", e)))
        };

        Ok(Self {
            action_regex: compile(
                r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)",
            )?,
            action_only_regex: compile(r"(?s)Action\s*\d*\s*:[\s]*(.*?)")?,
            action_input_regex: compile(r"(?s)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")?,
        })
    }

    /// Parse one completion.
    ///
    /// A well-formed action wins over a final answer only when no final
    /// answer is present; output containing both is rejected.
    pub fn parse(&self, text: &str) -> std::result::Result<Decision, FormatError> {
        // Drop anything the model invented past its own action.
        let text = match text.find("\nObservation:") {
            Some(pos) => &text[..pos],
            None => text,
        };

        let includes_answer = text.contains(FINAL_ANSWER);

        if let Some(caps) = self.action_regex.captures(text) {
            if includes_answer {
                return Err(FormatError::AnswerAndAction);
            }
            let tool = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
            let input = caps
                .get(2)
                .map_or("", |m| m.as_str())
                .trim()
                .trim_matches('"')
                .to_string();
            return Ok(Decision::ToolCall { tool, input });
        }

        if includes_answer {
            let answer = text.rsplit(FINAL_ANSWER).next().unwrap_or("").trim();
            return Ok(Decision::FinalAnswer(answer.to_string()));
        }

        if !self.action_only_regex.is_match(text) {
            Err(FormatError::MissingAction)
        } else if !self.action_input_regex.is_match(text) {
            Err(FormatError::MissingActionInput)
        } else {
            Err(FormatError::Unparseable)
        }
    }
}
