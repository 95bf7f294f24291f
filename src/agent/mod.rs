//! Reasoning-and-acting agent.
//!
//! The model is prompted in the ReAct format, its output is parsed into a
//! `Decision`, and tool observations are fed back until it produces a final
//! answer or the iteration cap is reached.

mod parser;
mod runner;

pub use parser::{Decision, FormatError, OutputParser, FINAL_ANSWER};
pub use runner::{
    Agent, AgentResponse, AgentStep, RunStatus, StepAction, ITERATION_LIMIT_ANSWER, STOP_SEQUENCE,
};
