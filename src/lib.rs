//! Scout - a research agent
//!
//! A CLI and chat web UI around a reasoning-and-acting (ReAct) agent that
//! searches the web, does math, reports the date and queries a company
//! document index.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Settings, credentials and prompt templates
//! - `llm` - Hosted language model client
//! - `embedding` - Embedding generation
//! - `vector_store` - Read-only document index
//! - `retrieval` - Company document search
//! - `tools` - Web search, calculator, date and document search tools
//! - `agent` - The ReAct decision loop
//! - `chat` - Transcripts and in-memory chat sessions
//! - `orchestrator` - Wiring from settings to agents
//!
//! # Example
//!
//! ```rust,no_run
//! use scout::config::{Credentials, Settings};
//! use scout::orchestrator::Orchestrator;
//! use scout::tools::ToolSet;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let credentials = Credentials::from_env(&settings, false)?;
//!     let orchestrator = Orchestrator::new(settings, &credentials, ToolSet::Core)?;
//!
//!     let response = orchestrator.agent()?.run("What is 2547 multiplied by 13?").await?;
//!     println!("{}", response.output);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chat;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod retrieval;
pub mod retry;
pub mod tools;
pub mod vector_store;

pub use error::{Result, ScoutError};
