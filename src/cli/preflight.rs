//! Pre-flight checks before commands that call remote services.
//!
//! Reads credentials and checks the document index so that a command fails
//! at startup instead of halfway through a question.

use crate::config::{Credentials, Settings};
use crate::error::{Result, ScoutError};
use crate::tools::ToolSet;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Agent with the core tools: model key only.
    CoreAgent,
    /// Agent with every tool: model key, embedding key and index.
    FullAgent,
    /// Direct index search: embedding key and index.
    Search,
    /// Index listing: index only.
    Sources,
}

impl Operation {
    /// Tool set an agent operation runs with.
    pub fn tool_set(&self) -> ToolSet {
        match self {
            Operation::FullAgent => ToolSet::Full,
            _ => ToolSet::Core,
        }
    }
}

/// Run pre-flight checks for the given operation.
///
/// Returns the credentials agent operations need.
pub fn check(operation: Operation, settings: &Settings) -> Result<Option<Credentials>> {
    match operation {
        Operation::CoreAgent => Ok(Some(Credentials::from_env(settings, false)?)),
        Operation::FullAgent => {
            let credentials = Credentials::from_env(settings, true)?;
            check_index(settings)?;
            Ok(Some(credentials))
        }
        Operation::Search => {
            Credentials::embedding_key_from_env(settings)?;
            check_index(settings)?;
            Ok(None)
        }
        Operation::Sources => {
            check_index(settings)?;
            Ok(None)
        }
    }
}

/// Check that the document index file exists.
pub fn check_index(settings: &Settings) -> Result<()> {
    let path = settings.sqlite_path();
    if path.exists() {
        Ok(())
    } else {
        Err(ScoutError::Config(format!(
            "Document index not found at {}. Build it with your indexer or set vector_store.sqlite_path.",
            path.display()
        )))
    }
}
