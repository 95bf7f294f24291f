//! Wiring for Scout.
//!
//! Builds the model, tool clients and agents from settings and credentials.

use crate::agent::Agent;
use crate::config::{Credentials, Prompts, Settings};
use crate::embedding::OpenAIEmbedder;
use crate::error::{Result, ScoutError};
use crate::llm::{LanguageModel, OpenAIChatModel};
use crate::retrieval::DocumentSearch;
use crate::retry::RetryPolicy;
use crate::tools::{ToolSet, Toolbox, WebSearch};
use crate::vector_store::SqliteVectorStore;
use std::sync::Arc;
use tracing::info;

/// Owns the shared clients and hands out agents.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    model: Arc<dyn LanguageModel>,
    toolbox: Toolbox,
}

impl Orchestrator {
    /// Build everything the chosen tool set needs.
    ///
    /// `ToolSet::Full` opens the document index and requires the embedding key.
    pub fn new(settings: Settings, credentials: &Credentials, tool_set: ToolSet) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let retry = RetryPolicy::from(&settings.retry);

        let model: Arc<dyn LanguageModel> = Arc::new(
            OpenAIChatModel::new(&settings.llm, &credentials.llm_api_key)?
                .with_retry(retry.clone()),
        );
        info!("Using model {} at {}", settings.llm.model, settings.llm.api_base);

        let web = Arc::new(WebSearch::new(&settings.search)?.with_retry(retry.clone()));

        let toolbox = match tool_set {
            ToolSet::Core => Toolbox::core(web),
            ToolSet::Full => {
                let key = credentials.embedding_api_key.as_deref().ok_or_else(|| {
                    ScoutError::Config(format!(
                        "{} not set. Document search needs an embedding key.",
                        settings.embedding.api_key_env
                    ))
                })?;
                Toolbox::full(web, Arc::new(document_search(&settings, key)?))
            }
        };

        Ok(Self {
            settings,
            prompts,
            model,
            toolbox,
        })
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        model: Arc<dyn LanguageModel>,
        toolbox: Toolbox,
    ) -> Self {
        Self {
            settings,
            prompts,
            model,
            toolbox,
        }
    }

    /// A fresh agent over the shared model and tools.
    pub fn agent(&self) -> Result<Agent> {
        Ok(Agent::new(self.model.clone(), self.toolbox.clone())?
            .with_prompts(self.prompts.clone())
            .with_max_iterations(self.settings.agent.max_iterations))
    }

    /// Get the enabled tools.
    pub fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }
}

/// Open the document index read-only.
pub fn open_index(settings: &Settings) -> Result<Arc<SqliteVectorStore>> {
    Ok(Arc::new(SqliteVectorStore::open(&settings.sqlite_path())?))
}

/// Build document search over the configured index and embedding provider.
pub fn document_search(settings: &Settings, embedding_api_key: &str) -> Result<DocumentSearch> {
    let retry = RetryPolicy::from(&settings.retry);
    let embedder =
        OpenAIEmbedder::new(&settings.embedding, embedding_api_key)?.with_retry(retry.clone());

    Ok(DocumentSearch::new(open_index(settings)?, Arc::new(embedder))
        .with_top_k(settings.retrieval.top_k)
        .with_retry(retry))
}
