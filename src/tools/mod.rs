//! Tools the agent can call.
//!
//! Every tool takes a single text input and returns text. Failures are
//! turned into `Error: ...` strings here so the model can read them.

mod calculator;
mod date;
mod web_search;

pub use calculator::{calculate, evaluate, CalcError, Number};
pub use date::{current_date, format_date, DATE_FORMAT};
pub use web_search::{WebResult, WebSearch};

use crate::retrieval::DocumentSearch;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// The tools known to Scout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    WebSearch,
    Calculator,
    GetCurrentDate,
    CompanyDocumentSearch,
}

impl ToolKind {
    /// Every tool, in the order they are offered to the model.
    pub const ALL: [ToolKind; 4] = [
        ToolKind::WebSearch,
        ToolKind::Calculator,
        ToolKind::GetCurrentDate,
        ToolKind::CompanyDocumentSearch,
    ];

    /// Resolve a tool name written by the model.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().trim_matches('`').to_ascii_lowercase().as_str() {
            "web_search" | "web-search" => Some(ToolKind::WebSearch),
            "calculator" => Some(ToolKind::Calculator),
            "get_current_date" => Some(ToolKind::GetCurrentDate),
            "company_document_search" => Some(ToolKind::CompanyDocumentSearch),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::WebSearch => "web_search",
            ToolKind::Calculator => "calculator",
            ToolKind::GetCurrentDate => "get_current_date",
            ToolKind::CompanyDocumentSearch => "company_document_search",
        }
    }

    /// Usage description the model plans with.
    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::WebSearch => {
                "Use for current, general, or public information from internet. \
                 Input: specific search query."
            }
            ToolKind::Calculator => {
                "Use for math calculations. Input: math expression like '15 * 8'. \
                 Always use this for any math instead of calculating yourself."
            }
            ToolKind::GetCurrentDate => "Returns today's date. No input needed.",
            ToolKind::CompanyDocumentSearch => {
                "Use for company HR policies, employee rules, relocation, travel expenses, \
                 disciplinary action. Input: policy question."
            }
        }
    }

    /// Short label for the chat sidebar.
    pub fn label(&self) -> &'static str {
        match self {
            ToolKind::WebSearch => "Web Search",
            ToolKind::Calculator => "Calculator",
            ToolKind::GetCurrentDate => "Date",
            ToolKind::CompanyDocumentSearch => "Company Docs",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which tools a `Toolbox` offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolSet {
    /// Web search, calculator and date.
    Core,
    /// Core tools plus company document search.
    Full,
}

/// The enabled tools and the clients they need.
#[derive(Clone)]
pub struct Toolbox {
    enabled: Vec<ToolKind>,
    web: Option<Arc<WebSearch>>,
    documents: Option<Arc<DocumentSearch>>,
}

impl Toolbox {
    /// Toolbox with the core tools.
    pub fn core(web: Arc<WebSearch>) -> Self {
        Self {
            enabled: vec![
                ToolKind::WebSearch,
                ToolKind::Calculator,
                ToolKind::GetCurrentDate,
            ],
            web: Some(web),
            documents: None,
        }
    }

    /// Toolbox with every tool.
    pub fn full(web: Arc<WebSearch>, documents: Arc<DocumentSearch>) -> Self {
        Self {
            enabled: ToolKind::ALL.to_vec(),
            web: Some(web),
            documents: Some(documents),
        }
    }

    /// Toolbox with only the tools that need no remote service.
    pub fn offline() -> Self {
        Self {
            enabled: vec![ToolKind::Calculator, ToolKind::GetCurrentDate],
            web: None,
            documents: None,
        }
    }

    /// Enable document search on this toolbox.
    pub fn with_documents(mut self, documents: Arc<DocumentSearch>) -> Self {
        if !self.enabled.contains(&ToolKind::CompanyDocumentSearch) {
            self.enabled.push(ToolKind::CompanyDocumentSearch);
        }
        self.documents = Some(documents);
        self
    }

    /// Enabled tools in offer order.
    pub fn enabled(&self) -> &[ToolKind] {
        &self.enabled
    }

    /// Resolve `name` to an enabled tool.
    pub fn resolve(&self, name: &str) -> Option<ToolKind> {
        ToolKind::parse(name).filter(|kind| self.enabled.contains(kind))
    }

    /// Comma separated tool names, as listed in the prompt.
    pub fn names(&self) -> String {
        self.enabled
            .iter()
            .map(ToolKind::name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// One `name: description` line per tool.
    pub fn describe(&self) -> String {
        self.enabled
            .iter()
            .map(|kind| format!("{}: {}", kind.name(), kind.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Run a tool. Never fails; problems come back as `Error: ` text.
    pub async fn execute(&self, kind: ToolKind, input: &str) -> String {
        info!(tool = %kind, input = %input, "Executing tool");

        match kind {
            ToolKind::Calculator => calculate(input),
            ToolKind::GetCurrentDate => current_date(input),
            ToolKind::WebSearch => match &self.web {
                Some(web) => web.run(input).await,
                None => "Error: web search is not available".to_string(),
            },
            ToolKind::CompanyDocumentSearch => match &self.documents {
                Some(documents) => match documents.run(input).await {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Document search failed: {}", e);
                        format!("Error: document search failed: {}", e)
                    }
                },
                None => "Error: company document search is not available".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::tests::{document_search, policy_chunks};
    use crate::retrieval::NO_RESULTS;

    #[test]
    fn test_parse_names_and_aliases() {
        assert_eq!(ToolKind::parse("web_search"), Some(ToolKind::WebSearch));
        assert_eq!(ToolKind::parse("web-search"), Some(ToolKind::WebSearch));
        assert_eq!(ToolKind::parse(" Calculator "), Some(ToolKind::Calculator));
        assert_eq!(ToolKind::parse("`get_current_date`"), Some(ToolKind::GetCurrentDate));
        assert_eq!(
            ToolKind::parse("company_document_search"),
            Some(ToolKind::CompanyDocumentSearch)
        );
        assert_eq!(ToolKind::parse("python_repl"), None);
    }

    #[test]
    fn test_names_and_descriptions() {
        let toolbox = Toolbox::offline();
        assert_eq!(toolbox.names(), "calculator, get_current_date");

        let described = toolbox.describe();
        assert!(described.starts_with("calculator: Use for math calculations."));
        assert!(described.contains("\nget_current_date: Returns today's date."));
    }

    #[test]
    fn test_resolve_only_enabled_tools() {
        let toolbox = Toolbox::offline();
        assert_eq!(toolbox.resolve("calculator"), Some(ToolKind::Calculator));
        assert_eq!(toolbox.resolve("web_search"), None);
    }

    #[tokio::test]
    async fn test_execute_calculator_and_date() {
        let toolbox = Toolbox::offline();
        assert_eq!(toolbox.execute(ToolKind::Calculator, "15 * 8").await, "120");
        assert!(toolbox
            .execute(ToolKind::Calculator, "2 +")
            .await
            .starts_with("Error: "));

        let date = toolbox.execute(ToolKind::GetCurrentDate, "").await;
        assert!(chrono::NaiveDate::parse_from_str(&date, DATE_FORMAT).is_ok());
    }

    #[tokio::test]
    async fn test_execute_document_search() {
        let toolbox =
            Toolbox::offline().with_documents(Arc::new(document_search(policy_chunks(6))));
        assert_eq!(toolbox.enabled().len(), 3);

        let out = toolbox
            .execute(ToolKind::CompanyDocumentSearch, "relocation policy")
            .await;
        assert_eq!(out.matches("[Source: ").count(), 4);

        let empty = Toolbox::offline().with_documents(Arc::new(document_search(Vec::new())));
        assert_eq!(
            empty.execute(ToolKind::CompanyDocumentSearch, "anything").await,
            NO_RESULTS
        );
    }

    #[tokio::test]
    async fn test_missing_client_reports_error_text() {
        let toolbox = Toolbox::offline();
        let out = toolbox.execute(ToolKind::WebSearch, "rust").await;
        assert!(out.starts_with("Error: "));
    }
}
