//! Doctor command - verify credentials, document index and configuration.

use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::{SqliteVectorStore, VectorStore};
use console::style;
use std::path::PathBuf;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(config_path: Option<PathBuf>, settings: &Settings) -> anyhow::Result<()> {
    Output::header("Scout Doctor");
    println!();
    println!("Checking credentials and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("API Keys").bold());
    let llm_key = settings.llm.api_key_env.as_str();
    let embedding_key = settings.embedding.api_key_env.as_str();
    let key_checks = vec![
        check_api_key(llm_key, std::env::var(llm_key).ok(), true),
        check_api_key(embedding_key, std::env::var(embedding_key).ok(), false),
    ];
    for check in &key_checks {
        check.print();
    }
    checks.extend(key_checks);

    println!();

    println!("{}", style("Document Index").bold());
    let index_check = check_index(settings).await;
    index_check.print();
    checks.push(index_check);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check =
        check_config_file(&config_path.unwrap_or_else(Settings::default_config_path));
    config_check.print();
    checks.push(config_check);
    Output::kv("Model", &format!("{} ({})", settings.llm.model, settings.llm.api_base));
    Output::kv("Embeddings", &settings.embedding.model);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Scout.",
            errors
        ));
        anyhow::bail!("doctor found {} error(s)", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Scout is ready to use.");
    }

    Ok(())
}

/// Check an API key variable. A missing optional key is only a warning.
fn check_api_key(name: &str, value: Option<String>, required: bool) -> CheckResult {
    let hint = format!("Set with: export {}='...' (or add it to .env)", name);

    match value {
        Some(key) if !key.trim().is_empty() => {
            CheckResult::ok(name, &format!("configured ({})", mask(&key)))
        }
        Some(_) => CheckResult::error(name, "empty", &hint),
        None if required => CheckResult::error(name, "not set", &hint),
        None => CheckResult::warning(
            name,
            "not set (company document search disabled)",
            &hint,
        ),
    }
}

fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Open the index and count its chunks.
async fn check_index(settings: &Settings) -> CheckResult {
    let path = settings.sqlite_path();
    if !path.exists() {
        return CheckResult::warning(
            "Index",
            &format!("{} (not found)", path.display()),
            "Company document search needs an index built by your indexer",
        );
    }

    let store = match SqliteVectorStore::open(&path) {
        Ok(store) => store,
        Err(e) => {
            return CheckResult::error(
                "Index",
                &e.to_string(),
                "Point vector_store.sqlite_path at an index with a 'chunks' table",
            )
        }
    };

    let size = std::fs::metadata(&path)
        .map(|m| format_size(m.len()))
        .unwrap_or_else(|_| "unknown size".to_string());

    match store.chunk_count().await {
        Ok(0) => CheckResult::warning(
            "Index",
            &format!("{} ({}, empty)", path.display(), size),
            "The index has no chunks; document search will find nothing",
        ),
        Ok(count) => CheckResult::ok(
            "Index",
            &format!("{} ({}, {} chunks)", path.display(), size, count),
        ),
        Err(e) => CheckResult::error("Index", &e.to_string(), "The index could not be read"),
    }
}

/// Check that the config file exists and parses.
fn check_config_file(config_path: &PathBuf) -> CheckResult {
    if !config_path.exists() {
        return CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: scout config edit",
        );
    }

    match Settings::load_from(Some(config_path)) {
        Ok(_) => CheckResult::ok("Config file", &format!("{}", config_path.display())),
        Err(e) => CheckResult::error("Config file", &e.to_string(), "Fix with: scout config edit"),
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::SCHEMA;

    #[test]
    fn test_api_key_checks() {
        let ok = check_api_key("GROQ_API_KEY", Some("gsk_abcdefghijklmnop".to_string()), true);
        assert_eq!(ok.status, CheckStatus::Ok);
        assert!(ok.message.contains("gsk_...mnop"));
        assert!(!ok.message.contains("efgh"));

        assert_eq!(
            check_api_key("GROQ_API_KEY", None, true).status,
            CheckStatus::Error
        );
        assert_eq!(
            check_api_key("COHERE_API_KEY", None, false).status,
            CheckStatus::Warning
        );
        assert_eq!(
            check_api_key("COHERE_API_KEY", Some(String::new()), false).status,
            CheckStatus::Error
        );
    }

    #[tokio::test]
    async fn test_index_checks() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();

        settings.vector_store.sqlite_path = dir.path().join("missing.db").to_string_lossy().to_string();
        assert_eq!(check_index(&settings).await.status, CheckStatus::Warning);

        let path = dir.path().join("index.db");
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute_batch(SCHEMA)
            .unwrap();
        settings.vector_store.sqlite_path = path.to_string_lossy().to_string();
        let empty = check_index(&settings).await;
        assert_eq!(empty.status, CheckStatus::Warning);
        assert!(empty.message.contains("empty"));
    }

    #[test]
    fn test_config_file_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(check_config_file(&path).status, CheckStatus::Warning);

        std::fs::write(&path, "[agent]\nmax_iterations = 3\n").unwrap();
        assert_eq!(check_config_file(&path).status, CheckStatus::Ok);

        std::fs::write(&path, "[agent\n").unwrap();
        assert_eq!(check_config_file(&path).status, CheckStatus::Error);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
    }
}
