//! Sources command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator;
use crate::vector_store::{IndexedSource, VectorStore};
use anyhow::Result;
use console::style;

/// Run the sources command.
pub async fn run_sources(settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Sources, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let store = orchestrator::open_index(&settings)?;

    match store.list_sources().await {
        Ok(sources) => {
            if sources.is_empty() {
                Output::info("The document index is empty.");
            } else {
                Output::header(&format!("Indexed Documents ({})", sources.len()));
                println!();

                for source in &sources {
                    println!("  {} {}", style("*").cyan(), describe(source));
                }

                let total_chunks: u32 = sources.iter().map(|s| s.chunk_count).sum();
                println!();
                Output::kv("Total documents", &sources.len().to_string());
                Output::kv("Total chunks", &total_chunks.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list sources: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

fn describe(source: &IndexedSource) -> String {
    match source.max_page {
        Some(pages) => format!(
            "{} ({} chunks, {} pages)",
            style(&source.source).bold(),
            source.chunk_count,
            pages
        ),
        None => format!("{} ({} chunks)", style(&source.source).bold(), source.chunk_count),
    }
}
