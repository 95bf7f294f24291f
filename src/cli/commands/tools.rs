//! Tools command implementation.

use crate::cli::Output;
use crate::tools::ToolKind;
use console::style;

/// List every tool with the description the model sees.
pub fn run_tools() {
    Output::header("Available Tools");
    println!();

    for kind in ToolKind::ALL {
        println!("  {} {} ({})", style("*").cyan(), style(kind.name()).bold(), kind.label());
        println!("      {}", kind.description());
    }

    println!();
    Output::info("'scout run' uses every tool except company_document_search.");
}
