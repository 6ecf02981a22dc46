//! CLI command handlers

pub mod add;
pub mod ask;
pub mod config;
pub mod import;
pub mod search;
pub mod shell;
pub mod status;

use crate::app::OutputFormat;
use anyhow::Result;
use occultum_core::{AnswerReport, OccultumError, ScoredDocument};

/// Reject blank questions before any service is touched
pub fn require_query(query: &str) -> std::result::Result<(), OccultumError> {
    if query.trim().is_empty() {
        return Err(OccultumError::InvalidQuery(
            "the question is empty".to_string(),
        ));
    }
    Ok(())
}

pub fn format_passages(passages: &[ScoredDocument]) -> String {
    let mut output = String::new();
    for passage in passages {
        let score_pct = (passage.score * 100.0).round() as i32;
        output.push_str(&format!("{:>4}% #{}\n", score_pct, passage.id));
        for line in passage.text.lines() {
            output.push_str(&format!("  {}\n", line));
        }
    }
    output
}

pub fn print_report(report: &AnswerReport, show_context: bool, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let mut value = serde_json::json!({
                "answer": report.answer,
                "passages": report.passages,
            });
            if show_context {
                value["prompt"] = serde_json::Value::String(report.prompt.clone());
            }
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Cli => {
            if show_context {
                println!("Scrolls:");
                print!("{}", format_passages(&report.passages));
                println!();
                println!("Prompt:");
                println!("{}", report.prompt);
                println!();
            }
            println!("{}", report.answer);
        }
    }
    Ok(())
}

/// Render a failed request in place of its answer
///
/// JSON goes to stdout so scripted callers always get one object per
/// question; plain text goes to stderr.
pub fn print_error(message: &str, code: i32, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "error": message, "code": code })
        ),
        OutputFormat::Cli => eprintln!("Error: {}", message),
    }
}
