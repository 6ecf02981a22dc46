//! Import command

use crate::app::{ImportArgs, OutputFormat};
use anyhow::{bail, Context, Result};
use occultum_core::db::document_id;
use occultum_core::{build_embedder, Config, DocumentRecord, Embedder, VectorStore};
use serde::Deserialize;
use std::path::Path;
use tokio::io::AsyncReadExt;

#[derive(Debug, Deserialize)]
struct ImportRecord {
    #[serde(default)]
    id: Option<String>,
    text: String,
}

pub async fn run(args: ImportArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let content = read_input(&args.path).await?;
    let records = parse_records(&content)?;
    if records.is_empty() {
        bail!("no scrolls found in {}", args.path.display());
    }
    config.validate()?;

    let embedder = build_embedder(config)?;
    let store = VectorStore::from_config(config)?;

    let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
    eprintln!("Embedding {} scrolls...", texts.len());
    let embeddings = embedder.embed_batch(&texts).await?;

    let documents: Vec<DocumentRecord> = records
        .into_iter()
        .zip(embeddings)
        .map(|(record, embedding)| DocumentRecord {
            id: record.id.unwrap_or_else(|| document_id(&record.text)),
            text: record.text,
            embedding,
        })
        .collect();
    let imported = store.upsert_many(&documents)?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "imported": imported, "collection": store.collection().name })
        ),
        OutputFormat::Cli => println!(
            "Imported {} scrolls into '{}'",
            imported,
            store.collection().name
        ),
    }
    Ok(())
}

async fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        tokio::io::stdin()
            .read_to_string(&mut content)
            .await
            .context("failed to read stdin")?;
        return Ok(content);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

fn parse_records(content: &str) -> Result<Vec<ImportRecord>> {
    let mut records = Vec::new();
    for (n, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: ImportRecord = serde_json::from_str(line)
            .with_context(|| format!("line {}: expected {{\"id\"?, \"text\"}}", n + 1))?;
        if record.text.trim().is_empty() {
            bail!("line {}: scroll text must not be empty", n + 1);
        }
        records.push(record);
    }
    Ok(records)
}
