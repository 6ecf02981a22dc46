//! Status command

use crate::app::OutputFormat;
use anyhow::Result;
use occultum_core::{Config, VectorStore};

pub async fn run(config: &Config, format: OutputFormat) -> Result<()> {
    let store = VectorStore::existing_from_config(config)?;
    let stats = store.stats()?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        OutputFormat::Cli => {
            println!("Store:           {}", stats.path.as_deref().unwrap_or("(memory)"));
            println!("Collection:      {}", stats.collection);
            println!("Documents:       {}", stats.document_count);
            println!();
            println!("Embeddings:");
            println!("  Model:         {}", stats.model);
            println!("  Dimensions:    {}", stats.dimensions);
            println!("Created:         {}", stats.created_at);
        }
    }
    Ok(())
}
