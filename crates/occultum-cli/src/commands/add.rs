//! Add command

use crate::app::{AddArgs, OutputFormat};
use anyhow::{bail, Result};
use occultum_core::db::document_id;
use occultum_core::{build_embedder, Config, Embedder, VectorStore};

pub async fn run(args: AddArgs, config: &Config, format: OutputFormat) -> Result<()> {
    if args.text.trim().is_empty() {
        bail!("scroll text must not be empty");
    }
    config.validate()?;

    let embedder = build_embedder(config)?;
    let store = VectorStore::from_config(config)?;

    let embedding = embedder.embed(&args.text).await?;
    let id = args.id.unwrap_or_else(|| document_id(&args.text));
    store.upsert(&id, &args.text, &embedding)?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "id": id, "collection": store.collection().name })
        ),
        OutputFormat::Cli => println!("Added #{} to '{}'", id, store.collection().name),
    }
    Ok(())
}
