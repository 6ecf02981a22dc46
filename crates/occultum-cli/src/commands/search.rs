//! Search command

use super::{format_passages, require_query};
use crate::app::{OutputFormat, SearchArgs};
use anyhow::Result;
use occultum_core::{Config, Retriever};

pub async fn run(args: SearchArgs, mut config: Config, format: OutputFormat) -> Result<()> {
    require_query(&args.query)?;
    args.retrieval.apply(&mut config);
    config.validate()?;

    let retriever = Retriever::from_config(&config)?;
    let results = retriever
        .retrieve_scored(&args.query, config.retrieval.top_k)
        .await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Cli => {
            if results.is_empty() {
                println!("No scrolls found.");
            } else {
                print!("{}", format_passages(&results));
            }
        }
    }
    Ok(())
}
