//! Ask command

use super::{print_report, require_query};
use crate::app::{AskArgs, OutputFormat};
use anyhow::Result;
use occultum_core::{Config, Pipeline};

pub async fn run(args: AskArgs, mut config: Config, format: OutputFormat) -> Result<()> {
    require_query(&args.query)?;
    args.retrieval.apply(&mut config);

    let pipeline = Pipeline::from_config(&config)?;
    let report = pipeline.answer_detailed(&args.query).await?;
    print_report(&report, args.show_context, format)
}
