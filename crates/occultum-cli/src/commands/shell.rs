//! Interactive question loop

use super::{print_error, print_report};
use crate::app::{OutputFormat, ShellArgs};
use anyhow::Result;
use occultum_core::{Config, Pipeline};
use std::io::{IsTerminal, Write};
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(args: ShellArgs, mut config: Config, format: OutputFormat) -> Result<()> {
    args.retrieval.apply(&mut config);
    let pipeline = Pipeline::from_config(&config)?;

    let interactive = std::io::stdin().is_terminal();
    if interactive {
        eprintln!("The spellbook lies open. Ask your question, or type `exit`.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if interactive {
            eprint!("apprentice> ");
            std::io::stderr().flush()?;
        }

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if matches!(trimmed, "exit" | "quit") {
            break;
        }

        // One failed question never ends the session
        match pipeline.answer_detailed(&line).await {
            Ok(report) => print_report(&report, args.show_context, format)?,
            Err(err) => {
                tracing::debug!("Question failed: {}", err);
                print_error(&err.to_string(), err.exit_code(), format);
            }
        }
    }

    Ok(())
}
