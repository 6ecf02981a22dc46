//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use occultum_core::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "occultum")]
#[command(
    author,
    version,
    about = "Ask OccultumAI, an ancient magical spellbook"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to $OCCULTUM_CONFIG, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Vector store directory
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Collection name
    #[arg(long, global = true)]
    pub collection: Option<String>,
}

impl Cli {
    /// Apply global flag overrides on top of file and environment settings
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref store) = self.store {
            config.store.path = store.clone();
        }
        if let Some(ref collection) = self.collection {
            config.store.collection = collection.clone();
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Answer a question from the scrolls
    Ask(AskArgs),

    /// Answer questions read line by line from stdin
    Shell(ShellArgs),

    /// Show the scrolls a question would retrieve, without generating
    Search(SearchArgs),

    /// Add one scroll to the store
    Add(AddArgs),

    /// Import scrolls from a JSON Lines file of {"id"?, "text"}
    Import(ImportArgs),

    /// Show store status
    Status,

    /// Print the resolved configuration (secrets redacted)
    Config,
}

/// Retrieval overrides shared by the answering commands
#[derive(Args, Clone)]
pub struct RetrievalArgs {
    /// Number of scrolls to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Drop scrolls scoring below this cosine similarity
    #[arg(long)]
    pub min_score: Option<f32>,
}

impl RetrievalArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(k) = self.top_k {
            config.retrieval.top_k = k;
        }
        if let Some(score) = self.min_score {
            config.retrieval.min_score = Some(score);
        }
    }
}

#[derive(Args)]
pub struct AskArgs {
    /// The apprentice's question
    pub query: String,

    #[command(flatten)]
    pub retrieval: RetrievalArgs,

    /// Also print the retrieved scrolls and the prompt
    #[arg(long)]
    pub show_context: bool,
}

#[derive(Args)]
pub struct ShellArgs {
    #[command(flatten)]
    pub retrieval: RetrievalArgs,

    /// Also print the retrieved scrolls for each answer
    #[arg(long)]
    pub show_context: bool,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Text to search for
    pub query: String,

    #[command(flatten)]
    pub retrieval: RetrievalArgs,
}

#[derive(Args)]
pub struct AddArgs {
    /// Scroll text
    pub text: String,

    /// Document id (defaults to a hash of the text)
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Args)]
pub struct ImportArgs {
    /// JSON Lines file, or `-` for stdin
    pub path: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}
