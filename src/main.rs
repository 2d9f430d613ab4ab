use clap::{Parser, Subcommand};
use nutriveda_rag::Result;
use nutriveda_rag::commands::{context, ingest, query, show_status};
use nutriveda_rag::config::{run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nutriveda-rag")]
#[command(about = "Food-fact retrieval for grounding an Ayurvedic nutrition assistant")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding provider and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Embed food datasets into the document store
    Ingest {
        /// CSV files or directories of CSV files. Defaults to $RAG_DATA_DIR or ./data
        paths: Vec<PathBuf>,
    },
    /// Show the stored foods most similar to a question
    Query {
        text: String,
        /// Number of results, overriding the configured default
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Print the grounding context a chat request would receive
    Context {
        text: String,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Show store statistics and embedding settings
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Ingest { paths } => {
            ingest(paths).await?;
        }
        Commands::Query { text, top_k } => {
            query(text, top_k).await?;
        }
        Commands::Context { text, top_k } => {
            context(text, top_k).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}
