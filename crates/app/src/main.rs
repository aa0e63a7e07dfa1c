use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "finanzblick", about = "Imports German bank CSV exports and summarizes spending.")]
pub struct Cli {
    /// Directory holding the database, settings and rules (default: platform data dir)
    #[arg(long = "data-dir", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import one or more CSV exports. Ctrl-C stops after the current file.
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List imported files.
    Files,
    /// Show the transactions of one import.
    Show { id: i64 },
    /// Delete an import and its transactions.
    Delete { id: i64 },
    /// Summarize the recent past.
    Summary {
        /// Window length in months, ending today.
        #[arg(long, default_value_t = 3)]
        months: u32,
        /// Number of counterparties to rank.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Hide a counterparty from summaries, or show it again with --remove.
    Exclude {
        term: String,
        /// Apply to income senders instead of expense recipients.
        #[arg(long)]
        income: bool,
        #[arg(long)]
        remove: bool,
    },
}

pub struct AppContext {
    pub data_dir: PathBuf,
    pub db: finanzblick_storage::DbPool,
}

impl AppContext {
    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.toml")
    }

    pub fn rules_path(&self) -> PathBuf {
        self.data_dir.join("rules.toml")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => directories::ProjectDirs::from("de", "finanzblick", "Finanzblick")
            .context("Failed to resolve app data directory")?
            .data_dir()
            .to_path_buf(),
    };
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let db = finanzblick_storage::create_db(&data_dir.join("finanzblick.db"))
        .await
        .context("Failed to open database")?;
    let ctx = AppContext { data_dir, db };

    match cli.command {
        Commands::Import { files } => commands::import(&ctx, &files).await,
        Commands::Files => commands::list_files(&ctx).await,
        Commands::Show { id } => commands::show(&ctx, id).await,
        Commands::Delete { id } => commands::delete(&ctx, id).await,
        Commands::Summary { months, top } => commands::summary(&ctx, months, top).await,
        Commands::Exclude {
            term,
            income,
            remove,
        } => commands::exclude(&ctx, &term, income, remove),
    }
}
