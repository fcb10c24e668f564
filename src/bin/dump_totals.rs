//! Inspect totals extraction and folder roll-up from the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use survey_scanner_lib::config::Settings;
use survey_scanner_lib::services::{classify_row, reduce_document, AliasTable};
use survey_scanner_lib::types::ExtractionResult;

#[derive(Parser, Debug)]
#[command(name = "dump_totals", version, about = "Dump area totals from AI extraction results")]
struct Cli {
    /// Database file, relative to the working directory. Without it the store
    /// is SURVEY_DB_FILE under SURVEY_DATA_DIR.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reduce one AI extraction JSON file to document totals.
    Reduce {
        path: PathBuf,
        /// Print the classification of every row on the reduced page.
        #[arg(long)]
        rows: bool,
    },
    /// Recompute and print folder totals for a user.
    Aggregate {
        #[arg(long)]
        user: i64,
    },
}

fn main() -> Result<()> {
    let mut settings = Settings::load();
    survey_scanner_lib::init_tracing(&settings.log_filter);
    let cli = Cli::parse();

    match cli.command {
        Commands::Reduce { path, rows } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Could not read {}", path.display()))?;
            let result = ExtractionResult::from_json_str(&raw).context("Invalid extraction JSON")?;
            let aliases = AliasTable::default();
            if rows {
                if let Some(page) = result.pages.last() {
                    for (idx, row) in page.rows.iter().enumerate() {
                        println!("row {:>3}  {:?}", idx, classify_row(row));
                    }
                }
            }
            let totals = reduce_document(&result, &aliases);
            println!("{}", serde_json::to_string_pretty(&totals)?);
        }
        Commands::Aggregate { user } => {
            if let Some(db) = cli.db {
                let db = if db.is_absolute() { db } else { std::env::current_dir()?.join(db) };
                settings.db_file = db.to_string_lossy().into_owned();
            }
            let state = survey_scanner_lib::open(&settings)?;
            let totals = survey_scanner_lib::commands::recompute_folder_totals(&state, user)?;
            println!("{}", serde_json::to_string_pretty(&totals)?);
        }
    }
    Ok(())
}
