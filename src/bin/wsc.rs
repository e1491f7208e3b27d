use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;
use wscards::util::env;

/// Exit code when the input file named on the command line does not exist.
const EXIT_INPUT_NOT_FOUND: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "wsc", version, about = "Weiss Schwarz card data admin CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Stream-import a scraped card JSON array into the SQLite catalog
    Import {
        /// Input JSON file (array of card records)
        input: PathBuf,
        /// SQLite database path (default: env WS_DB or ws_cards.db)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Rows per transaction
        #[arg(long, default_value_t = 1000)]
        batch_size: usize,
        /// Skip building secondary indexes after the import
        #[arg(long, default_value_t = false)]
        no_index: bool,
        /// Maximum number of records to import (default: all)
        #[arg(long)]
        max: Option<usize>,
    },
    /// Fill missing side/color fields in a scraped export via heuristics
    Repair {
        /// Input JSON file (array of card records)
        input: PathBuf,
        /// Output path (default: <input stem>.fixed.json next to the input)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Extract the set of unique characters appearing in card text
    Characters {
        /// Input JSON file (array of card records)
        input: PathBuf,
        /// Output text file
        #[arg(long, default_value = "required_characters.txt")]
        output: PathBuf,
    },
    /// Print row count, index list, and sample rows for a card database
    Verify {
        /// SQLite database path (default: env WS_DB or ws_cards.db)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    env::init_env();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();

    let cli = Cli::parse();

    if let Some(missing) = missing_input(&cli.command) {
        eprintln!("Input file not found: {}", missing.display());
        return ExitCode::from(EXIT_INPUT_NOT_FOUND);
    }

    match dispatch(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "command failed");
            ExitCode::FAILURE
        }
    }
}

/// The missing-input case gets a dedicated exit code, checked up front so no
/// command touches the filesystem before the complaint.
fn missing_input(command: &Commands) -> Option<&Path> {
    let input = match command {
        Commands::Import { input, .. } => input,
        Commands::Repair { input, .. } => input,
        Commands::Characters { input, .. } => input,
        Commands::Verify { .. } => return None,
    };
    (!input.exists()).then_some(input.as_path())
}

fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Import {
            input,
            db,
            batch_size,
            no_index,
            max,
        } => {
            use wscards::cli::import::{run, ImportConfig};
            let summary = run(ImportConfig {
                input,
                db: resolve_db_path(db),
                batch_size: batch_size.max(1),
                build_indexes: !no_index,
                max_rows: max,
            })?;
            println!("Import finished. Total imported: {}", summary.rows);
        }
        Commands::Repair { input, output } => {
            use wscards::cli::repair::{run, RepairConfig};
            let summary = run(RepairConfig { input, output })?;
            println!(
                "Repair finished. Sides filled: {}, color candidates added: {}",
                summary.sides_filled, summary.color_candidates_added
            );
        }
        Commands::Characters { input, output } => {
            use wscards::cli::characters::{run, CharactersConfig};
            let count = run(CharactersConfig { input, output })?;
            println!("Unique characters: {count}");
        }
        Commands::Verify { db } => {
            use wscards::cli::verify::{run, VerifyConfig};
            run(VerifyConfig {
                db: resolve_db_path(db),
            })?;
        }
    }
    Ok(())
}

fn resolve_db_path(override_path: Option<PathBuf>) -> PathBuf {
    override_path
        .or_else(|| env::env_opt("WS_DB").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("ws_cards.db"))
}
