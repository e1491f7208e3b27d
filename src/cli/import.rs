//! `wsc import`: stream a scraped card JSON array into the SQLite store.

use std::path::PathBuf;

use anyhow::{ensure, Result};
use tracing::info;

use crate::ingest::{ingest_file, IngestOptions, IngestSummary};
use crate::store::CardStore;

#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Input JSON file (array of raw card records).
    pub input: PathBuf,
    /// SQLite database path; created if absent.
    pub db: PathBuf,
    /// Rows per transaction.
    pub batch_size: usize,
    /// Build secondary indexes after the import.
    pub build_indexes: bool,
    /// Cap on records processed, for dry runs.
    pub max_rows: Option<usize>,
}

pub fn run(cfg: ImportConfig) -> Result<IngestSummary> {
    // Checked before the store is opened so a bad invocation never touches
    // (or creates) the database file.
    ensure!(
        cfg.input.exists(),
        "input file not found: {}",
        cfg.input.display()
    );

    let mut store = CardStore::open(&cfg.db)?;
    let opts = IngestOptions {
        batch_size: cfg.batch_size,
        build_indexes: cfg.build_indexes,
        max_rows: cfg.max_rows,
    };
    let summary = ingest_file(&mut store, &cfg.input, &opts)?;
    info!(
        rows = summary.rows,
        batches = summary.batches,
        db = %cfg.db.display(),
        "import finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("wscards-{}-{name}", std::process::id()))
    }

    #[test]
    fn missing_input_fails_without_creating_the_db() {
        let db = temp_path("missing-input.db");
        let _ = fs::remove_file(&db);
        let result = run(ImportConfig {
            input: temp_path("does-not-exist.json"),
            db: db.clone(),
            batch_size: 1000,
            build_indexes: true,
            max_rows: None,
        });
        assert!(result.is_err());
        assert!(!db.exists(), "db must not be created for a missing input");
    }

    #[test]
    fn imports_a_file_end_to_end() {
        let input = temp_path("import-input.json");
        let db = temp_path("import-e2e.db");
        let _ = fs::remove_file(&db);
        fs::write(
            &input,
            r#"[{"card_no":"DC/W01-001","name":"Foo"},{"card_no":"DC/W01-002","name":"Bar"}]"#,
        )
        .unwrap();

        let summary = run(ImportConfig {
            input: input.clone(),
            db: db.clone(),
            batch_size: 1000,
            build_indexes: true,
            max_rows: None,
        })
        .unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.batches, 1);

        let store = CardStore::open(&db).unwrap();
        assert_eq!(store.count_cards().unwrap(), 2);

        let _ = fs::remove_file(&input);
        let _ = fs::remove_file(&db);
    }
}
