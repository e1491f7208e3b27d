//! `wsc verify`: quick post-import diagnostics. Prints the row count, the
//! index list, and a handful of sample rows as JSON lines.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{ensure, Context, Result};

use crate::store::CardStore;

const SAMPLE_LIMIT: i64 = 5;

#[derive(Debug, Clone)]
pub struct VerifyConfig {
    /// SQLite database path to inspect.
    pub db: PathBuf,
}

pub fn run(cfg: VerifyConfig) -> Result<()> {
    ensure!(cfg.db.exists(), "database not found: {}", cfg.db.display());
    let store = CardStore::open(&cfg.db)?;

    let mut out = String::new();
    writeln!(out, "TOTAL_ROWS: {}", store.count_cards()?).ok();

    writeln!(out, "\nINDEX_LIST:").ok();
    for name in store.index_names()? {
        writeln!(out, "  {name}").ok();
    }

    writeln!(out, "\nSAMPLE_ROWS:").ok();
    for row in store.sample_rows(SAMPLE_LIMIT)? {
        let line = serde_json::to_string(&row).context("serialize sample row")?;
        writeln!(out, "{line}").ok();
    }
    println!("{out}");
    Ok(())
}
