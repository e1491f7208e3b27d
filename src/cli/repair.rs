//! `wsc repair`: post-process a scraped export, filling missing fields.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use tracing::info;

use crate::normalize::RawRecord;
use crate::repair::{repair_records, RepairSummary};

#[derive(Debug, Clone)]
pub struct RepairConfig {
    /// Input JSON file (array of raw card records).
    pub input: PathBuf,
    /// Output path; defaults to `<input stem>.fixed.json` next to the input.
    pub output: Option<PathBuf>,
}

pub fn run(cfg: RepairConfig) -> Result<RepairSummary> {
    ensure!(
        cfg.input.exists(),
        "input file not found: {}",
        cfg.input.display()
    );

    let file = File::open(&cfg.input)
        .with_context(|| format!("open input file {}", cfg.input.display()))?;
    let mut records: Vec<RawRecord> =
        serde_json::from_reader(BufReader::new(file)).context("parse card array")?;

    // One-time backup of the pre-repair data, never overwritten.
    let backup = backup_path(&cfg.input);
    if !backup.exists() {
        write_pretty(&backup, &records)?;
    }

    let summary = repair_records(&mut records);

    let output = cfg.output.unwrap_or_else(|| default_output(&cfg.input));
    write_pretty(&output, &records)?;

    info!(
        sides_filled = summary.sides_filled,
        color_candidates = summary.color_candidates_added,
        output = %output.display(),
        "repair finished"
    );
    Ok(summary)
}

fn backup_path(input: &Path) -> PathBuf {
    let mut os = input.as_os_str().to_os_string();
    os.push(".bak");
    PathBuf::from(os)
}

fn default_output(input: &Path) -> PathBuf {
    match input.file_stem() {
        Some(stem) => {
            let mut name = stem.to_os_string();
            name.push(".fixed.json");
            input.with_file_name(name)
        }
        None => input.with_extension("fixed.json"),
    }
}

fn write_pretty(path: &Path, records: &[RawRecord]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("create output file {}", path.display()))?;
    serde_json::to_writer_pretty(file, records)
        .with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn default_output_appends_fixed_suffix() {
        assert_eq!(
            default_output(Path::new("/tmp/cards.json")),
            Path::new("/tmp/cards.fixed.json")
        );
    }

    #[test]
    fn repairs_a_file_and_keeps_a_backup() {
        let dir = std::env::temp_dir();
        let input = dir.join(format!("wscards-{}-repair.json", std::process::id()));
        let backup = backup_path(&input);
        let output = default_output(&input);
        let _ = fs::remove_file(&backup);

        fs::write(&input, r#"[{"card_no":"DC/W01-001"}]"#).unwrap();
        let summary = run(RepairConfig {
            input: input.clone(),
            output: None,
        })
        .unwrap();
        assert_eq!(summary.sides_filled, 1);
        assert!(backup.exists());

        let fixed: Vec<RawRecord> =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(fixed[0]["サイド"], "ヴァイス");
        // The backup holds the record as it was before the repair pass.
        let original: Vec<RawRecord> =
            serde_json::from_str(&fs::read_to_string(&backup).unwrap()).unwrap();
        assert!(!original[0].contains_key("サイド"));

        for p in [&input, &backup, &output] {
            let _ = fs::remove_file(p);
        }
    }
}
