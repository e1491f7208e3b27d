//! `wsc characters`: write the unique-character set used by a card export.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use tracing::info;

use crate::characters::unique_characters;
use crate::normalize::RawRecord;

#[derive(Debug, Clone)]
pub struct CharactersConfig {
    /// Input JSON file (array of raw card records).
    pub input: PathBuf,
    /// Output text file for the character set.
    pub output: PathBuf,
}

pub fn run(cfg: CharactersConfig) -> Result<usize> {
    ensure!(
        cfg.input.exists(),
        "input file not found: {}",
        cfg.input.display()
    );

    let file = File::open(&cfg.input)
        .with_context(|| format!("open input file {}", cfg.input.display()))?;
    let records: Vec<RawRecord> =
        serde_json::from_reader(BufReader::new(file)).context("parse card array")?;

    let chars = unique_characters(&records);
    let count = chars.chars().count();
    fs::write(&cfg.output, &chars)
        .with_context(|| format!("write output file {}", cfg.output.display()))?;

    info!(
        characters = count,
        output = %cfg.output.display(),
        "character extraction finished"
    );
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_the_sorted_character_set() {
        let dir = std::env::temp_dir();
        let input = dir.join(format!("wscards-{}-chars.json", std::process::id()));
        let output = dir.join(format!("wscards-{}-chars.txt", std::process::id()));
        fs::write(&input, r#"[{"name":"ba"},{"flavor_text":"cb"}]"#).unwrap();

        let count = run(CharactersConfig {
            input: input.clone(),
            output: output.clone(),
        })
        .unwrap();
        assert_eq!(count, 3);
        assert_eq!(fs::read_to_string(&output).unwrap(), "abc");

        let _ = fs::remove_file(&input);
        let _ = fs::remove_file(&output);
    }
}
