//! SQLite-backed upsert sink for canonical card rows.
//!
//! The store owns an explicitly-passed connection; nothing here is a module
//! singleton. Each batch is committed as its own transaction, so a failed run
//! leaves prior batches intact and a re-run converges via the upsert.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::normalize::CardRow;

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS cards(
  id INTEGER PRIMARY KEY,
  card_no TEXT UNIQUE,
  name TEXT,
  work_id TEXT,
  detail_page_url TEXT,
  image_url TEXT,
  side TEXT,
  color TEXT,
  card_type TEXT,
  level INTEGER,
  power INTEGER,
  cost INTEGER,
  rarity TEXT,
  trigger_kind TEXT,
  flavor_text TEXT,
  abilities_json TEXT,
  traits_json TEXT,
  raw_json TEXT,
  created_at TEXT DEFAULT CURRENT_TIMESTAMP,
  updated_at TEXT
);
"#;

/// Full-field replace on natural-key conflict. `id` and `created_at` are the
/// only columns that survive an upsert.
const UPSERT_SQL: &str = r#"
INSERT INTO cards(
  card_no, name, work_id, detail_page_url, image_url, side, color, card_type,
  level, power, cost, rarity, trigger_kind, flavor_text,
  abilities_json, traits_json, raw_json, updated_at
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
ON CONFLICT(card_no) DO UPDATE SET
  name = excluded.name,
  work_id = excluded.work_id,
  detail_page_url = excluded.detail_page_url,
  image_url = excluded.image_url,
  side = excluded.side,
  color = excluded.color,
  card_type = excluded.card_type,
  level = excluded.level,
  power = excluded.power,
  cost = excluded.cost,
  rarity = excluded.rarity,
  trigger_kind = excluded.trigger_kind,
  flavor_text = excluded.flavor_text,
  abilities_json = excluded.abilities_json,
  traits_json = excluded.traits_json,
  raw_json = excluded.raw_json,
  updated_at = excluded.updated_at;
"#;

const INDEX_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_cards_work_id ON cards(work_id);
CREATE INDEX IF NOT EXISTS idx_cards_side ON cards(side);
CREATE INDEX IF NOT EXISTS idx_cards_color ON cards(color);
CREATE INDEX IF NOT EXISTS idx_cards_type_level ON cards(card_type, level);
CREATE INDEX IF NOT EXISTS idx_cards_card_no ON cards(card_no);
"#;

/// Subset of columns printed by `wsc verify`.
#[derive(Debug, Serialize)]
pub struct CardSummary {
    pub card_no: Option<String>,
    pub name: Option<String>,
    pub work_id: Option<String>,
    pub side: Option<String>,
    pub color: Option<String>,
    pub image_url: Option<String>,
}

pub struct CardStore {
    conn: Connection,
}

impl CardStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("open sqlite database at {}", path.display()))?;
        Self::init(conn)
    }

    /// In-memory store, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().context("open in-memory sqlite database")?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
"#,
        )
        .context("apply sqlite pragmas")?;
        conn.execute_batch(CREATE_TABLE_SQL)
            .context("create cards schema")?;
        Ok(Self { conn })
    }

    /// Commit one batch of rows as a single transaction.
    ///
    /// `updated_at` is stamped here, at write time, with one timestamp for the
    /// whole batch. Returns the number of rows written.
    pub fn upsert_batch(&mut self, rows: &[CardRow]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let updated_at = Utc::now().to_rfc3339();
        let tx = self.conn.transaction().context("begin batch transaction")?;
        {
            let mut stmt = tx.prepare_cached(UPSERT_SQL).context("prepare upsert")?;
            for row in rows {
                let abilities_json =
                    serde_json::to_string(&row.abilities).context("serialize abilities")?;
                let traits_json = serde_json::to_string(&row.traits).context("serialize traits")?;
                stmt.execute(params![
                    row.card_no,
                    row.name,
                    row.work_id,
                    row.detail_page_url,
                    row.image_url,
                    row.side,
                    row.color,
                    row.card_type,
                    row.level,
                    row.power,
                    row.cost,
                    row.rarity,
                    row.trigger_kind,
                    row.flavor_text,
                    abilities_json,
                    traits_json,
                    row.raw_json,
                    updated_at,
                ])
                .with_context(|| {
                    format!(
                        "upsert card {}",
                        row.card_no.as_deref().unwrap_or("(no card_no)")
                    )
                })?;
            }
        }
        tx.commit().context("commit batch transaction")?;
        Ok(rows.len())
    }

    /// Create the secondary lookup indexes. Safe to call on an already-indexed
    /// store.
    pub fn build_indexes(&self) -> Result<()> {
        self.conn
            .execute_batch(INDEX_SQL)
            .context("create card indexes")
    }

    pub fn count_cards(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT count(*) FROM cards", [], |row| row.get(0))
            .context("count cards")
    }

    /// Names of the indexes currently attached to the cards table.
    pub fn index_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("PRAGMA index_list('cards')")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// First `limit` rows in insertion order, for spot-checking an import.
    pub fn sample_rows(&self, limit: i64) -> Result<Vec<CardSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT card_no, name, work_id, side, color, image_url
             FROM cards ORDER BY id LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit], |row| {
                Ok(CardSummary {
                    card_no: row.get(0)?,
                    name: row.get(1)?,
                    work_id: row.get(2)?,
                    side: row.get(3)?,
                    color: row.get(4)?,
                    image_url: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Direct connection access for one-off diagnostics.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
