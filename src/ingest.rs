//! Streaming JSON-to-SQLite import pipeline.
//!
//! The input is one large JSON array of raw card records. Rather than
//! materializing the whole array, a `DeserializeSeed` visitor hands each
//! element to the batch sink as it is parsed, so memory stays flat for
//! arbitrarily large exports. Rows are committed in fixed-size batches, one
//! transaction per batch; a final partial batch is flushed at end of input.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::de::{self, DeserializeSeed, IgnoredAny, SeqAccess, Visitor};
use tracing::info;

use crate::normalize::{normalize, CardRow, RawRecord};
use crate::store::CardStore;
use crate::util::env::env_parse;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Rows per transaction.
    pub batch_size: usize,
    /// Build secondary indexes after the final flush.
    pub build_indexes: bool,
    /// Stop normalizing after this many records (dry runs); the remainder of
    /// the array is still drained so the parse completes.
    pub max_rows: Option<usize>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            build_indexes: true,
            max_rows: None,
        }
    }
}

/// What an import run actually did. `batches` counts committed transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub rows: usize,
    pub batches: usize,
}

/// Import a card array from a file on disk.
///
/// The caller is expected to have checked that `path` exists; a vanished file
/// still surfaces as an open error here.
pub fn ingest_file(
    store: &mut CardStore,
    path: &Path,
    opts: &IngestOptions,
) -> Result<IngestSummary> {
    let file = File::open(path).with_context(|| format!("open input file {}", path.display()))?;
    ingest_reader(store, BufReader::new(file), opts)
        .with_context(|| format!("import {}", path.display()))
}

/// Import a card array from any reader. See [`ingest_file`].
pub fn ingest_reader<R: Read>(
    store: &mut CardStore,
    reader: R,
    opts: &IngestOptions,
) -> Result<IngestSummary> {
    let mut sink = BatchSink::new(store, opts.batch_size.max(1));
    let mut failure = None;

    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    let parse = CardArraySeed {
        sink: &mut sink,
        max_rows: opts.max_rows,
        failure: &mut failure,
    }
    .deserialize(&mut deserializer);

    // A sink failure (storage layer) is reported through `failure` and takes
    // precedence over the synthetic serde error it is wrapped in.
    if let Some(err) = failure {
        return Err(err);
    }
    parse.context("parse card array")?;
    deserializer
        .end()
        .context("trailing data after card array")?;

    sink.flush()?;
    let summary = sink.finish();
    drop(sink);

    if opts.build_indexes {
        info!(indexes = 5, "building secondary indexes");
        store.build_indexes()?;
    }
    Ok(summary)
}

struct BatchSink<'a> {
    store: &'a mut CardStore,
    batch: Vec<CardRow>,
    batch_size: usize,
    summary: IngestSummary,
    progress: Progress,
}

impl<'a> BatchSink<'a> {
    fn new(store: &'a mut CardStore, batch_size: usize) -> Self {
        Self {
            store,
            batch: Vec::with_capacity(batch_size),
            batch_size,
            summary: IngestSummary::default(),
            progress: Progress::new("import"),
        }
    }

    fn push(&mut self, record: RawRecord) -> Result<()> {
        self.batch.push(normalize(&record));
        if self.batch.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let written = self.store.upsert_batch(&self.batch)?;
        self.batch.clear();
        self.summary.rows += written;
        self.summary.batches += 1;
        self.progress.tick(written);
        Ok(())
    }

    fn finish(&mut self) -> IngestSummary {
        self.progress
            .finish(self.summary.rows, self.summary.batches);
        self.summary
    }
}

/// Visits the top-level array element by element, feeding the sink.
struct CardArraySeed<'a, 'b> {
    sink: &'a mut BatchSink<'b>,
    max_rows: Option<usize>,
    failure: &'a mut Option<anyhow::Error>,
}

impl<'de, 'a, 'b> DeserializeSeed<'de> for CardArraySeed<'a, 'b> {
    type Value = usize;

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<usize, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_seq(self)
    }
}

impl<'de, 'a, 'b> Visitor<'de> for CardArraySeed<'a, 'b> {
    type Value = usize;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON array of card objects")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<usize, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut seen = 0usize;
        while self.max_rows.map_or(true, |cap| seen < cap) {
            let Some(record) = seq.next_element::<RawRecord>()? else {
                return Ok(seen);
            };
            seen += 1;
            if let Err(err) = self.sink.push(record) {
                *self.failure = Some(err);
                return Err(de::Error::custom("import aborted by sink failure"));
            }
        }
        // Row cap hit: drain the remaining elements so the array is still
        // well-formed end to end.
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(seen)
    }
}

/// Row-count progress logging, interval overridable via WS_PROGRESS_INTERVAL.
struct Progress {
    label: &'static str,
    every: usize,
    start: Instant,
    processed: usize,
    last_logged: usize,
}

impl Progress {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            every: env_parse("WS_PROGRESS_INTERVAL", 500usize).max(1),
            start: Instant::now(),
            processed: 0,
            last_logged: 0,
        }
    }

    fn tick(&mut self, n: usize) {
        self.processed += n;
        if self.processed - self.last_logged >= self.every {
            self.last_logged = self.processed;
            let elapsed = self.start.elapsed().as_secs_f64().max(0.001);
            info!(
                target: "progress",
                label = self.label,
                processed = self.processed,
                rate = format!("{:.1}/s", self.processed as f64 / elapsed),
                "progress"
            );
        }
    }

    fn finish(&mut self, rows: usize, batches: usize) {
        let elapsed = self.start.elapsed().as_secs_f64().max(0.001);
        info!(
            target: "progress",
            label = self.label,
            rows,
            batches,
            rate = format!("{:.1}/s", rows as f64 / elapsed),
            took = format!("{:.1}s", elapsed),
            "done"
        );
    }
}
