use crate::checker::distance::{deletion_variants, is_deletion_of};
use crate::dict::wordlist::Normalization;
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::{debug, warn};

/// A deletion table row that was skipped while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRow {
    pub line: usize,
    pub content: String,
    pub reason: String,
}

/// Deletion-pairs table: each row maps a base word to one string obtained
/// from it by deleting characters.
#[derive(Debug, Clone, Default)]
pub struct DeletionTable {
    rows: Vec<(String, String)>,
    skipped: Vec<MalformedRow>,
}

impl DeletionTable {
    pub fn from_pairs<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        Self {
            rows: pairs
                .into_iter()
                .map(|(base, variant)| (base.into(), variant.into()))
                .collect(),
            skipped: Vec::new(),
        }
    }

    /// Load a `base<TAB>variant` table from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let table = Self::from_reader(BufReader::new(file))?;
        debug!(
            path = %path.display(),
            rows = table.rows.len(),
            skipped = table.skipped.len(),
            "loaded deletion table"
        );
        Ok(table)
    }

    /// Parse TSV rows. Malformed rows are recorded and skipped; only I/O
    /// failures are errors.
    pub fn from_reader<R: BufRead>(mut reader: R) -> Result<Self> {
        let mut table = Self::default();
        let mut buf = Vec::new();
        let mut line_no = 0;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_no += 1;

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim_end_matches(&['\n', '\r'][..]),
                Err(_) => {
                    table.skip(line_no, &String::from_utf8_lossy(&buf), "invalid UTF-8");
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != 2 {
                table.skip(line_no, line, &format!("expected 2 fields, found {}", fields.len()));
                continue;
            }
            let (base, variant) = (fields[0], fields[1]);
            if base.is_empty() {
                table.skip(line_no, line, "empty base word");
                continue;
            }
            if !is_deletion_of(base, variant) {
                table.skip(line_no, line, "variant is not a deletion of the base word");
                continue;
            }
            table.rows.push((base.to_string(), variant.to_string()));
        }

        Ok(table)
    }

    fn skip(&mut self, line: usize, content: &str, reason: &str) {
        let row = MalformedRow {
            line,
            content: content.trim_end().to_string(),
            reason: reason.to_string(),
        };
        warn!(
            "{}",
            Error::MalformedRow {
                line,
                reason: format!("{} ({:?})", reason, row.content),
            }
        );
        self.skipped.push(row);
    }

    /// The complete table for `words`: every deletion variant up to `max_distance`.
    pub fn generate(words: &[String], max_distance: usize) -> Self {
        let mut seen = HashSet::new();
        let mut rows = Vec::new();
        for word in words {
            if word.is_empty() || !seen.insert(word.as_str()) {
                continue;
            }
            for variant in deletion_variants(word, max_distance).into_iter().skip(1) {
                rows.push((word.clone(), variant));
            }
        }
        Self {
            rows,
            skipped: Vec::new(),
        }
    }

    /// Apply `normalization` to both columns.
    pub fn normalized(self, normalization: Normalization) -> Self {
        if normalization == Normalization::None {
            return self;
        }
        Self {
            rows: self
                .rows
                .into_iter()
                .map(|(base, variant)| (normalization.apply(&base), normalization.apply(&variant)))
                .collect(),
            skipped: self.skipped,
        }
    }

    pub fn write_tsv<W: Write>(&self, mut writer: W) -> Result<()> {
        for (base, variant) in &self.rows {
            writeln!(writer, "{}\t{}", base, variant)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn rows(&self) -> &[(String, String)] {
        &self.rows
    }

    pub fn skipped(&self) -> &[MalformedRow] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
