//! Raw label → canonical label lookup (ICD synonym table).
//!
//! Source format is UTF-8 text, one record per line, two fields separated by
//! `$`. Lines with any other field count are skipped.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use tracing::{info, warn};

/// Field delimiter in the synonym resource.
pub const DELIMITER: char = '$';

/// Immutable synonym table. Absent keys pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    canonical: HashMap<String, String>,
}

impl SynonymTable {
    /// Load the table from a `$`-delimited file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read synonym table {}", path.display()))?;
        let table = Self::parse(&raw);
        info!(entries = table.len(), path = %path.display(), "loaded synonym table");
        Ok(table)
    }

    /// Build the table from in-memory text.
    pub fn parse(raw: &str) -> Self {
        let mut canonical = HashMap::new();
        let mut skipped = 0usize;

        for line in raw.lines() {
            let fields: Vec<&str> = line.split(DELIMITER).collect();
            match fields.as_slice() {
                [raw_label, canonical_label] => {
                    canonical.insert(raw_label.to_string(), canonical_label.to_string());
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(skipped, "skipped synonym lines without exactly two fields");
        }

        let table = Self { canonical };
        let unstable = table.unstable_targets();
        if unstable > 0 {
            warn!(
                unstable,
                "synonym targets that are themselves remapped; canonicalization is not idempotent for them"
            );
        }
        table
    }

    /// Canonical form of `label`, or `label` itself when unknown.
    pub fn canonicalize<'a>(&'a self, label: &'a str) -> &'a str {
        self.canonical.get(label).map(String::as_str).unwrap_or(label)
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// Count of canonical values that appear as keys mapping elsewhere.
    fn unstable_targets(&self) -> usize {
        self.canonical
            .values()
            .filter(|v| matches!(self.canonical.get(v.as_str()), Some(next) if next != *v))
            .count()
    }
}
