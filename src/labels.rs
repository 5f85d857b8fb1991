//! Hand-labeled comment sentiment, read from a headerless CSV where column 0
//! is the comment id and column 3 the label in {-1, 0, 1}.

use ahash::AHashMap;
use anyhow::{Context, Result};
use std::path::Path;

use crate::util::open_with_backoff;

const ID_COL: usize = 0;
const LABEL_COL: usize = 3;

/// Sentiment toward the subject: -1 negative, 0 neutral, 1 positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Label(i8);

impl Label {
    pub fn new(v: i8) -> Option<Self> {
        matches!(v, -1..=1).then_some(Self(v))
    }
    pub fn parse(s: &str) -> Option<Self> {
        s.trim().parse::<i8>().ok().and_then(Self::new)
    }
    pub fn value(self) -> i8 {
        self.0
    }
    /// Target for the positive classifier.
    pub fn positive(self) -> u8 {
        (self.0 == 1) as u8
    }
    /// Target for the negative classifier.
    pub fn negative(self) -> u8 {
        (self.0 == -1) as u8
    }
}

#[derive(Debug, Default)]
pub struct LabeledSet {
    by_id: AHashMap<String, Vec<Label>>,
    rows: usize,
    skipped: usize,
}

impl LabeledSet {
    pub fn load(path: &Path) -> Result<Self> {
        let f = open_with_backoff(path, 16, 50).with_context(|| format!("open labels {}", path.display()))?;
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(f);

        let mut set = LabeledSet::default();
        for rec in rdr.records() {
            let rec = rec.with_context(|| format!("read labels {}", path.display()))?;
            let id = rec.get(ID_COL).map(str::trim).unwrap_or("");
            let label = rec.get(LABEL_COL).and_then(Label::parse);
            match label {
                Some(label) if !id.is_empty() => set.insert(id, label),
                _ => {
                    // Header rows land here too.
                    tracing::debug!(line = ?rec.position().map(|p| p.line()), "skipping unlabeled row");
                    set.skipped += 1;
                }
            }
        }
        tracing::info!(rows = set.rows, ids = set.by_id.len(), skipped = set.skipped, "labels loaded");
        Ok(set)
    }

    pub fn insert(&mut self, id: &str, label: Label) {
        self.by_id.entry(id.to_string()).or_default().push(label);
        self.rows += 1;
    }

    /// Every label recorded for `id`; duplicates are kept so each one
    /// produces its own joined row.
    pub fn labels_for(&self, id: &str) -> &[Label] {
        self.by_id.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
    pub fn skipped(&self) -> usize {
        self.skipped
    }
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}
