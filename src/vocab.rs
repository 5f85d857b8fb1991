//! Binary bag-of-n-grams vocabulary with a minimum document-frequency cutoff.

use crate::aggregate::Aggregator;
use ahash::AHashMap;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::util::{create_with_backoff, open_with_backoff};

/// Minimum number of documents a term must appear in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MinDf {
    /// Absolute document count.
    Count(u64),
    /// Fraction of all documents, in `[0, 1]`.
    Fraction(f64),
}

impl Default for MinDf {
    fn default() -> Self {
        MinDf::Count(10)
    }
}

impl MinDf {
    pub fn threshold(self, documents: u64) -> f64 {
        match self {
            MinDf::Count(n) => n as f64,
            MinDf::Fraction(f) => f.clamp(0.0, 1.0) * documents as f64,
        }
    }
}

/// Per-term counts gathered over training rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermStats {
    /// Documents containing the term.
    pub df: u64,
    /// Occurrences across all documents.
    pub count: u64,
}

/// Aggregator over rows with a `body` array of n-grams.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DocFrequency {
    pub documents: u64,
    pub terms: BTreeMap<String, TermStats>,
}

impl DocFrequency {
    pub fn add_document<S: AsRef<str>>(&mut self, grams: &[S]) {
        self.documents += 1;
        let mut seen: HashSet<&str> = HashSet::with_capacity(grams.len());
        for g in grams {
            let g = g.as_ref();
            let first = seen.insert(g);
            let st = self.terms.entry(g.to_string()).or_default();
            st.count += 1;
            if first {
                st.df += 1;
            }
        }
    }
}

impl Aggregator for DocFrequency {
    fn ingest(&mut self, record: &Value) {
        let Some(body) = record.get("body").and_then(|b| b.as_array()) else { return };
        let grams: Vec<&str> = body.iter().filter_map(|g| g.as_str()).collect();
        self.add_document(&grams);
    }

    fn merge(&mut self, other: Self) {
        self.documents += other.documents;
        for (term, st) in other.terms {
            let e = self.terms.entry(term).or_default();
            e.df += st.df;
            e.count += st.count;
        }
    }
}

/// Ordered term list; a term's position is its feature index.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Vocabulary {
    terms: Vec<String>,
    #[serde(skip)]
    index: AHashMap<String, u32>,
}

impl PartialEq for Vocabulary {
    fn eq(&self, other: &Self) -> bool {
        self.terms == other.terms
    }
}

impl Vocabulary {
    pub fn from_terms(terms: Vec<String>) -> Self {
        let index = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i as u32))
            .collect();
        Self { terms, index }
    }

    /// Keep terms whose document frequency reaches `min_df`, most frequent
    /// first (ties by term), truncated to `vocab_size` when given.
    pub fn from_counts(counts: &DocFrequency, min_df: MinDf, vocab_size: Option<usize>) -> Self {
        let cutoff = min_df.threshold(counts.documents);
        let mut kept: Vec<(&String, &TermStats)> = counts
            .terms
            .iter()
            .filter(|(_, st)| st.df as f64 >= cutoff)
            .collect();
        kept.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));
        if let Some(n) = vocab_size {
            kept.truncate(n);
        }
        Self::from_terms(kept.into_iter().map(|(t, _)| t.clone()).collect())
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
    pub fn terms(&self) -> &[String] {
        &self.terms
    }
    pub fn index_of(&self, term: &str) -> Option<u32> {
        self.index.get(term).copied()
    }

    /// Sorted, de-duplicated indices of the known terms in `grams`.
    pub fn transform<S: AsRef<str>>(&self, grams: &[S]) -> Vec<u32> {
        let mut idx: Vec<u32> = grams.iter().filter_map(|g| self.index_of(g.as_ref())).collect();
        idx.sort_unstable();
        idx.dedup();
        idx
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let f = create_with_backoff(path, 16, 50).with_context(|| format!("create {}", path.display()))?;
        let mut w = BufWriter::new(f);
        serde_json::to_writer(&mut w, self)?;
        w.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let f = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
        let v: Vocabulary = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("decode vocabulary {}", path.display()))?;
        Ok(Self::from_terms(v.terms))
    }
}
