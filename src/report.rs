//! Prediction aggregation: threshold the classifiers' probabilities and
//! average them by title, day, state, comment score and submission score.

use crate::aggregate::Aggregator;
use crate::date::day_from_epoch;
use crate::pipeline::SentimentPipeline;
use crate::records::lenient_i64;
use crate::util::{create_with_backoff, replace_file_atomic_backoff};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const TOP_N: usize = 10;

/// A scoring row after both classifiers ran. `pos_probability` and
/// `neg_probability` are each classifier's probability of class 1.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PredictionRow {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub timestamp: Option<i64>,
    pub title: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub comment_score: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub story_score: Option<i64>,
    pub pos_probability: Option<f64>,
    pub neg_probability: Option<f64>,
}

/// Running sums of the 0/1 decisions for one group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mean {
    pub pos: u64,
    pub neg: u64,
    pub n: u64,
}

impl Mean {
    fn add(&mut self, pos: u8, neg: u8) {
        self.pos += pos as u64;
        self.neg += neg as u64;
        self.n += 1;
    }
    fn merge(&mut self, other: Mean) {
        self.pos += other.pos;
        self.neg += other.neg;
        self.n += other.n;
    }
    pub fn positive(&self) -> f64 {
        if self.n == 0 { 0.0 } else { self.pos as f64 / self.n as f64 }
    }
    pub fn negative(&self) -> f64 {
        if self.n == 0 { 0.0 } else { self.neg as f64 / self.n as f64 }
    }
}

fn merge_groups(into: &mut BTreeMap<String, Mean>, from: BTreeMap<String, Mean>) {
    for (k, m) in from {
        into.entry(k).or_default().merge(m);
    }
}

fn opt_key(v: Option<i64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_default()
}

/// Aggregation state over prediction rows. Missing keys group under `""`,
/// except state, where `""` (no state flair) is left out.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SentimentTotals {
    pub positive_threshold: f64,
    pub negative_threshold: f64,
    pub rows: u64,
    pub skipped: u64,
    pub by_title: BTreeMap<String, Mean>,
    pub by_date: BTreeMap<String, Mean>,
    pub by_state: BTreeMap<String, Mean>,
    pub by_comment_score: BTreeMap<String, Mean>,
    pub by_submission_score: BTreeMap<String, Mean>,
}

impl SentimentTotals {
    pub fn new(positive_threshold: f64, negative_threshold: f64) -> Self {
        Self {
            positive_threshold,
            negative_threshold,
            rows: 0,
            skipped: 0,
            by_title: BTreeMap::new(),
            by_date: BTreeMap::new(),
            by_state: BTreeMap::new(),
            by_comment_score: BTreeMap::new(),
            by_submission_score: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, row: &PredictionRow) {
        let (Some(p), Some(q)) = (row.pos_probability, row.neg_probability) else {
            self.skipped += 1;
            return;
        };
        let pos = (p > self.positive_threshold) as u8;
        let neg = (q > self.negative_threshold) as u8;
        self.rows += 1;

        self.by_title.entry(row.title.clone().unwrap_or_default()).or_default().add(pos, neg);
        let date = row.timestamp.map(day_from_epoch).unwrap_or_default();
        self.by_date.entry(date).or_default().add(pos, neg);
        if let Some(state) = row.state.as_deref().filter(|s| !s.is_empty()) {
            self.by_state.entry(state.to_string()).or_default().add(pos, neg);
        }
        self.by_comment_score.entry(opt_key(row.comment_score)).or_default().add(pos, neg);
        self.by_submission_score.entry(opt_key(row.story_score)).or_default().add(pos, neg);
    }
}

impl Aggregator for SentimentTotals {
    fn ingest(&mut self, record: &Value) {
        match PredictionRow::deserialize(record) {
            Ok(row) => self.record(&row),
            Err(e) => {
                tracing::debug!(error = %e, "skipping prediction row");
                self.skipped += 1;
            }
        }
    }

    fn merge(&mut self, other: Self) {
        self.rows += other.rows;
        self.skipped += other.skipped;
        merge_groups(&mut self.by_title, other.by_title);
        merge_groups(&mut self.by_date, other.by_date);
        merge_groups(&mut self.by_state, other.by_state);
        merge_groups(&mut self.by_comment_score, other.by_comment_score);
        merge_groups(&mut self.by_submission_score, other.by_submission_score);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SummaryRow {
    pub key: String,
    pub positive: f64,
    pub negative: f64,
}

/// One output CSV: a key column followed by `Positive` and `Negative`.
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryTable {
    pub file_name: &'static str,
    pub key_column: &'static str,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    fn from_groups(file_name: &'static str, key_column: &'static str, groups: &BTreeMap<String, Mean>) -> Self {
        let rows = groups
            .iter()
            .map(|(k, m)| SummaryRow { key: k.clone(), positive: m.positive(), negative: m.negative() })
            .collect();
        Self { file_name, key_column, rows }
    }

    /// Integer keys sort numerically; the empty (missing) key goes first.
    fn sort_numeric(mut self) -> Self {
        self.rows.sort_by_key(|r| r.key.parse::<i64>().ok());
        self
    }

    /// The `n` rows with the largest value, ties broken by key.
    fn top_by(&self, file_name: &'static str, n: usize, value: impl Fn(&SummaryRow) -> f64) -> Self {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| {
            value(b)
                .partial_cmp(&value(a))
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.key.cmp(&b.key))
        });
        rows.truncate(n);
        Self { file_name, key_column: self.key_column, rows }
    }

    pub fn get(&self, key: &str) -> Option<&SummaryRow> {
        self.rows.iter().find(|r| r.key == key)
    }

    pub fn write_csv(&self, dir: &Path) -> Result<PathBuf> {
        let out = dir.join(self.file_name);
        let tmp = out.with_extension("csv.inprogress");
        let f = create_with_backoff(&tmp, 16, 50).with_context(|| format!("create {}", tmp.display()))?;
        let mut w = csv::Writer::from_writer(f);
        w.write_record([self.key_column, "Positive", "Negative"])?;
        for r in &self.rows {
            let (pos, neg) = (format!("{:?}", r.positive), format!("{:?}", r.negative));
            w.write_record([r.key.as_str(), pos.as_str(), neg.as_str()])?;
        }
        w.flush()?;
        drop(w);
        replace_file_atomic_backoff(&tmp, &out)?;
        Ok(out)
    }
}

/// All summary tables, in the order they are written.
#[derive(Clone, Debug, PartialEq)]
pub struct SentimentReport {
    pub rows: u64,
    pub skipped: u64,
    pub by_title: SummaryTable,
    pub by_date: SummaryTable,
    pub by_state: SummaryTable,
    pub by_comment_score: SummaryTable,
    pub by_submission_score: SummaryTable,
    pub positive_top: SummaryTable,
    pub negative_top: SummaryTable,
}

impl SentimentReport {
    pub fn from_totals(t: &SentimentTotals) -> Self {
        let by_title = SummaryTable::from_groups("totalPercent.csv", "title", &t.by_title);
        let positive_top = by_title.top_by("positiveTop.csv", TOP_N, |r| r.positive);
        let negative_top = by_title.top_by("negativeTop.csv", TOP_N, |r| r.negative);
        Self {
            rows: t.rows,
            skipped: t.skipped,
            by_date: SummaryTable::from_groups("time_data.csv", "date", &t.by_date),
            by_state: SummaryTable::from_groups("state_data.csv", "state", &t.by_state),
            by_comment_score: SummaryTable::from_groups("comment_score.csv", "comment_score", &t.by_comment_score)
                .sort_numeric(),
            by_submission_score: SummaryTable::from_groups("submission_score.csv", "submission_score", &t.by_submission_score)
                .sort_numeric(),
            by_title,
            positive_top,
            negative_top,
        }
    }

    pub fn tables(&self) -> [&SummaryTable; 7] {
        [
            &self.by_title,
            &self.by_date,
            &self.by_state,
            &self.by_comment_score,
            &self.by_submission_score,
            &self.positive_top,
            &self.negative_top,
        ]
    }

    pub fn write_csvs(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        self.tables().iter().map(|t| t.write_csv(dir)).collect()
    }
}

impl SentimentPipeline {
    /// Aggregate prediction JSONL files and write the summary CSVs into `out_dir`.
    pub fn aggregate_predictions(&self, inputs: &[PathBuf], out_dir: &Path) -> Result<SentimentReport> {
        self.init_runtime();
        let work_dir = self.ensure_work_dir()?;
        let (pos_t, neg_t) = (self.opts.positive_threshold, self.opts.negative_threshold);

        let totals = self.aggregate_jsonls_parallel(
            inputs,
            &work_dir.join("prediction_shards"),
            || SentimentTotals::new(pos_t, neg_t),
            &work_dir.join("prediction_totals.json"),
        )?;
        if totals.skipped > 0 {
            tracing::warn!(skipped = totals.skipped, "prediction rows without both probabilities were skipped");
        }

        let report = SentimentReport::from_totals(&totals);
        let written = report.write_csvs(out_dir)?;
        tracing::info!(rows = report.rows, files = written.len(), out = %out_dir.display(), "summary CSVs written");
        Ok(report)
    }
}
