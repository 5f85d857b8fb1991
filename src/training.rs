//! Training-set preparation: join labeled ids against the comment dump,
//! sanitize bodies, fit the n-gram vocabulary and write feature rows.

use crate::cleantext::sanitize;
use crate::jsonl::for_each_line_cfg;
use crate::labels::{Label, LabeledSet};
use crate::pipeline::SentimentPipeline;
use crate::util::{create_with_backoff, replace_file_atomic_backoff};
use crate::vocab::{DocFrequency, Vocabulary};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const TRAINING_FILE: &str = "training.jsonl";
pub const VOCABULARY_FILE: &str = "vocabulary.json";

/// Joined row before vectorization.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct StagedRow {
    id: String,
    body: Vec<String>,
    djt: i8,
}

/// One labeled example. `positive`/`negative` are the 0/1 targets of the
/// two independent classifiers; `features` indexes into the vocabulary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRow {
    pub id: String,
    pub body: Vec<String>,
    pub djt: i8,
    pub positive: u8,
    pub negative: u8,
    pub features: Vec<u32>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrainingSummary {
    pub comments_seen: u64,
    pub malformed: u64,
    pub rows: u64,
    pub vocabulary_size: usize,
}

impl SentimentPipeline {
    /// Writes `training.jsonl` and `vocabulary.json` into `out_dir` and
    /// returns the fitted vocabulary with a summary.
    pub fn prepare_training(&self, out_dir: &Path) -> Result<(Vocabulary, TrainingSummary)> {
        self.init_runtime();
        fs::create_dir_all(out_dir)?;

        let labels = LabeledSet::load(&self.opts.labels)?;
        if labels.is_empty() {
            tracing::warn!(path = %self.opts.labels.display(), "no usable labels; training set will be empty");
        }

        let work_dir = self.ensure_work_dir()?;
        let parts_dir = work_dir.join("training_parts");
        if parts_dir.exists() {
            fs::remove_dir_all(&parts_dir)?;
        }

        let (parts, counts) = self.spool_comments("training", &parts_dir, |rec, w| {
            let Some(id) = rec.id.as_deref() else { return Ok(0) };
            let joined = labels.labels_for(id);
            if joined.is_empty() {
                return Ok(0);
            }
            let body = rec.body.as_deref().map(sanitize).unwrap_or_default();
            for label in joined {
                let row = StagedRow { id: id.to_string(), body: body.clone(), djt: label.value() };
                serde_json::to_writer(&mut *w, &row)?;
                w.write_all(b"\n")?;
            }
            Ok(joined.len() as u64)
        })?;
        tracing::info!(seen = counts.seen, malformed = counts.malformed, joined = counts.written, "training rows staged");

        let counts_df = self.aggregate_jsonls_parallel(
            &parts,
            &work_dir.join("vocab_shards"),
            DocFrequency::default,
            &work_dir.join("doc_frequency.json"),
        )?;
        let vocab = Vocabulary::from_counts(&counts_df, self.opts.min_df, self.opts.vocab_size);
        tracing::info!(documents = counts_df.documents, candidates = counts_df.terms.len(), kept = vocab.len(), "vocabulary fitted");

        let rows = self.write_training_rows(&parts, &vocab, &out_dir.join(TRAINING_FILE))?;
        vocab.save(&out_dir.join(VOCABULARY_FILE))?;

        let summary = TrainingSummary {
            comments_seen: counts.seen,
            malformed: counts.malformed,
            rows,
            vocabulary_size: vocab.len(),
        };
        Ok((vocab, summary))
    }

    fn write_training_rows(&self, parts: &[PathBuf], vocab: &Vocabulary, out_path: &Path) -> Result<u64> {
        let tmp = out_path.with_extension("inprogress");
        let f = create_with_backoff(&tmp, 16, 50).with_context(|| format!("create {}", tmp.display()))?;
        let mut w = BufWriter::with_capacity(self.opts.write_buffer_bytes, f);
        let mut rows = 0u64;

        for part in parts {
            for_each_line_cfg(part, self.opts.read_buffer_bytes, |line| {
                let staged: StagedRow = serde_json::from_str(line)
                    .with_context(|| format!("decode staged row in {}", part.display()))?;
                let features = vocab.transform(&staged.body);
                let (positive, negative) = Label::new(staged.djt)
                    .map(|l| (l.positive(), l.negative()))
                    .unwrap_or((0, 0));
                let row = TrainingRow { id: staged.id, body: staged.body, djt: staged.djt, positive, negative, features };
                serde_json::to_writer(&mut w, &row)?;
                w.write_all(b"\n")?;
                rows += 1;
                Ok(())
            })?;
        }
        w.flush()?;
        drop(w);
        replace_file_atomic_backoff(&tmp, out_path)?;
        Ok(rows)
    }
}
