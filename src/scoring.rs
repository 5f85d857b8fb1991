//! Scoring-set preparation: attach submission title/score to every comment,
//! drop quotes and sarcasm, map flair to a state and vectorize the body.

use crate::cleantext::sanitize;
use crate::filters::keep_for_scoring;
use crate::jsonl::{for_each_line_with_progress_cfg, total_input_size};
use crate::pipeline::SentimentPipeline;
use crate::progress::make_progress_bar_labeled;
use crate::records::{cut_link_id, parse_submission};
use crate::states::state_from_flair;
use crate::stitch::stitch_parts;
use crate::vocab::Vocabulary;
use ahash::AHashMap;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

pub const SCORING_FILE: &str = "scoring.jsonl";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionMeta {
    pub title: Option<String>,
    pub score: Option<i64>,
}

/// Submission id -> metadata. Duplicate ids keep every entry, so a comment
/// joins once per matching submission record.
#[derive(Debug, Default)]
pub struct SubmissionIndex {
    by_id: AHashMap<String, Vec<SubmissionMeta>>,
}

impl SubmissionIndex {
    pub fn insert(&mut self, id: impl Into<String>, meta: SubmissionMeta) {
        self.by_id.entry(id.into()).or_default().push(meta);
    }

    pub fn get(&self, id: &str) -> &[SubmissionMeta] {
        self.by_id.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// One comment ready for the classifiers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringRow {
    pub timestamp: Option<i64>,
    pub title: Option<String>,
    pub state: String,
    pub id: Option<String>,
    pub body: Vec<String>,
    pub comment_score: Option<i64>,
    pub story_score: Option<i64>,
    pub features: Vec<u32>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScoringSummary {
    pub submissions: usize,
    pub comments_seen: u64,
    pub malformed: u64,
    /// Quotes, sarcasm and comments without a body.
    pub filtered: u64,
    /// Comments whose link id matched no submission.
    pub unmatched: u64,
    pub rows: u64,
}

impl SentimentPipeline {
    /// Load every submission input into memory.
    pub fn load_submissions(&self) -> Result<SubmissionIndex> {
        let jobs = self.plan_input("submissions", &self.opts.submissions)?;
        let pb = if self.opts.progress {
            Some(make_progress_bar_labeled(total_input_size(&jobs), Some("submissions")))
        } else {
            None
        };

        let mut index = SubmissionIndex::default();
        let mut malformed = 0u64;
        for job in &jobs {
            let stats = for_each_line_with_progress_cfg(
                &job.path,
                self.opts.read_buffer_bytes,
                |delta| { if let Some(pb) = &pb { pb.inc(delta); } },
                |line| {
                    match parse_submission(line) {
                        Ok(rec) => {
                            if let Some(id) = rec.id {
                                index.insert(id, SubmissionMeta { title: rec.title, score: rec.score });
                            }
                        }
                        Err(_) => malformed += 1,
                    }
                    Ok(())
                },
            )?;
            malformed += stats.invalid_utf8;
        }
        if let Some(pb) = pb { pb.finish_with_message("submissions: done"); }
        tracing::info!(submissions = index.len(), malformed, "submissions loaded");
        Ok(index)
    }

    /// Writes `out_path` (JSONL of [`ScoringRow`]) for every kept comment
    /// that joins a submission.
    pub fn prepare_scoring(&self, vocab: &Vocabulary, out_path: &Path) -> Result<ScoringSummary> {
        self.init_runtime();
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let submissions = self.load_submissions()?;
        let work_dir = self.ensure_work_dir()?;
        let parts_dir = work_dir.join("scoring_parts");
        if parts_dir.exists() {
            fs::remove_dir_all(&parts_dir)?;
        }

        let filtered = AtomicU64::new(0);
        let unmatched = AtomicU64::new(0);

        let (parts, counts) = self.spool_comments("scoring", &parts_dir, |rec, w| {
            if !keep_for_scoring(rec.body.as_deref()) {
                filtered.fetch_add(1, Ordering::Relaxed);
                return Ok(0);
            }
            let joined = rec
                .link_id
                .as_deref()
                .map(|l| submissions.get(cut_link_id(l)))
                .unwrap_or(&[]);
            if joined.is_empty() {
                unmatched.fetch_add(1, Ordering::Relaxed);
                return Ok(0);
            }

            let body = rec.body.as_deref().map(sanitize).unwrap_or_default();
            let features = vocab.transform(&body);
            let state = state_from_flair(rec.author_flair_text.as_deref());
            for sub in joined {
                let row = ScoringRow {
                    timestamp: rec.created_utc,
                    title: sub.title.clone(),
                    state: state.to_string(),
                    id: rec.id.clone(),
                    body: body.clone(),
                    comment_score: rec.score,
                    story_score: sub.score,
                    features: features.clone(),
                };
                serde_json::to_writer(&mut *w, &row)?;
                w.write_all(b"\n")?;
            }
            Ok(joined.len() as u64)
        })?;

        stitch_parts(&parts, out_path, self.opts.write_buffer_bytes)?;

        let summary = ScoringSummary {
            submissions: submissions.len(),
            comments_seen: counts.seen,
            malformed: counts.malformed,
            filtered: filtered.load(Ordering::Relaxed),
            unmatched: unmatched.load(Ordering::Relaxed),
            rows: counts.written,
        };
        tracing::info!(?summary, out = %out_path.display(), "scoring rows written");
        Ok(summary)
    }
}
