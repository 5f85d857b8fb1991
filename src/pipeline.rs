use crate::config::PipelineOptions;
use crate::jsonl::{for_each_line_cfg, for_each_line_with_progress_cfg, plan_jobs, total_input_size, InputJob};
use crate::progress::make_progress_bar_labeled;
use crate::records::{parse_comment, CommentRecord};
use crate::stitch::part_name_for_job;
use crate::util::{create_with_backoff, init_tracing_once};
use crate::vocab::MinDf;
use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone, Default)]
pub struct SentimentPipeline {
    pub(crate) opts: PipelineOptions,
}

/// Counters from one pass over the comment inputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpoolCounts {
    /// Lines that parsed as comments.
    pub seen: u64,
    /// Lines that did not parse and were skipped.
    pub malformed: u64,
    /// Rows written to the parts.
    pub written: u64,
}

impl SentimentPipeline {
    pub fn new() -> Self {
        Self { opts: PipelineOptions::default() }
    }

    pub fn with_options(opts: PipelineOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn data_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_data_dir(dir); self }
    pub fn comments(mut self, path: impl AsRef<Path>) -> Self { self.opts = self.opts.with_comments(path); self }
    pub fn submissions(mut self, path: impl AsRef<Path>) -> Self { self.opts = self.opts.with_submissions(path); self }
    pub fn labels(mut self, path: impl AsRef<Path>) -> Self { self.opts = self.opts.with_labels(path); self }
    pub fn work_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_work_dir(dir); self }
    pub fn parallelism(mut self, threads: usize) -> Self { self.opts = self.opts.with_parallelism(threads); self }
    pub fn file_concurrency(mut self, n: usize) -> Self { self.opts = self.opts.with_file_concurrency(n); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_label(mut self, label: impl Into<String>) -> Self { self.opts = self.opts.with_progress_label(label); self }
    pub fn io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self { self.opts = self.opts.with_io_buffers(read_bytes, write_bytes); self }
    pub fn min_df(mut self, min_df: MinDf) -> Self { self.opts = self.opts.with_min_df(min_df); self }
    pub fn vocab_size(mut self, n: usize) -> Self { self.opts = self.opts.with_vocab_size(n); self }
    pub fn thresholds(mut self, positive: f64, negative: f64) -> Self { self.opts = self.opts.with_thresholds(positive, negative); self }

    pub(crate) fn init_runtime(&self) {
        init_tracing_once();
        if let Some(n) = self.opts.parallelism {
            if n > 0 { rayon::ThreadPoolBuilder::new().num_threads(n).build_global().ok(); }
        }
    }

    pub(crate) fn ensure_work_dir(&self) -> Result<PathBuf> {
        let dir = self.opts.work_dir.clone().unwrap_or_else(|| {
            self.opts
                .comments
                .parent()
                .map(|p| p.join(".redsent_work"))
                .unwrap_or_else(|| PathBuf::from(".redsent_work"))
        });
        fs::create_dir_all(&dir).with_context(|| format!("create work dir {}", dir.display()))?;
        Ok(dir)
    }

    /// Plan the jobs for an input, failing early if it does not exist.
    pub(crate) fn plan_input(&self, what: &str, path: &Path) -> Result<Vec<InputJob>> {
        if !path.exists() {
            bail!("{} input not found: {}", what, path.display());
        }
        let jobs = plan_jobs(path);
        if jobs.is_empty() {
            tracing::warn!(input = %path.display(), "{} input has no files", what);
        } else {
            tracing::info!("Planned {} {} file(s).", jobs.len(), what);
        }
        Ok(jobs)
    }

    /// Stream every comment input once, calling `handle` for each parsed
    /// record with the part writer of its input file. `handle` returns the
    /// number of rows it wrote. Parts land in `parts_dir` named by input
    /// order, so sorting them restores input order.
    pub(crate) fn spool_comments<F>(&self, stage: &str, parts_dir: &Path, handle: F) -> Result<(Vec<PathBuf>, SpoolCounts)>
    where
        F: Sync + Fn(&CommentRecord, &mut dyn Write) -> Result<u64>,
    {
        let jobs = self.plan_input("comments", &self.opts.comments)?;
        fs::create_dir_all(parts_dir)?;

        let read_buf = self.opts.read_buffer_bytes;
        let write_buf = self.opts.write_buffer_bytes;
        let pb = if self.opts.progress {
            let label = self.opts.progress_label.clone().unwrap_or_else(|| stage.to_string());
            Some(make_progress_bar_labeled(total_input_size(&jobs), Some(&label)))
        } else {
            None
        };

        let seen = AtomicU64::new(0);
        let malformed = AtomicU64::new(0);
        let written = AtomicU64::new(0);
        let parts = Mutex::new(Vec::<PathBuf>::new());

        crate::concurrency::for_each_file_limited(&jobs, self.opts.file_concurrency, |job| -> Result<()> {
            let out_path = parts_dir.join(part_name_for_job(stage, job));
            let file = create_with_backoff(&out_path, 16, 50)
                .with_context(|| format!("create part {}", out_path.display()))?;
            let mut writer = BufWriter::with_capacity(write_buf, file);

            let mut on_line = |line: &str| -> Result<()> {
                match parse_comment(line) {
                    Ok(rec) => {
                        seen.fetch_add(1, Ordering::Relaxed);
                        let n = handle(&rec, &mut writer)?;
                        written.fetch_add(n, Ordering::Relaxed);
                    }
                    Err(e) => {
                        malformed.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(path = %job.path.display(), error = %e, "skipping malformed comment line");
                    }
                }
                Ok(())
            };

            let stats = match &pb {
                Some(pb) => for_each_line_with_progress_cfg(&job.path, read_buf, |delta| pb.inc(delta), &mut on_line)?,
                None => for_each_line_cfg(&job.path, read_buf, &mut on_line)?,
            };
            malformed.fetch_add(stats.invalid_utf8, Ordering::Relaxed);
            writer.flush()?;
            parts.lock().push(out_path);
            Ok(())
        })
        .with_context(|| format!("{} over {}", stage, self.opts.comments.display()))?;

        if let Some(pb) = pb { pb.finish_with_message(format!("{stage}: done")); }

        let mut list = parts.into_inner();
        list.sort();
        let counts = SpoolCounts {
            seen: seen.load(Ordering::Relaxed),
            malformed: malformed.load(Ordering::Relaxed),
            written: written.load(Ordering::Relaxed),
        };
        Ok((list, counts))
    }
}
