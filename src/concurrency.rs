//! Per-input fan-out with a cap on how many files are decoded at once.

use crate::jsonl::InputJob;
use anyhow::{Context, Result};
use rayon::prelude::*;

/// Run `f` over every input job. With `limit <= 1` (or a single job) the
/// jobs run in input order on the calling thread; otherwise a dedicated
/// pool of `limit` workers pulls jobs as they free up. The first error
/// wins and names the input it came from.
pub fn for_each_file_limited<F>(jobs: &[InputJob], limit: usize, f: F) -> Result<()>
where
    F: Sync + Fn(&InputJob) -> Result<()>,
{
    let run = |job: &InputJob| f(job).with_context(|| format!("input #{} {}", job.index, job.path.display()));

    if limit <= 1 || jobs.len() <= 1 {
        return jobs.iter().try_for_each(run);
    }

    let workers = limit.min(jobs.len());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("redsent-input-{i}"))
        .build()
        .context("build input worker pool")?;
    pool.install(|| jobs.par_iter().with_max_len(1).try_for_each(run))
}
