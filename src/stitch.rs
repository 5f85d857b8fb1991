//! Output stitching: concatenate per-input JSONL parts into one file in
//! input order, writing to a temp file that is promoted atomically.

use crate::jsonl::InputJob;
use crate::util::{create_with_backoff, open_with_backoff, replace_file_atomic_backoff};
use anyhow::{Context, Result};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub fn part_name_for_job(stage: &str, job: &InputJob) -> String {
    format!("{stage}_{:05}.jsonl.part", job.index)
}

/// Concatenate `parts` (sorted by name) into `out_path`.
pub fn stitch_parts(parts: &[PathBuf], out_path: &Path, write_buf: usize) -> Result<()> {
    let mut paths = parts.to_vec();
    paths.sort();

    let tmp = out_path.with_extension("inprogress");
    let f = create_with_backoff(&tmp, 16, 50).with_context(|| format!("create {}", tmp.display()))?;
    let mut out = BufWriter::with_capacity(write_buf, f);
    for p in &paths {
        let f = open_with_backoff(p, 16, 50).with_context(|| format!("open part {}", p.display()))?;
        let mut r = BufReader::new(f);
        std::io::copy(&mut r, &mut out)?;
    }
    out.flush()?;
    drop(out);
    replace_file_atomic_backoff(&tmp, out_path)
}
