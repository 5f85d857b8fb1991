//! Generic parallel aggregation over JSONL inputs with progress.
//! Implement `Aggregator` for your state and call `aggregate_jsonls_parallel`.

use crate::jsonl::for_each_line_cfg;
use crate::pipeline::SentimentPipeline;
use crate::progress::make_count_progress;
use crate::util::{create_with_backoff, open_with_backoff};
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub trait Aggregator: Send + Serialize + DeserializeOwned {
    fn ingest(&mut self, record: &Value);
    fn merge(&mut self, other: Self);
}

fn shard_name_for_input(shards_dir: &Path, index: usize, input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("part");
    shards_dir.join(format!("agg_{:05}_{}.json", index, stem))
}

impl SentimentPipeline {
    /// Build one aggregation shard per input in parallel, then merge them in
    /// shard order into a fresh `make()` state and write it to `final_out`.
    /// Lines that are not valid JSON are ignored. Returns the merged state.
    pub fn aggregate_jsonls_parallel<A, F>(
        &self,
        inputs: &[PathBuf],
        shards_dir: &Path,
        make: F,
        final_out: &Path,
    ) -> Result<A>
    where
        A: Aggregator,
        F: Fn() -> A + Sync,
    {
        fs::create_dir_all(shards_dir)?;
        let read_buf = self.opts.read_buffer_bytes;

        let pb_build = if self.opts.progress { Some(make_count_progress(inputs.len() as u64, "Aggregate: build shards")) } else { None };

        let shards = inputs
            .par_iter()
            .enumerate()
            .map(|(i, input)| -> Result<PathBuf> {
                let out_shard = shard_name_for_input(shards_dir, i, input);
                let mut agg = make();
                for_each_line_cfg(input, read_buf, |line| {
                    match serde_json::from_str::<Value>(line) {
                        Ok(v) => agg.ingest(&v),
                        Err(e) => tracing::debug!(path = %input.display(), error = %e, "skipping malformed line"),
                    }
                    Ok(())
                })?;
                let out = create_with_backoff(&out_shard, 16, 50).with_context(|| format!("create {}", out_shard.display()))?;
                let mut w = BufWriter::new(out);
                serde_json::to_writer(&mut w, &agg)?;
                w.flush()?;
                if let Some(pb) = &pb_build { pb.inc(1); }
                Ok(out_shard)
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(pb) = pb_build { pb.finish_with_message("Aggregate: shard build done"); }

        let pb_merge = if self.opts.progress { Some(make_count_progress(shards.len() as u64, "Aggregate: merge shards")) } else { None };

        let mut total = make();
        for shard in &shards {
            let f = open_with_backoff(shard, 16, 50).with_context(|| format!("open {}", shard.display()))?;
            let part: A = serde_json::from_reader(BufReader::new(f))
                .with_context(|| format!("decode shard {}", shard.display()))?;
            total.merge(part);
            if let Some(pb) = &pb_merge { pb.inc(1); }
        }

        let out = create_with_backoff(final_out, 16, 50).with_context(|| format!("create {}", final_out.display()))?;
        let mut w = BufWriter::new(out);
        serde_json::to_writer(&mut w, &total)?;
        w.flush()?;

        if let Some(pb) = pb_merge { pb.finish_with_message("Aggregate: final written"); }
        Ok(total)
    }
}
