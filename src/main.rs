use anyhow::Result;
use indicatif::MultiProgress;
use redsent::{expand_inputs, init_tracing_once, set_global_multiprogress, SentimentPipeline, SCORING_FILE};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

const DATA_ROOT: &str = "./data";
const WORK_ROOT: &str = "./etl_work";
const OUT_ROOT: &str = "./out";
const PREDICTIONS: &str = "predictions.jsonl";

fn main() -> Result<()> {
    init_tracing_once();
    set_global_multiprogress(Arc::new(MultiProgress::new()));
    let out_dir = PathBuf::from(OUT_ROOT);
    fs::create_dir_all(&out_dir)?;

    let hw = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(8);

    let pipeline = SentimentPipeline::new()
        .data_dir(DATA_ROOT)
        .work_dir(WORK_ROOT)
        .parallelism(hw)
        .file_concurrency(4)
        .progress(true);

    let (vocab, training) = pipeline.prepare_training(&out_dir)?;
    println!(
        "Training set: {} rows from {} comments, {} features",
        training.rows, training.comments_seen, training.vocabulary_size
    );

    let scoring = pipeline.prepare_scoring(&vocab, &out_dir.join(SCORING_FILE))?;
    println!(
        "Scoring set: {} rows ({} filtered as quote/sarcasm, {} without a submission)",
        scoring.rows, scoring.filtered, scoring.unmatched
    );

    // Predictions come from the externally trained classifiers.
    let predictions = out_dir.join(PREDICTIONS);
    if predictions.exists() {
        let report = pipeline.aggregate_predictions(&expand_inputs(&predictions), &out_dir.join("summary"))?;
        println!("Aggregated {} predictions into {} titles", report.rows, report.by_title.rows.len());
    } else {
        tracing::warn!(path = %predictions.display(), "no predictions yet; skipping aggregation");
    }

    Ok(())
}
