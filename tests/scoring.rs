#[path = "common/mod.rs"]
mod common;
use common::*;

use indicatif::{MultiProgress, ProgressDrawTarget};
use redsent::{set_global_multiprogress, ScoringRow, SentimentPipeline, Vocabulary, SCORING_FILE};
use std::fs;
use std::sync::Arc;

fn sharded_pipeline(base: &std::path::Path) -> SentimentPipeline {
    SentimentPipeline::new()
        .comments(base.join("comments"))
        .submissions(base.join("submissions.json"))
        .labels(base.join("labeled_data.csv"))
        .work_dir(base.join("work"))
        .file_concurrency(2)
        .progress(false)
}

fn small_vocab() -> Vocabulary {
    Vocabulary::from_terms(vec!["great".into(), "great_job".into(), "job".into()])
}

fn read_rows(path: &std::path::Path) -> Vec<ScoringRow> {
    read_jsonl_values(path)
        .into_iter()
        .map(|v| serde_json::from_value(v).unwrap())
        .collect()
}

/// Quotes, sarcasm and null bodies are filtered; the orphan finds no
/// submission; the remaining three keep input order across shards.
#[test]
fn scoring_rows_join_submissions_and_filter() {
    let base = make_corpus_sharded();
    let out = base.join("out").join(SCORING_FILE);

    let summary = sharded_pipeline(&base).prepare_scoring(&small_vocab(), &out).unwrap();
    assert_eq!(summary.submissions, 2);
    assert_eq!(summary.comments_seen, 7);
    assert_eq!(summary.malformed, 0);
    assert_eq!(summary.filtered, 3);
    assert_eq!(summary.unmatched, 1);
    assert_eq!(summary.rows, 3);

    let rows = read_rows(&out);
    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_deref().unwrap()).collect();
    assert_eq!(ids, ["c1", "c2", "c5"]);

    let c1 = &rows[0];
    assert_eq!(c1.title.as_deref(), Some(SUBMISSION_S1_TITLE));
    assert_eq!(c1.state, "California");
    assert_eq!(c1.timestamp, Some(TS_JAN_01));
    assert_eq!(c1.comment_score, Some(5));
    assert_eq!(c1.story_score, Some(100));
    assert_eq!(c1.features, vec![0, 1, 2]);

    let c2 = &rows[1];
    assert_eq!(c2.state, "Texas");
    assert_eq!(c2.timestamp, Some(TS_JAN_02), "string timestamps are accepted");
    assert_eq!(c2.comment_score, Some(-2));
    assert!(c2.features.is_empty());

    let c5 = &rows[2];
    assert_eq!(c5.title.as_deref(), Some(SUBMISSION_S2_TITLE));
    assert_eq!(c5.state, "", "non-state flair maps to empty");
    assert_eq!(c5.story_score, Some(7), "string submission score is accepted");
    assert_eq!(c5.body, ["visit", "now", "great", "job", "visit_now", "great_job"]);
    assert_eq!(c5.features, vec![0, 1, 2]);
}

#[test]
fn compressed_single_file_inputs() {
    let base = make_corpus_bz2();
    let data = base.join("data");
    let out = base.join("scoring.jsonl");

    let summary = SentimentPipeline::new()
        .data_dir(&data)
        .work_dir(base.join("work"))
        .progress(false)
        .prepare_scoring(&small_vocab(), &out)
        .unwrap();
    assert_eq!(summary.rows, 3);
    assert_eq!(read_rows(&out).len(), 3);
}

/// A duplicated submission id joins every matching record.
#[test]
fn duplicate_submissions_fan_out() {
    let base = make_corpus_sharded();
    let mut subs = submission_lines();
    subs.push(serde_json::json!({"id":"s1", "title":"Repost", "score":1}).to_string());
    write_plain_lines(&base.join("submissions.json"), &subs);

    let out = base.join("scoring.jsonl");
    let summary = sharded_pipeline(&base).prepare_scoring(&small_vocab(), &out).unwrap();
    assert_eq!(summary.rows, 5);

    let titles: Vec<String> = read_rows(&out).into_iter().filter_map(|r| r.title).collect();
    assert_eq!(titles.iter().filter(|t| *t == "Repost").count(), 2);
}

/// Unparseable lines are counted and skipped, not fatal.
#[test]
fn malformed_comment_lines_are_skipped() {
    let base = make_corpus_sharded();
    let mut lines = comment_lines()[4..].to_vec();
    lines.insert(1, "{not json".to_string());
    write_plain_lines(&base.join("comments").join("part-00001.json"), &lines);

    let summary = sharded_pipeline(&base)
        .prepare_scoring(&small_vocab(), &base.join("scoring.jsonl"))
        .unwrap();
    assert_eq!(summary.malformed, 1);
    assert_eq!(summary.comments_seen, 7);
    assert_eq!(summary.rows, 3);
}

#[test]
fn missing_submissions_is_an_error() {
    let base = make_corpus_sharded();
    let err = sharded_pipeline(&base)
        .submissions(base.join("gone.json"))
        .prepare_scoring(&small_vocab(), &base.join("scoring.jsonl"))
        .unwrap_err();
    assert!(format!("{err:#}").contains("submissions input not found"));
}

/// A line with a byte that is not UTF-8 is counted as malformed; the lines
/// after it in the same input are still read.
#[test]
fn invalid_utf8_line_skips_only_that_line() {
    let base = make_corpus_sharded();
    let tail = comment_lines()[4..].to_vec();
    let mut bytes = Vec::new();
    bytes.extend_from_slice(tail[0].as_bytes());
    bytes.extend_from_slice(b"\n{\"id\":\"cx\",\"body\":\"bad \xff byte\",\"link_id\":\"t3_s1\"}\n");
    for l in &tail[1..] {
        bytes.extend_from_slice(l.as_bytes());
        bytes.push(b'\n');
    }
    fs::write(base.join("comments").join("part-00001.json"), bytes).unwrap();

    let out = base.join("scoring.jsonl");
    let summary = sharded_pipeline(&base).prepare_scoring(&small_vocab(), &out).unwrap();
    assert_eq!(summary.malformed, 1);
    assert_eq!(summary.comments_seen, 7);
    assert_eq!(summary.unmatched, 1, "c6 after the bad line is still read");
    assert_eq!(summary.rows, 3);

    let ids: Vec<String> = read_rows(&out).into_iter().filter_map(|r| r.id).collect();
    assert_eq!(ids, ["c1", "c2", "c5"]);
}

/// Progress bars attach to an installed global `MultiProgress`.
#[test]
fn progress_under_global_multiprogress() {
    set_global_multiprogress(Arc::new(MultiProgress::with_draw_target(ProgressDrawTarget::hidden())));
    let base = make_corpus_sharded();
    let summary = sharded_pipeline(&base)
        .progress(true)
        .progress_label("scoring test")
        .prepare_scoring(&small_vocab(), &base.join("scoring.jsonl"))
        .unwrap();
    assert_eq!(summary.rows, 3);
}
