#![allow(dead_code)]

use serde_json::json;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Write a compressed `.zst` file containing the provided JSONL lines.
pub fn write_zst_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    for l in lines {
        writeln!(&mut enc, "{}", l).unwrap();
    }
    enc.finish().unwrap();
}

/// Write a `.bz2` file, like the course's `comments-minimal.json.bz2`.
pub fn write_bz2_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = bzip2::write::BzEncoder::new(f, bzip2::Compression::default());
    for l in lines {
        writeln!(&mut enc, "{}", l).unwrap();
    }
    enc.finish().unwrap();
}

/// Write a `.gz` file containing the provided JSONL lines.
pub fn write_gz_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = flate2::write::GzEncoder::new(f, flate2::Compression::default());
    for l in lines {
        writeln!(&mut enc, "{}", l).unwrap();
    }
    enc.finish().unwrap();
}

pub fn write_plain_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut f = File::create(path).unwrap();
    for l in lines {
        writeln!(&mut f, "{}", l).unwrap();
    }
}

/// Read a JSONL file into a vector of `serde_json::Value` (skips empty lines).
pub fn read_jsonl_values(path: &Path) -> Vec<serde_json::Value> {
    read_lines(path)
        .into_iter()
        .map(|s| serde_json::from_str(&s).unwrap())
        .collect()
}

/// Read a text file line-by-line into strings (skips empty lines).
pub fn read_lines(path: &Path) -> Vec<String> {
    let f = File::open(path).unwrap();
    let r = BufReader::new(f);
    r.lines().map(|l| l.unwrap()).filter(|s| !s.is_empty()).collect()
}

pub const SUBMISSION_S1_TITLE: &str = "Trump tweets again";
pub const SUBMISSION_S2_TITLE: &str = "Senate vote tonight";

/// Jan 1st 2018, 00:00 UTC.
pub const TS_JAN_01: i64 = 1_514_764_800;
/// Jan 2nd 2018, 00:00 UTC.
pub const TS_JAN_02: i64 = 1_514_851_200;

pub fn submission_lines() -> Vec<String> {
    vec![
        json!({"id":"s1", "title":SUBMISSION_S1_TITLE, "score":100, "subreddit":"politics"}).to_string(),
        json!({"id":"s2", "title":SUBMISSION_S2_TITLE, "score":"7", "subreddit":"politics"}).to_string(),
    ]
}

/// Seven comments:
///   c1 California, positive, on s1
///   c2 Texas, negative, on s1
///   c3 quote reply (`&gt;`) on s2            -> filtered for scoring
///   c4 sarcasm (`/s`) on s2                   -> filtered for scoring
///   c5 Ontario flair, URL in body, on s2      -> state ""
///   c6 link to an unknown submission          -> unmatched
///   c7 null body on s1                        -> filtered for scoring
pub fn comment_lines() -> Vec<String> {
    vec![
        json!({"id":"c1", "body":"I love this president! Great job.", "author_flair_text":"California",
               "score":5, "created_utc":TS_JAN_01, "link_id":"t3_s1"}).to_string(),
        json!({"id":"c2", "body":"Terrible, awful decision.", "author_flair_text":"Texas",
               "score":-2, "created_utc":TS_JAN_02.to_string(), "link_id":"t3_s1"}).to_string(),
        json!({"id":"c3", "body":"&gt; he said it\n\nI disagree", "author_flair_text":null,
               "score":1, "created_utc":TS_JAN_01, "link_id":"t3_s2"}).to_string(),
        json!({"id":"c4", "body":"Sure, he's a genius /s", "author_flair_text":"Ohio",
               "score":9, "created_utc":TS_JAN_01, "link_id":"t3_s2"}).to_string(),
        json!({"id":"c5", "body":"Visit http://example.com now, great job", "author_flair_text":"Ontario",
               "score":3, "created_utc":TS_JAN_02, "link_id":"t3_s2"}).to_string(),
        json!({"id":"c6", "body":"orphan comment", "author_flair_text":"Texas",
               "score":0, "created_utc":TS_JAN_02, "link_id":"t3_gone"}).to_string(),
        json!({"id":"c7", "body":null, "author_flair_text":"Texas",
               "score":0, "created_utc":TS_JAN_02, "link_id":"t3_s1"}).to_string(),
    ]
}

/// Headerless label CSV (`_c0` id ... `_c3` label). Includes a header-like row
/// and a row with an unparseable label, both skipped, and an id with no comment.
pub fn label_csv() -> String {
    [
        "Input.id,Input.body,Answer.extra,labeldjt",
        "c1,ignored,x,1",
        "c2,\"quoted, with comma\",x,-1",
        "c5,ignored,x,0",
        "c6,ignored,x,maybe",
        "c9,ignored,x,1",
    ]
    .join("\n")
        + "\n"
}

/// Layout matching the course data:
///   data/comments-minimal.json.bz2, data/submissions.json.bz2, data/labeled_data.csv
pub fn make_corpus_bz2() -> PathBuf {
    let base = tempfile::tempdir().unwrap().into_path();
    let data = base.join("data");
    write_bz2_lines(&data.join("comments-minimal.json.bz2"), &comment_lines());
    write_bz2_lines(&data.join("submissions.json.bz2"), &submission_lines());
    fs::write(data.join("labeled_data.csv"), label_csv()).unwrap();
    base
}

/// Same records, but comments split across a directory of shards
/// (`part-00000.json.zst` with c1..c4, plain `part-00001.json` with c5..c7,
/// plus a `_SUCCESS` marker that must be ignored) and plain submissions.
pub fn make_corpus_sharded() -> PathBuf {
    let base = tempfile::tempdir().unwrap().into_path();
    let comments = comment_lines();
    let dir = base.join("comments");
    write_zst_lines(&dir.join("part-00000.json.zst"), &comments[..4]);
    write_plain_lines(&dir.join("part-00001.json"), &comments[4..]);
    fs::write(dir.join("_SUCCESS"), b"").unwrap();
    write_plain_lines(&base.join("submissions.json"), &submission_lines());
    fs::write(base.join("labeled_data.csv"), label_csv()).unwrap();
    base
}

/// Parse a CSV written by the report into (header, rows).
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut rdr = csv::Reader::from_path(path).unwrap();
    let header = rdr.headers().unwrap().iter().map(String::from).collect();
    let rows = rdr
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (header, rows)
}
