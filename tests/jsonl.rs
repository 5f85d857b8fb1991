#[path = "common/mod.rs"]
mod common;
use common::*;

use redsent::{expand_inputs, for_each_line_cfg, for_each_line_with_progress_cfg, Compression, LineStats};
use std::fs;
use std::path::Path;

fn collect(path: &Path) -> (Vec<String>, LineStats) {
    let mut lines = Vec::new();
    let stats = for_each_line_cfg(path, 64 * 1024, |l| {
        lines.push(l.to_string());
        Ok(())
    })
    .unwrap();
    (lines, stats)
}

#[test]
fn compression_follows_extension() {
    assert_eq!(Compression::from_path(Path::new("RC_2018-01.zst")), Compression::Zstd);
    assert_eq!(Compression::from_path(Path::new("a.json.ZSTD")), Compression::Zstd);
    assert_eq!(Compression::from_path(Path::new("comments-minimal.json.bz2")), Compression::Bzip2);
    assert_eq!(Compression::from_path(Path::new("part-0.jsonl.gz")), Compression::Gzip);
    assert_eq!(Compression::from_path(Path::new("submissions.json")), Compression::Plain);
    assert_eq!(Compression::from_path(Path::new("no_extension")), Compression::Plain);
}

/// Every container format yields the same lines.
#[test]
fn gz_bz2_zst_and_plain_stream_the_same_lines() {
    let dir = tempfile::tempdir().unwrap();
    let lines = comment_lines();

    let gz = dir.path().join("c.json.gz");
    let bz = dir.path().join("c.json.bz2");
    let zst = dir.path().join("c.json.zst");
    let plain = dir.path().join("c.json");
    write_gz_lines(&gz, &lines);
    write_bz2_lines(&bz, &lines);
    write_zst_lines(&zst, &lines);
    write_plain_lines(&plain, &lines);

    for p in [&gz, &bz, &zst, &plain] {
        let (got, stats) = collect(p);
        assert_eq!(got, lines, "{}", p.display());
        assert_eq!(stats, LineStats { lines: 7, invalid_utf8: 0 });
    }
}

#[test]
fn crlf_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("crlf.json");
    fs::write(&p, "{\"a\":1}\r\n\r\n   \n{\"a\":2}").unwrap();
    let (got, stats) = collect(&p);
    assert_eq!(got, ["{\"a\":1}", "{\"a\":2}"]);
    assert_eq!(stats.lines, 2);
}

/// A file that is not zstd at all is skipped and reported as fully consumed.
#[test]
fn corrupt_zst_is_skipped_with_full_progress() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("broken.json.zst");
    fs::write(&p, b"this is definitely not a zstd frame\n").unwrap();

    let mut seen = 0u64;
    let mut progress = 0u64;
    let stats = for_each_line_with_progress_cfg(&p, 8 * 1024, |d| progress += d, |_| {
        seen += 1;
        Ok(())
    })
    .unwrap();

    assert_eq!(seen, 0);
    assert_eq!(stats, LineStats::default());
    assert_eq!(progress, fs::metadata(&p).unwrap().len());
}

/// A truncated frame keeps whatever decoded before the cut.
#[test]
fn truncated_zst_keeps_leading_lines() {
    let dir = tempfile::tempdir().unwrap();
    let full = dir.path().join("full.json.zst");
    let lines: Vec<String> = (0..5000)
        .map(|i| serde_json::json!({"id": format!("c{i}"), "body": "x".repeat(64 + i % 97)}).to_string())
        .collect();
    write_zst_lines(&full, &lines);

    let bytes = fs::read(&full).unwrap();
    let cut = dir.path().join("cut.json.zst");
    fs::write(&cut, &bytes[..bytes.len() / 2]).unwrap();

    let (got, stats) = collect(&cut);
    assert!(got.len() < lines.len());
    assert_eq!(got[..], lines[..got.len()]);
    assert_eq!(stats.lines as usize, got.len());
}

/// Errors from the line callback are not treated as decode errors.
#[test]
fn callback_errors_propagate() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("c.json.gz");
    write_gz_lines(&p, &comment_lines());

    let err = for_each_line_cfg(&p, 8 * 1024, |_| anyhow::bail!("stop here")).unwrap_err();
    assert_eq!(err.to_string(), "stop here");
}

#[test]
fn directory_inputs_skip_markers() {
    let base = make_corpus_sharded();
    let files = expand_inputs(&base.join("comments"));
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["part-00000.json.zst", "part-00001.json"]);
    assert_eq!(expand_inputs(&base.join("submissions.json")), vec![base.join("submissions.json")]);
}
