use anyhow::Result;
use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use walkdir::WalkDir;
use zstd::stream::read::Decoder;

use crate::util::open_with_backoff;

/// Container format of one input file, picked from its extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    Zstd,
    Bzip2,
    Gzip,
    Plain,
}

impl Compression {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("zst") | Some("zstd") => Compression::Zstd,
            Some("bz2") => Compression::Bzip2,
            Some("gz") => Compression::Gzip,
            _ => Compression::Plain,
        }
    }
}

/// An input file, tagged with its position so parts can be stitched in order.
#[derive(Clone, Debug)]
pub struct InputJob {
    pub index: usize,
    pub path: PathBuf,
}

/// Expand a file-or-directory input into concrete files.
/// Directories contribute their direct children, sorted; names starting
/// with `_` or `.` (e.g. `_SUCCESS`, `.crc`) are skipped.
pub fn expand_inputs(path: &Path) -> Vec<PathBuf> {
    if !path.is_dir() {
        return vec![path.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|n| !n.starts_with('_') && !n.starts_with('.'))
                .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

pub fn plan_jobs(path: &Path) -> Vec<InputJob> {
    expand_inputs(path)
        .into_iter()
        .enumerate()
        .map(|(index, path)| InputJob { index, path })
        .collect()
}

pub fn total_input_size(jobs: &[InputJob]) -> u64 {
    jobs.iter()
        .map(|j| fs::metadata(&j.path).map(|m| m.len()).unwrap_or(0))
        .sum()
}

#[inline]
fn warn_decode_skip(path: &Path, e: &anyhow::Error) {
    let abs = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let msg = format!(
        "Skipping input after decode error\n  path : {}\n  error: {}\n\
         note : The file is truncated, corrupt, or its extension does not match \
                its compression. Rows read before the error were kept.",
        abs.display(),
        e
    );
    eprintln!("{}", msg);
    tracing::warn!("{}", msg);
}

/// A `Read` wrapper that counts raw (on-disk) bytes read.
struct CountingReader<R: Read> {
    inner: R,
    counter: Arc<AtomicU64>,
}
impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.counter.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

fn open_decoded(path: &Path, counter: Arc<AtomicU64>) -> Result<Box<dyn Read>> {
    let file = open_with_backoff(path, 16, 50)?;
    let raw = CountingReader { inner: file, counter };
    Ok(match Compression::from_path(path) {
        Compression::Zstd => {
            let mut decoder = Decoder::new(raw)?;
            decoder.window_log_max(31)?;
            Box::new(decoder)
        }
        Compression::Bzip2 => Box::new(MultiBzDecoder::new(raw)),
        Compression::Gzip => Box::new(MultiGzDecoder::new(raw)),
        Compression::Plain => Box::new(raw),
    })
}

/// Per-file line counters returned by the streaming helpers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineStats {
    /// Non-blank lines handed to the callback.
    pub lines: u64,
    /// Lines skipped because they were not valid UTF-8.
    pub invalid_utf8: u64,
}

/// Stream a (possibly compressed) JSONL file line-by-line.
/// Lines that are not valid UTF-8 are skipped and counted. On a decode
/// error the rest of the file is skipped with a warning; the run continues.
pub fn for_each_line_cfg(
    path: &Path,
    read_buf_bytes: usize,
    mut on_line: impl FnMut(&str) -> Result<()>,
) -> Result<LineStats> {
    for_each_line_with_progress_cfg(path, read_buf_bytes, |_| {}, &mut on_line)
}

/// Same as `for_each_line_cfg` but reports on-disk bytes consumed through
/// `on_progress`. A skipped file advances progress by its full size.
pub fn for_each_line_with_progress_cfg(
    path: &Path,
    read_buf_bytes: usize,
    mut on_progress: impl FnMut(u64),
    mut on_line: impl FnMut(&str) -> Result<()>,
) -> Result<LineStats> {
    let mut reported = 0u64;
    let mut stats = LineStats::default();
    match for_each_line_attempt(path, read_buf_bytes, &mut on_progress, &mut on_line, &mut reported, &mut stats) {
        Ok(()) => Ok(stats),
        Err(e) => match e.downcast::<CallbackError>() {
            Ok(CallbackError(inner)) => Err(inner),
            Err(e) => {
                warn_decode_skip(path, &e);
                if let Ok(meta) = fs::metadata(path) {
                    on_progress(meta.len().saturating_sub(reported));
                }
                Ok(stats)
            }
        },
    }
}

/// Marker so errors raised by the caller's closure are not mistaken for
/// decode errors and swallowed.
#[derive(Debug)]
struct CallbackError(anyhow::Error);

impl std::fmt::Display for CallbackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for CallbackError {}

fn trim_line_end(mut line: &[u8]) -> &[u8] {
    if let Some(rest) = line.strip_suffix(b"\n") {
        line = rest;
        if let Some(rest) = line.strip_suffix(b"\r") {
            line = rest;
        }
    }
    line
}

fn for_each_line_attempt(
    path: &Path,
    read_buf_bytes: usize,
    on_progress: &mut impl FnMut(u64),
    on_line: &mut impl FnMut(&str) -> Result<()>,
    reported: &mut u64,
    stats: &mut LineStats,
) -> Result<()> {
    let counter = Arc::new(AtomicU64::new(0));
    let decoded = open_decoded(path, counter.clone())?;
    let mut reader = BufReader::with_capacity(read_buf_bytes.max(8 * 1024), decoded);

    let mut buf: Vec<u8> = Vec::with_capacity(16 * 1024);
    let mut line_no = 0u64;
    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        let cur = counter.load(Ordering::Relaxed);
        if cur > *reported {
            on_progress(cur - *reported);
            *reported = cur;
        }
        if n == 0 {
            break;
        }
        line_no += 1;
        let line = match std::str::from_utf8(trim_line_end(&buf)) {
            Ok(line) => line,
            Err(e) => {
                stats.invalid_utf8 += 1;
                tracing::debug!(path = %path.display(), line = line_no, error = %e, "skipping non-UTF-8 line");
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        stats.lines += 1;
        on_line(line).map_err(|e| anyhow::Error::new(CallbackError(e)))?;
    }
    Ok(())
}
