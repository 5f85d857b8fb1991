use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
    });
}

// -------- robust file ops with backoff --------

/// Return true for transient/retriable I/O errors: sharing and lock
/// violations or AV/backup filter drivers on Windows, plus EINTR/EAGAIN.
fn is_retriable_io_error(e: &io::Error) -> bool {
    if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) {
        return true;
    }
    // 5 access denied, 32 sharing violation, 33 lock violation,
    // 21 device not ready, 1224 user-mapped section open.
    matches!(e.raw_os_error(), Some(5) | Some(21) | Some(32) | Some(33) | Some(1224))
}

/// Run `op` up to `tries` times, sleeping `delay_ms * attempt` between
/// retriable failures.
fn retry_io<T>(tries: usize, delay_ms: u64, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let tries = tries.max(1);
    let mut attempt = 1usize;
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < tries && is_retriable_io_error(&e) => {
                sleep(Duration::from_millis(delay_ms.saturating_mul(attempt as u64)));
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

pub fn open_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    retry_io(tries, delay_ms, || File::open(path))
}

pub fn create_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    retry_io(tries, delay_ms, || File::create(path))
}

/// Remove a file; succeeds if it does not exist.
pub fn remove_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> Result<()> {
    retry_io(tries, delay_ms, || match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    })
    .with_context(|| format!("remove {}", path.display()))
}

/// Atomically replace `dest` with `tmp`.
/// If rename fails (e.g. across devices or due to sharing), fall back to copy+remove.
pub fn replace_file_atomic_backoff(tmp: &Path, dest: &Path) -> Result<()> {
    let (tries, delay_ms) = (20usize, 50u64);
    if dest.exists() {
        remove_with_backoff(dest, tries, delay_ms)?;
    }
    if retry_io(tries, delay_ms, || fs::rename(tmp, dest)).is_ok() {
        return Ok(());
    }
    retry_io(tries, delay_ms, || fs::copy(tmp, dest))
        .with_context(|| format!("copy {} -> {}", tmp.display(), dest.display()))?;
    remove_with_backoff(tmp, tries, delay_ms)
}
