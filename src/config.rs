use crate::vocab::MinDf;
use std::path::{Path, PathBuf};

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    pub comments: PathBuf,            // file or directory of comment JSONL
    pub submissions: PathBuf,         // file or directory of submission JSONL
    pub labels: PathBuf,              // headerless CSV: _c0 id, _c3 label
    pub work_dir: Option<PathBuf>,    // if None, `.redsent_work` next to the comments input
    pub parallelism: Option<usize>,   // Some(N) to set rayon threads, None to use default
    pub file_concurrency: usize,      // limit number of input files decoded concurrently
    pub progress: bool,               // show progress bars
    pub progress_label: Option<String>,

    // IO tuning
    pub read_buffer_bytes: usize,
    pub write_buffer_bytes: usize,

    // features
    pub min_df: MinDf,
    pub vocab_size: Option<usize>,

    // classifier cutoffs: a probability strictly above the cutoff counts as 1
    pub positive_threshold: f64,
    pub negative_threshold: f64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        let base = PathBuf::from("./data");
        Self {
            comments: base.join("comments-minimal.json.bz2"),
            submissions: base.join("submissions.json.bz2"),
            labels: base.join("labeled_data.csv"),
            work_dir: None,
            parallelism: None,
            file_concurrency: 1,
            progress: true,
            progress_label: None,

            read_buffer_bytes: 256 * 1024,
            write_buffer_bytes: 256 * 1024,

            min_df: MinDf::default(),
            vocab_size: None,

            positive_threshold: 0.2,
            negative_threshold: 0.25,
        }
    }
}

impl PipelineOptions {
    /// Point all three inputs at their conventional names under `dir`.
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let base = dir.as_ref();
        self.comments = base.join("comments-minimal.json.bz2");
        self.submissions = base.join("submissions.json.bz2");
        self.labels = base.join("labeled_data.csv");
        self
    }
    pub fn with_comments(mut self, path: impl AsRef<Path>) -> Self {
        self.comments = path.as_ref().to_path_buf();
        self
    }
    pub fn with_submissions(mut self, path: impl AsRef<Path>) -> Self {
        self.submissions = path.as_ref().to_path_buf();
        self
    }
    pub fn with_labels(mut self, path: impl AsRef<Path>) -> Self {
        self.labels = path.as_ref().to_path_buf();
        self
    }
    pub fn with_work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.work_dir = Some(dir.as_ref().to_path_buf());
        self
    }
    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }
    pub fn with_file_concurrency(mut self, n: usize) -> Self {
        self.file_concurrency = n.max(1);
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }
    pub fn with_io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self {
        self.read_buffer_bytes = read_bytes.max(8 * 1024);
        self.write_buffer_bytes = write_bytes.max(8 * 1024);
        self
    }
    pub fn with_min_df(mut self, min_df: MinDf) -> Self {
        self.min_df = min_df;
        self
    }
    pub fn with_vocab_size(mut self, n: usize) -> Self {
        self.vocab_size = Some(n.max(1));
        self
    }
    pub fn with_thresholds(mut self, positive: f64, negative: f64) -> Self {
        self.positive_threshold = positive;
        self.negative_threshold = negative;
        self
    }
}
