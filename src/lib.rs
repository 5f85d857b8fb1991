mod config;
mod date;
mod util;
mod progress;
mod concurrency;
mod stitch;
mod jsonl;
mod records;

mod cleantext;
mod labels;
mod states;
mod filters;
mod vocab;

mod pipeline;
mod aggregate;
mod training;
mod scoring;
mod report;

pub use crate::config::PipelineOptions;
pub use crate::pipeline::{SentimentPipeline, SpoolCounts};

// The sanitizer is usable on its own.
pub use crate::cleantext::{
    clean_tokens, is_ending_punctuation, remove_urls, sanitize, sanitize_parts, strip_edge_punctuation,
    EdgeStrip, Ngrams, ENDING_PUNCTUATION,
};

pub use crate::records::{cut_link_id, parse_comment, parse_submission, CommentRecord, SubmissionRecord};
pub use crate::labels::{Label, LabeledSet};
pub use crate::states::{state_from_flair, US_STATES};
pub use crate::filters::{is_quote, is_sarcasm, keep_for_scoring};
pub use crate::date::day_from_epoch;

pub use crate::aggregate::Aggregator;
pub use crate::vocab::{DocFrequency, MinDf, TermStats, Vocabulary};
pub use crate::training::{TrainingRow, TrainingSummary, TRAINING_FILE, VOCABULARY_FILE};
pub use crate::scoring::{ScoringRow, ScoringSummary, SubmissionIndex, SubmissionMeta, SCORING_FILE};
pub use crate::report::{Mean, PredictionRow, SentimentReport, SentimentTotals, SummaryRow, SummaryTable, TOP_N};

// Input helpers for binaries.
pub use crate::jsonl::{expand_inputs, for_each_line_cfg, for_each_line_with_progress_cfg, Compression, LineStats};
pub use crate::progress::set_global_multiprogress;
pub use crate::util::init_tracing_once;
