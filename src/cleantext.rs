//! Comment text sanitizer: lower-case, drop URLs, strip edge punctuation and
//! emit unigrams, bigrams and trigrams as one flat feature list.

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

/// Sentence-ending marks. These are re-inserted as standalone tokens and
/// break n-gram adjacency.
pub const ENDING_PUNCTUATION: [char; 6] = ['.', '!', '?', ',', ';', ':'];

static URL_RE: OnceLock<Regex> = OnceLock::new();

fn url_regex() -> &'static Regex {
    URL_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:https?://|www\d{0,3}[.]|[a-z0-9.\-]+[.][a-z]{2,4}/).*")
            .expect("static URL pattern compiles")
    })
}

#[inline]
fn is_delimiter(c: char) -> bool {
    matches!(c, ' ' | '\n' | '\t')
}

/// ASCII punctuation, except `%` which always stays attached to its token.
#[inline]
fn is_strippable(c: char) -> bool {
    c.is_ascii_punctuation() && c != '%'
}

#[inline]
fn is_ending_char(c: char) -> bool {
    ENDING_PUNCTUATION.contains(&c)
}

/// True when `s` is exactly one sentence-ending mark.
pub fn is_ending_punctuation(s: &str) -> bool {
    let mut it = s.chars();
    matches!((it.next(), it.next()), (Some(c), None) if is_ending_char(c))
}

/// Remove everything from the first URL-looking match to the end of the token.
pub fn remove_urls(token: &str) -> Cow<'_, str> {
    url_regex().replace_all(token, "")
}

/// Result of stripping punctuation from both edges of one token.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EdgeStrip {
    /// Token with edge punctuation removed; empty if it was all punctuation.
    pub token: String,
    /// Sentence-ending marks found on the right edge, in original order.
    pub trailing: Vec<char>,
}

impl EdgeStrip {
    /// Flatten into `[token] + trailing`.
    pub fn into_tokens(self) -> Vec<String> {
        let mut out = Vec::with_capacity(1 + self.trailing.len());
        out.push(self.token);
        out.extend(self.trailing.into_iter().map(String::from));
        out
    }
}

/// Strip punctuation from both ends of `token`.
///
/// The left and right scans advance in lock-step and stop independently at
/// the first non-strippable character. Right-edge marks from
/// [`ENDING_PUNCTUATION`] are kept in `trailing`; every other stripped mark
/// is dropped. If the scans cross, the token is empty and nothing trails it.
pub fn strip_edge_punctuation(token: &str) -> EdgeStrip {
    let chars: Vec<char> = token.chars().collect();
    let mut lo = 0usize;
    let mut hi = chars.len();
    let mut left_done = false;
    let mut right_done = false;
    let mut trailing = Vec::new();

    while lo < hi && !(left_done && right_done) {
        if !left_done && is_strippable(chars[lo]) {
            lo += 1;
        } else {
            left_done = true;
        }
        // hi >= 1 here: lo was < hi at the top of the loop.
        if !right_done && is_strippable(chars[hi - 1]) {
            if is_ending_char(chars[hi - 1]) {
                trailing.push(chars[hi - 1]);
            }
            hi -= 1;
        } else {
            right_done = true;
        }
    }

    if lo >= hi {
        return EdgeStrip::default();
    }
    trailing.reverse();
    EdgeStrip { token: chars[lo..hi].iter().collect(), trailing }
}

/// The cleaned token sequence: URL-free, edge-stripped tokens with their
/// trailing sentence marks re-inserted right after them. Empty tokens are
/// removed.
pub fn clean_tokens(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut seq = Vec::new();
    for raw in lowered.split(is_delimiter).filter(|t| !t.is_empty()) {
        let stripped = strip_edge_punctuation(&remove_urls(raw));
        for tok in stripped.into_tokens() {
            if !tok.is_empty() {
                seq.push(tok);
            }
        }
    }
    seq
}

/// Unigrams, bigrams and trigrams of one comment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ngrams {
    pub unigrams: Vec<String>,
    pub bigrams: Vec<String>,
    pub trigrams: Vec<String>,
}

impl Ngrams {
    pub fn from_tokens(seq: &[String]) -> Self {
        let word = |t: &String| !is_ending_punctuation(t);

        let unigrams = seq.iter().filter(|t| word(*t)).cloned().collect();
        let bigrams = seq
            .windows(2)
            .filter(|w| w.iter().all(word))
            .map(|w| w.join("_"))
            .collect();
        let trigrams = seq
            .windows(3)
            .filter(|w| w.iter().all(word))
            .map(|w| w.join("_"))
            .collect();

        Self { unigrams, bigrams, trigrams }
    }

    pub fn len(&self) -> usize {
        self.unigrams.len() + self.bigrams.len() + self.trigrams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `unigrams ++ bigrams ++ trigrams`
    pub fn into_features(self) -> Vec<String> {
        let mut out = self.unigrams;
        out.reserve(self.bigrams.len() + self.trigrams.len());
        out.extend(self.bigrams);
        out.extend(self.trigrams);
        out
    }
}

pub fn sanitize_parts(text: &str) -> Ngrams {
    Ngrams::from_tokens(&clean_tokens(text))
}

/// Sanitize one comment body into its flat feature list.
/// Never fails; empty or whitespace-only input yields an empty list.
pub fn sanitize(text: &str) -> Vec<String> {
    sanitize_parts(text).into_features()
}
