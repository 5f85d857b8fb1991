//! Line-level schemas for the comment and submission dumps.
//! Extra fields are ignored by serde.

use anyhow::Result;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Comment fields used by the joins. Dumps disagree on whether numbers are
/// encoded as JSON numbers or strings, so both are accepted.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CommentRecord {
    pub id: Option<String>,
    pub body: Option<String>,
    pub author_flair_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub score: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub created_utc: Option<i64>,
    pub link_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SubmissionRecord {
    pub id: Option<String>,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub score: Option<i64>,
}

pub(crate) fn lenient_i64<'de, D>(de: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(de)?;
    Ok(match v {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

#[inline]
pub fn parse_comment(line: &str) -> Result<CommentRecord> {
    Ok(serde_json::from_str(line)?)
}

#[inline]
pub fn parse_submission(line: &str) -> Result<SubmissionRecord> {
    Ok(serde_json::from_str(line)?)
}

/// Drop the three-character kind prefix (`t3_`) from a comment's `link_id`.
pub fn cut_link_id(link_id: &str) -> &str {
    match link_id.char_indices().nth(3) {
        Some((idx, _)) => &link_id[idx..],
        None => "",
    }
}
