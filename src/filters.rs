//! Body filters applied before scoring: quoted replies and sarcasm markers
//! carry sentiment that is not the commenter's own.

/// A reply that starts by quoting its parent (`&gt;` is the escaped `>`).
#[inline]
pub fn is_quote(body: &str) -> bool {
    body.starts_with("&gt")
}

/// The `/s` sarcasm marker anywhere in the body (case-sensitive).
#[inline]
pub fn is_sarcasm(body: &str) -> bool {
    body.contains("/s")
}

/// Missing bodies never pass.
pub fn keep_for_scoring(body: Option<&str>) -> bool {
    match body {
        Some(b) => !is_quote(b) && !is_sarcasm(b),
        None => false,
    }
}
