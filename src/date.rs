use time::macros::format_description;
use time::OffsetDateTime;

/// UTC calendar day of a unix timestamp as `YYYY-MM-DD`.
/// Out-of-range timestamps fall back to the epoch day.
pub fn day_from_epoch(ts: i64) -> String {
    let dt = OffsetDateTime::from_unix_timestamp(ts).unwrap_or(OffsetDateTime::UNIX_EPOCH);
    let fmt = format_description!("[year]-[month]-[day]");
    dt.date().format(&fmt).unwrap_or_else(|_| "1970-01-01".to_string())
}
