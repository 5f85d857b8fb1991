//! U.S. state names recognized in `author_flair_text`.

pub const US_STATES: [&str; 51] = [
    "Alabama", "Alaska", "Arizona", "Arkansas", "California", "Colorado",
    "Connecticut", "Delaware", "District of Columbia", "Florida", "Georgia",
    "Hawaii", "Idaho", "Illinois", "Indiana", "Iowa", "Kansas", "Kentucky",
    "Louisiana", "Maine", "Maryland", "Massachusetts", "Michigan", "Minnesota",
    "Mississippi", "Missouri", "Montana", "Nebraska", "Nevada", "New Hampshire",
    "New Jersey", "New Mexico", "New York", "North Carolina", "North Dakota",
    "Ohio", "Oklahoma", "Oregon", "Pennsylvania", "Rhode Island",
    "South Carolina", "South Dakota", "Tennessee", "Texas", "Utah", "Vermont",
    "Virginia", "Washington", "West Virginia", "Wisconsin", "Wyoming",
];

/// Map a flair to a state name. Matching is exact and case-sensitive;
/// anything else (including no flair) maps to `""`.
pub fn state_from_flair(flair: Option<&str>) -> &'static str {
    match flair {
        Some(f) => US_STATES.iter().copied().find(|s| *s == f).unwrap_or(""),
        None => "",
    }
}
