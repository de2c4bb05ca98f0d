// src/utils/topic.rs

/// Normalizes a user-supplied quiz topic.
///
/// Whitespace runs collapse to a single space and control characters are
/// removed. Everything else is kept as typed: topics are stored and prompted
/// verbatim and only travel as JSON strings.
pub fn normalize_topic(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| word.chars().filter(|c| !c.is_control()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
