use crate::types::LineMap;

/// Index the non-blank lines of recognized text from 1, in order.
///
/// Lines that are empty or whitespace-only are dropped and do not consume an
/// index; every other line is kept verbatim.
pub fn structure_lines(text: &str) -> LineMap {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(i, line)| (i + 1, line.to_string()))
        .collect()
}
