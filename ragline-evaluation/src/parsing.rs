//! Lenient parsing of judge verdicts.
//!
//! Matching is case-insensitive and tolerates surrounding prose. The first
//! well-formed match wins; no match at all is a parse error.

use std::sync::LazyLock;

use ragline_core::{RaglineError, Result};
use regex::Regex;

static VERDICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(yes|no)\b").expect("valid verdict pattern"));

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid number pattern"));

/// Scale descriptions such as `1 to 5`, `1-5`, `between 1 and 5`,
/// `out of 5`, or the `/5` of `4/5`.
static SCALE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\d+(?:\.\d+)?\s*(?:-|to)\s*\d+(?:\.\d+)?",
        r"|\bbetween\s+\d+(?:\.\d+)?\s+and\s+\d+(?:\.\d+)?",
        r"|/\s*\d+(?:\.\d+)?",
        r"|\bout\s+of\s+\d+(?:\.\d+)?",
    ))
    .expect("valid scale pattern")
});

/// Parse a YES/NO verdict.
///
/// The first non-blank line is searched first since judges are asked to put
/// the verdict there; the rest of the answer is searched only when that
/// line holds none.
pub fn parse_yes_no(answer: &str) -> Result<bool> {
    let first_line = answer.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    VERDICT
        .captures(first_line)
        .or_else(|| VERDICT.captures(answer))
        .map(|caps| caps[1].eq_ignore_ascii_case("yes"))
        .ok_or_else(|| {
            RaglineError::parse(format!("judge answer contains no YES/NO verdict: {}", answer.trim()))
        })
}

/// Parse the first number within `min..=max`.
///
/// Like [`parse_yes_no`], the first non-blank line is searched before the
/// rest of the answer. Scale descriptions are skipped, so `1` in "on a scale
/// of 1 to 5" is never taken as the rating.
pub fn parse_rating(answer: &str, min: f64, max: f64) -> Result<f64> {
    let first_line = answer.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    rating_in(first_line, min, max)
        .or_else(|| rating_in(answer, min, max))
        .ok_or_else(|| {
            RaglineError::parse(format!(
                "judge answer contains no rating between {min} and {max}: {}",
                answer.trim()
            ))
        })
}

fn rating_in(text: &str, min: f64, max: f64) -> Option<f64> {
    let without_scales = SCALE.replace_all(text, " ");
    NUMBER
        .find_iter(&without_scales)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .find(|value| (min..=max).contains(value))
}
