//! Citation marker scanning
//!
//! Recognizes `[2]`, `[1, 3]` and the Arabic-Indic forms `[٢]` / `[۲]`
//! that the Arabic prompt asks for.

use regex_lite::Regex;
use std::sync::OnceLock;

/// Citation markers found in an answer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationCheck {
    /// Distinct in-range indices, in order of first appearance
    pub cited: Vec<usize>,
    /// Distinct indices that point at no context entry
    pub invalid: Vec<usize>,
}

impl CitationCheck {
    pub fn is_valid(&self) -> bool {
        self.invalid.is_empty()
    }
}

fn marker_pattern() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"\[\s*([0-9٠-٩۰-۹]+(?:\s*[,،]\s*[0-9٠-٩۰-۹]+)*)\s*\]").expect("citation pattern is valid")
    })
}

fn digit_value(ch: char) -> Option<u32> {
    match ch {
        '0'..='9' => ch.to_digit(10),
        '٠'..='٩' => Some(ch as u32 - '٠' as u32),
        '۰'..='۹' => Some(ch as u32 - '۰' as u32),
        _ => None,
    }
}

fn parse_index(digits: &str) -> Option<usize> {
    digits.chars().try_fold(0usize, |acc, ch| {
        let d = digit_value(ch)?;
        acc.checked_mul(10)?.checked_add(d as usize)
    })
}

/// Scan `answer` for markers and split them by whether they resolve to one
/// of `context_len` entries (1-based)
pub fn check_citations(answer: &str, context_len: usize) -> CitationCheck {
    let mut check = CitationCheck::default();

    for caps in marker_pattern().captures_iter(answer) {
        let Some(group) = caps.get(1) else { continue };

        for part in group.as_str().split([',', '،']) {
            let Some(index) = parse_index(part.trim()) else { continue };
            let bucket = if (1..=context_len).contains(&index) {
                &mut check.cited
            } else {
                &mut check.invalid
            };
            if !bucket.contains(&index) {
                bucket.push(index);
            }
        }
    }

    check
}
