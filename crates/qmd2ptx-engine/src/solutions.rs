//! Solutions files: numbered answers looked up by exercise number.
//!
//! A solutions file is an ordered list. Items are numbered in list order
//! starting at 1 regardless of the number written in the marker, and
//! `\addtocounter{enumi}{N}` skips `N` numbers, so an answer key for
//! odd-numbered exercises lines up with the exercise numbering.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

static ITEM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s{0,3}\d+\.\s+(.*)$").unwrap());

static COUNTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\addtocounter\{enumi\}\{(-?\d+)\}").unwrap());

static PART_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:^|\s)\(([a-z])\)\s+").unwrap());

/// Solutions keyed by exercise number.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SolutionBook {
    solutions: BTreeMap<u32, String>,
}

impl SolutionBook {
    /// Parse a solutions file.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut solutions = BTreeMap::new();
        let mut counter: i64 = 0;
        let mut current: Option<(u32, String)> = None;

        for line in text.lines() {
            let skip: i64 = COUNTER_RE
                .captures_iter(line)
                .filter_map(|caps| caps[1].parse::<i64>().ok())
                .sum();
            let cleaned = COUNTER_RE.replace_all(line, "");
            let cleaned = cleaned.trim_end();

            if let Some(caps) = ITEM_RE.captures(cleaned) {
                if let Some((number, text)) = current.take() {
                    solutions.insert(number, text);
                }
                counter += 1;
                let first = caps.get(1).map_or("", |m| m.as_str()).trim();
                current = u32::try_from(counter)
                    .ok()
                    .map(|number| (number, first.to_owned()));
            } else if let Some((_, text)) = current.as_mut() {
                let continuation = cleaned.trim();
                if !continuation.is_empty() && !continuation.starts_with('#') {
                    if !text.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(continuation);
                }
            }

            // A counter bump applies to the items after it
            counter += skip;
        }

        if let Some((number, text)) = current {
            solutions.insert(number, text);
        }

        Self { solutions }
    }

    /// Solution text for an exercise number.
    #[must_use]
    pub fn get(&self, number: u32) -> Option<&str> {
        self.solutions.get(&number).map(String::as_str)
    }

    /// Exercise numbers that have solutions, ascending.
    pub fn numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.solutions.keys().copied()
    }

    /// Whether an exercise number is expected to have a solution.
    ///
    /// Answer keys often cover only odd or only even exercises, so a
    /// number is expected when the book has any solution of its parity.
    #[must_use]
    pub fn expects(&self, number: u32) -> bool {
        self.numbers().any(|n| n % 2 == number % 2)
    }

    /// Number of solutions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    /// Whether the book is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }
}

/// Split `(a) … (b) …` solution text into its parts.
///
/// Returns `None` unless the text starts with `(a)`.
#[must_use]
pub fn solution_parts(text: &str) -> Option<Vec<&str>> {
    let text = text.trim();
    if !text.starts_with("(a)") {
        return None;
    }

    let bounds: Vec<(usize, usize)> = PART_RE
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();
    let mut parts = Vec::with_capacity(bounds.len());
    for (idx, &(_, content_start)) in bounds.iter().enumerate() {
        let end = bounds
            .get(idx + 1)
            .map_or(text.len(), |&(next_start, _)| next_start);
        let part = text[content_start..end].trim();
        if !part.is_empty() {
            parts.push(part);
        }
    }
    (!parts.is_empty()).then_some(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_odd_numbered_answer_key() {
        let book = SolutionBook::parse(
            "1.  Answer one\ncontinues.\n\\addtocounter{enumi}{1}\n\n1.  Answer three\n\\addtocounter{enumi}{1}\n1. Answer five",
        );
        assert_eq!(book.numbers().collect::<Vec<_>>(), vec![1, 3, 5]);
        assert_eq!(book.get(1), Some("Answer one continues."));
        assert_eq!(book.get(3), Some("Answer three"));
        assert_eq!(book.get(2), None);
        assert!(book.expects(7));
        assert!(!book.expects(2));
    }

    #[test]
    fn test_inline_counter_command() {
        let book = SolutionBook::parse("1. First \\addtocounter{enumi}{2}\n2. Fourth");
        assert_eq!(book.get(1), Some("First"));
        assert_eq!(book.get(4), Some("Fourth"));
    }

    #[test]
    fn test_text_before_first_item_ignored() {
        let book = SolutionBook::parse("# Solutions\n\nIntro.\n\n1. Only");
        assert_eq!(book.len(), 1);
        assert_eq!(book.get(1), Some("Only"));
    }

    #[test]
    fn test_solution_parts() {
        assert_eq!(
            solution_parts("(a) Mean is 3. (b) Median (the middle) is 2. (c) Skewed."),
            Some(vec!["Mean is 3.", "Median (the middle) is 2.", "Skewed."])
        );
        assert_eq!(solution_parts("No parts (a) here"), None);
    }
}
