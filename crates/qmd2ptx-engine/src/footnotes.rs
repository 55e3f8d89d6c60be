//! Footnote definitions (`[^id]: text`), collected before conversion.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::cursor::Line;
use crate::fence::FenceTracker;

static DEFINITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\^([^\]\s]+)\]:\s*(.*)$").unwrap());

/// Footnote definitions by id.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Footnotes {
    definitions: HashMap<String, String>,
}

impl Footnotes {
    /// Collect every definition outside code fences.
    ///
    /// Indented lines directly after a definition continue it.
    #[must_use]
    pub fn collect(lines: &[Line<'_>]) -> Self {
        let mut definitions = HashMap::new();
        let mut fences = FenceTracker::new();
        let mut idx = 0;

        while idx < lines.len() {
            let line = lines[idx];
            if fences.update(line.text) || fences.in_fence() {
                idx += 1;
                continue;
            }
            let Some((id, first)) = parse_definition(line.text) else {
                idx += 1;
                continue;
            };

            let extent = definition_extent(&lines[idx..]);
            let mut text = first.trim().to_owned();
            for continuation in &lines[idx + 1..idx + extent] {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(continuation.text.trim());
            }
            definitions.insert(id.to_owned(), text);
            idx += extent;
        }

        Self { definitions }
    }

    /// Definition text for an id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&str> {
        self.definitions.get(id).map(String::as_str)
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether there are no definitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Split a definition line into its id and first line of text.
pub(crate) fn parse_definition(text: &str) -> Option<(&str, &str)> {
    let caps = DEFINITION_RE.captures(text)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// Number of lines a definition starting at `lines[0]` occupies.
pub(crate) fn definition_extent(lines: &[Line<'_>]) -> usize {
    1 + lines
        .iter()
        .skip(1)
        .take_while(|line| !line.is_blank() && line.indent() >= 2)
        .count()
}
