//! Code fences: open-line parsing, fence tracking and chunk metadata.
//!
//! Code fences can use backticks or tildes (three or more). The closing fence
//! must use the same character and be at least as long as the opening fence.
//! Executable chunks (```` ```{r} ````) carry `#|` metadata directives.

use std::collections::HashMap;

use crate::attrs::Attributes;
use crate::cursor::Line;

/// Prefix of metadata directive lines inside executable chunks.
pub const DIRECTIVE_SENTINEL: &str = "#|";

/// Tracks code fence state during line-by-line scanning.
///
/// Used wherever lines are scanned for other syntax (div fences, footnote
/// definitions) that must be ignored inside code.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    /// Character used for the current fence (backtick or tilde).
    fence_char: Option<char>,
    /// Length of the opening fence (minimum length for closing).
    fence_len: usize,
}

impl FenceTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Check if currently inside a fenced code block.
    pub(crate) fn in_fence(&self) -> bool {
        self.fence_char.is_some()
    }

    /// Update fence state based on a line.
    ///
    /// Returns `true` if the line is a fence marker (opening or closing).
    pub(crate) fn update(&mut self, line: &str) -> bool {
        let trimmed = line.trim_start();

        if let Some(fence_char) = self.fence_char {
            if is_closing_fence(trimmed, fence_char, self.fence_len) {
                self.fence_char = None;
                self.fence_len = 0;
                return true;
            }
            false
        } else if let Some((ch, len)) = detect_fence(trimmed) {
            self.fence_char = Some(ch);
            self.fence_len = len;
            true
        } else {
            false
        }
    }
}

/// Detect if a line starts a code fence.
///
/// Returns the fence character and length if found.
pub(crate) fn detect_fence(trimmed: &str) -> Option<(char, usize)> {
    let first = trimmed.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }

    let count = trimmed.chars().take_while(|&c| c == first).count();
    // A backtick fence's info string cannot contain backticks
    if count < 3 || (first == '`' && trimmed[count..].contains('`')) {
        return None;
    }
    Some((first, count))
}

/// Check if a line is a valid closing fence.
pub(crate) fn is_closing_fence(trimmed: &str, expected_char: char, min_len: usize) -> bool {
    if !trimmed.starts_with(expected_char) {
        return false;
    }

    let count = trimmed.chars().take_while(|&c| c == expected_char).count();
    if count < min_len {
        return false;
    }

    trimmed[count..].chars().all(char::is_whitespace)
}

/// Parsed opening line of a code fence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenceOpen {
    /// Opening line as written (trimmed), for error messages.
    pub marker: String,
    /// Fence character.
    pub fence_char: char,
    /// Fence length.
    pub fence_len: usize,
    /// Language annotation, if any.
    pub language: Option<String>,
    /// Whether the chunk is executed (`{r}` rather than `r` or `{.r}`).
    pub executable: bool,
    /// Chunk label given in the header (`{r fig-scatter}`).
    pub label: Option<String>,
    /// Header options (`{r, echo=FALSE}` or `{.python #lst-a}`).
    pub attrs: Attributes,
}

impl FenceOpen {
    /// Parse a line as the opening of a code fence.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        let (fence_char, fence_len) = detect_fence(trimmed)?;
        let info = trimmed[fence_len..].trim();

        let mut open = Self {
            marker: trimmed.to_owned(),
            fence_char,
            fence_len,
            language: None,
            executable: false,
            label: None,
            attrs: Attributes::default(),
        };

        if let Some(inner) = info.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            let inner = inner.trim();
            if inner.starts_with(['.', '#', '=']) {
                // Pandoc attribute block: {.python #lst-a}
                open.attrs = Attributes::parse(inner);
                open.language = open.attrs.classes.first().cloned();
            } else {
                // knitr chunk header: {r label, key=value}
                open.executable = true;
                let mut segments = split_options(inner).into_iter();
                let mut words = segments.next().unwrap_or_default().split_whitespace();
                open.language = words.next().map(str::to_owned);
                for token in words.chain(segments.map(str::trim)) {
                    open.chunk_option(token);
                }
            }
        } else if !info.is_empty() {
            let language = info.split_whitespace().next().unwrap_or(info);
            open.language = Some(language.to_owned());
        }

        Some(open)
    }

    fn chunk_option(&mut self, token: &str) {
        if let Some((key, value)) = token.split_once('=') {
            self.attrs.attrs.insert(
                key.trim().to_owned(),
                value.trim().trim_matches(['"', '\'']).to_owned(),
            );
        } else if self.label.is_none() && !token.is_empty() {
            self.label = Some(token.to_owned());
        }
    }

    /// Whether `line` closes this fence.
    #[must_use]
    pub fn is_closed_by(&self, line: &str) -> bool {
        is_closing_fence(line.trim_start(), self.fence_char, self.fence_len)
    }
}

/// Key-value metadata of an executable chunk.
///
/// Collected from `#| key: value` directive lines. A directive line without a
/// key, or an indented one, continues the previous key's value; values are
/// joined with single spaces.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FenceMetadata {
    entries: HashMap<String, String>,
}

impl FenceMetadata {
    /// Split chunk body lines into metadata and code.
    #[must_use]
    pub fn parse<'a>(body: &[Line<'a>]) -> (Self, Vec<Line<'a>>) {
        let mut metadata = Self::default();
        let mut code = Vec::with_capacity(body.len());
        let mut current_key: Option<String> = None;

        for line in body {
            let Some(content) = line.trimmed().strip_prefix(DIRECTIVE_SENTINEL) else {
                code.push(*line);
                current_key = None;
                continue;
            };

            // One space after the sentinel is syntax; more is YAML indentation
            let content = content.strip_prefix(' ').unwrap_or(content);
            let indented = content.starts_with([' ', '\t']);

            match parse_directive(content) {
                Some((key, value)) if !indented || current_key.is_none() => {
                    metadata.append(key, clean_value(value));
                    current_key = Some(key.to_owned());
                }
                _ => {
                    if let Some(key) = &current_key {
                        let continuation = content.trim().trim_start_matches("- ");
                        metadata.append(key, clean_value(continuation));
                    }
                }
            }
        }

        (metadata, code)
    }

    fn append(&mut self, key: &str, value: String) {
        let entry = self.entries.entry(key.to_owned()).or_default();
        if value.is_empty() {
            return;
        }
        if !entry.is_empty() {
            entry.push(' ');
        }
        entry.push_str(&value);
    }

    /// Insert a value unless the key is already set by a directive.
    pub fn insert_default(&mut self, key: &str, value: &str) {
        self.entries
            .entry(key.to_owned())
            .or_insert_with(|| value.to_owned());
    }

    /// Get a metadata value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Whether the chunk output is included (`include: false` excludes it).
    #[must_use]
    pub fn include(&self) -> bool {
        !self
            .get("include")
            .is_some_and(|v| v.eq_ignore_ascii_case("false"))
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no directives were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split chunk options at commas outside quotes.
fn split_options(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote = None;
    let mut start = 0;
    for (idx, c) in inner.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            (None, ',') => {
                parts.push(&inner[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);
    parts
}

/// Split `key: value`, requiring a YAML-like key.
fn parse_directive(content: &str) -> Option<(&str, &str)> {
    let (key, value) = content.trim().split_once(':')?;
    let valid = key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    valid.then_some((key, value))
}

/// Strip YAML block indicators and surrounding quotes.
fn clean_value(value: &str) -> String {
    let value = value.trim();
    let value = match value {
        "|" | ">" | "|-" | ">-" | "|+" | ">+" => "",
        _ => value,
    };
    let unquoted = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);
    unquoted.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::split_lines;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_backtick_fence() {
        let mut tracker = FenceTracker::new();

        assert!(tracker.update("```{r}"));
        assert!(tracker.in_fence());
        assert!(!tracker.update("::: {.important}"));
        assert!(tracker.in_fence());
        assert!(tracker.update("```"));
        assert!(!tracker.in_fence());
    }

    #[test]
    fn test_tilde_and_mixed_chars() {
        let mut tracker = FenceTracker::new();

        assert!(tracker.update("~~~"));
        assert!(!tracker.update("```"));
        assert!(tracker.in_fence());
        assert!(tracker.update("~~~~"));
        assert!(!tracker.in_fence());
    }

    #[test]
    fn test_shorter_fence_not_closing() {
        let mut tracker = FenceTracker::new();

        assert!(tracker.update("````"));
        assert!(!tracker.update("```"));
        assert!(tracker.in_fence());
        assert!(tracker.update("````"));
        assert!(!tracker.in_fence());
    }

    #[test]
    fn test_inline_code_is_not_fence() {
        assert_eq!(detect_fence("``inline``"), None);
        assert_eq!(detect_fence("```a` b```"), None);
        assert_eq!(detect_fence("```python"), Some(('`', 3)));
    }

    #[test]
    fn test_parse_knitr_header() {
        let open = FenceOpen::parse("```{r fig-scatter, echo=FALSE}").unwrap();
        assert!(open.executable);
        assert_eq!(open.language.as_deref(), Some("r"));
        assert_eq!(open.label.as_deref(), Some("fig-scatter"));
        assert_eq!(open.attrs.get("echo"), Some("FALSE"));
    }

    #[test]
    fn test_parse_quoted_chunk_option() {
        let open = FenceOpen::parse(r#"```{r fig-age, fig.cap="Ages, in years", out.width="50%"}"#).unwrap();
        assert_eq!(open.label.as_deref(), Some("fig-age"));
        assert_eq!(open.attrs.get("fig.cap"), Some("Ages, in years"));
        assert_eq!(open.attrs.get("out.width"), Some("50%"));
    }

    #[test]
    fn test_parse_static_fences() {
        let plain = FenceOpen::parse("```python").unwrap();
        assert!(!plain.executable);
        assert_eq!(plain.language.as_deref(), Some("python"));

        let attr = FenceOpen::parse("``` {.sql #lst-query}").unwrap();
        assert!(!attr.executable);
        assert_eq!(attr.language.as_deref(), Some("sql"));
        assert_eq!(attr.attrs.id.as_deref(), Some("lst-query"));

        let bare = FenceOpen::parse("~~~").unwrap();
        assert_eq!(bare.language, None);
        assert!(bare.is_closed_by("~~~"));
        assert!(!bare.is_closed_by("```"));
    }

    #[test]
    fn test_metadata_multiline_caption() {
        let lines = split_lines(
            "#| label: fig-loans\n\
             #| fig-cap: |\n\
             #|   Distribution of loan amounts\n\
             #|   across the sample.\n\
             #| fig-alt: \"Histogram.\"\n\
             ggplot(loans) +\n  geom_histogram()",
        );
        let (metadata, code) = FenceMetadata::parse(&lines);

        assert_eq!(metadata.get("label"), Some("fig-loans"));
        assert_eq!(
            metadata.get("fig-cap"),
            Some("Distribution of loan amounts across the sample.")
        );
        assert_eq!(metadata.get("fig-alt"), Some("Histogram."));
        assert_eq!(code.len(), 2);
        assert_eq!(code[0].text, "ggplot(loans) +");
    }

    #[test]
    fn test_metadata_unkeyed_continuation() {
        let lines = split_lines("#| fig-cap: First line\n#| second line: with colon words\n");
        let (metadata, _) = FenceMetadata::parse(&lines);
        assert_eq!(
            metadata.get("fig-cap"),
            Some("First line second line: with colon words")
        );
    }

    #[test]
    fn test_metadata_include_false() {
        let lines = split_lines("#| include: false\nlibrary(tidyverse)");
        let (metadata, code) = FenceMetadata::parse(&lines);
        assert!(!metadata.include());
        assert_eq!(code.len(), 1);

        let (empty, _) = FenceMetadata::parse(&[]);
        assert!(empty.include());
        assert!(empty.is_empty());
    }
}
