//! Attribute blocks and div fence lines.
//!
//! Parses the Pandoc attribute syntax `{#id .class key="value"}` used on
//! headings, div fences, images and code chunks, and the `:::` fence lines
//! that open and close custom divs.

use std::collections::HashMap;

/// Parsed attribute block.
///
/// # Example
///
/// ```
/// use qmd2ptx_engine::Attributes;
///
/// let attrs = Attributes::parse(r#"#sec-intro .unnumbered width="70%""#);
/// assert_eq!(attrs.id.as_deref(), Some("sec-intro"));
/// assert_eq!(attrs.classes, vec!["unnumbered"]);
/// assert_eq!(attrs.get("width"), Some("70%"));
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Attributes {
    /// Identifier: `{#id}`.
    pub id: Option<String>,
    /// Classes: `{.class1 .class2}`.
    pub classes: Vec<String>,
    /// Key-value attributes: `{key="value"}`.
    pub attrs: HashMap<String, String>,
}

impl Attributes {
    /// Parse the inside of an attribute block (without the braces).
    #[must_use]
    pub fn parse(attrs_str: &str) -> Self {
        let mut attrs = Self::default();
        let mut remaining = attrs_str.trim();

        while !remaining.is_empty() {
            remaining = remaining.trim_start();

            if let Some(rest) = remaining.strip_prefix('#') {
                let end = rest
                    .find(|c: char| c.is_whitespace() || c == '.' || c == '#')
                    .unwrap_or(rest.len());
                if end > 0 {
                    attrs.id = Some(rest[..end].to_owned());
                }
                remaining = &rest[end..];
            } else if let Some(rest) = remaining.strip_prefix('.') {
                let end = rest
                    .find(|c: char| c.is_whitespace() || c == '.' || c == '#')
                    .unwrap_or(rest.len());
                if end > 0 {
                    attrs.classes.push(rest[..end].to_owned());
                }
                remaining = &rest[end..];
            } else if let Some((key, value, rest)) = parse_key_value(remaining) {
                attrs.attrs.insert(key.to_owned(), value.to_owned());
                remaining = rest;
            } else {
                let skip = remaining.chars().next().map_or(0, char::len_utf8);
                remaining = &remaining[skip..];
            }
        }

        attrs
    }

    /// Get an attribute value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }
}

/// Parse a key-value pair: `key="value"`, `key='value'` or `key=value`.
fn parse_key_value(s: &str) -> Option<(&str, &str, &str)> {
    let eq_pos = s.find('=')?;
    let key = s[..eq_pos].trim();

    if key.is_empty() || key.contains(char::is_whitespace) || key.starts_with(['#', '.']) {
        return None;
    }

    let after_eq = &s[eq_pos + 1..];

    if let Some(stripped) = after_eq.strip_prefix('"') {
        let end_quote = stripped.find('"')?;
        Some((key, &stripped[..end_quote], &stripped[end_quote + 1..]))
    } else if let Some(stripped) = after_eq.strip_prefix('\'') {
        let end_quote = stripped.find('\'')?;
        Some((key, &stripped[..end_quote], &stripped[end_quote + 1..]))
    } else {
        let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
        Some((key, &after_eq[..end], &after_eq[end..]))
    }
}

/// Split a trailing `{...}` attribute block off a line.
///
/// Returns the text before the block (trimmed) and the block contents.
/// Returns `None` if the line doesn't end with a balanced brace block.
#[must_use]
pub fn split_trailing_attributes(text: &str) -> Option<(&str, &str)> {
    let trimmed = text.trim_end();
    if !trimmed.ends_with('}') {
        return None;
    }

    let mut depth = 0usize;
    for (idx, c) in trimmed.char_indices().rev() {
        match c {
            '}' => depth += 1,
            '{' => {
                depth -= 1;
                if depth == 0 {
                    let inner = &trimmed[idx + 1..trimmed.len() - 1];
                    return Some((trimmed[..idx].trim_end(), inner));
                }
            }
            _ => {}
        }
    }
    None
}

/// A `:::` fence line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DivFence {
    /// Opening fence with an annotation: `::: {.important}` or `::: note`.
    Open {
        /// Number of colons in the fence.
        colons: usize,
        /// Annotation text after the colons, as written.
        annotation: String,
        /// Parsed attributes; a bare word annotation becomes a class.
        attrs: Attributes,
    },
    /// Bare closing fence: `:::`.
    Close {
        /// Number of colons in the fence.
        colons: usize,
    },
}

impl DivFence {
    /// Parse a line as a div fence.
    ///
    /// Returns `None` if the line is not a fence of three or more colons.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if !trimmed.starts_with(":::") {
            return None;
        }

        let colons = trimmed.chars().take_while(|&c| c == ':').count();
        let after_colons = trimmed[colons..].trim();

        if after_colons.is_empty() {
            return Some(Self::Close { colons });
        }

        let attrs = if let Some(inner) = after_colons
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
        {
            Attributes::parse(inner)
        } else {
            // `::: name {attrs}` or `::: name`
            let (name, rest) = after_colons
                .split_once(char::is_whitespace)
                .unwrap_or((after_colons, ""));
            if !is_valid_class_name(name) {
                return None;
            }
            let mut attrs = match split_trailing_attributes(rest) {
                Some(("", inner)) => Attributes::parse(inner),
                None if rest.trim().is_empty() => Attributes::default(),
                _ => return None,
            };
            attrs.classes.insert(0, name.to_owned());
            attrs
        };

        Some(Self::Open {
            colons,
            annotation: after_colons.to_owned(),
            attrs,
        })
    }

    /// Whether this fence opens a div.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }
}

/// Valid class names contain only alphanumerics, hyphens and underscores.
fn is_valid_class_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_attributes() {
        let attrs = Attributes::parse("");
        assert_eq!(attrs, Attributes::default());
    }

    #[test]
    fn test_id_and_classes() {
        let attrs = Attributes::parse("#fig-a .wide.tall");
        assert_eq!(attrs.id.as_deref(), Some("fig-a"));
        assert_eq!(attrs.classes, vec!["wide", "tall"]);
    }

    #[test]
    fn test_key_value_quoting() {
        let attrs = Attributes::parse(r#"title="Note one" when-format='html' width=50%"#);
        assert_eq!(attrs.get("title"), Some("Note one"));
        assert_eq!(attrs.get("when-format"), Some("html"));
        assert_eq!(attrs.get("width"), Some("50%"));
    }

    #[test]
    fn test_unclosed_quote_skips_pair() {
        let attrs = Attributes::parse(r#".a key="broken"#);
        assert_eq!(attrs.classes, vec!["a"]);
        assert!(attrs.get("key").is_none());
    }

    #[test]
    fn test_split_trailing_attributes() {
        assert_eq!(
            split_trailing_attributes("Section One {#sec-a}"),
            Some(("Section One", "#sec-a"))
        );
        assert_eq!(
            split_trailing_attributes("Set {x} of {#sec-b .unnumbered}"),
            Some(("Set {x} of", "#sec-b .unnumbered"))
        );
        assert_eq!(split_trailing_attributes("no attributes"), None);
    }

    #[test]
    fn test_div_fence_open_braced() {
        let fence = DivFence::parse("::: {.guidedpractice}").unwrap();
        match fence {
            DivFence::Open {
                colons,
                annotation,
                attrs,
            } => {
                assert_eq!(colons, 3);
                assert_eq!(annotation, "{.guidedpractice}");
                assert_eq!(attrs.classes, vec!["guidedpractice"]);
            }
            DivFence::Close { .. } => panic!("expected open fence"),
        }
    }

    #[test]
    fn test_div_fence_open_bare_name() {
        let fence = DivFence::parse("::::: callout-note {title=\"Hint\"}").unwrap();
        let DivFence::Open { colons, attrs, .. } = fence else {
            panic!("expected open fence");
        };
        assert_eq!(colons, 5);
        assert_eq!(attrs.classes, vec!["callout-note"]);
        assert_eq!(attrs.get("title"), Some("Hint"));
    }

    #[test]
    fn test_div_fence_close() {
        assert_eq!(
            DivFence::parse("  :::  "),
            Some(DivFence::Close { colons: 3 })
        );
        assert_eq!(
            DivFence::parse("::::"),
            Some(DivFence::Close { colons: 4 })
        );
    }

    #[test]
    fn test_not_a_div_fence() {
        assert_eq!(DivFence::parse(":: {.x}"), None);
        assert_eq!(DivFence::parse("text ::: {.x}"), None);
        assert_eq!(DivFence::parse("::: not valid!"), None);
    }
}
