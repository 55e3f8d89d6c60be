//! Block classifier.
//!
//! Decides which block construct starts at the current line, looking at
//! the lines that follow only where the construct needs it (front matter).
//! Precedence: blank, heading, fence, div fence, display math, then the
//! single-line constructs, list item, paragraph.

use std::sync::LazyLock;

use regex::Regex;

use crate::attrs::{Attributes, DivFence, split_trailing_attributes};
use crate::cursor::Line;
use crate::fence::detect_fence;
use crate::footnotes::parse_definition;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,4})[ \t]+(.*?)(?:[ \t]+#+)?[ \t]*$").unwrap());

static INCLUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\{<\s*include\s+(\S+?)\s*>\}\}$").unwrap());

static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!\[(.*)\]\(([^)\s]+)(?:\s+[^)]*)?\)(?:\{(.*)\})?$").unwrap());

static LAYOUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:\\(?:[vh]space\*?\{[^}]*\}|clearpage|newpage|pagebreak|vfill|noindent|medskip|bigskip|smallskip)\s*)+$",
    )
    .unwrap()
});

static RULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(?:-[ \t]*){3,}|(?:\*[ \t]*){3,}|(?:_[ \t]*){3,})$").unwrap());

static LIST_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([-*+]|\d{1,9}[.)]|[a-z][.)])(?:[ \t]+|$)").unwrap());

/// Block construct starting at a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    /// Whitespace-only line.
    Blank,
    /// `#`–`####` heading.
    Heading {
        /// Number of `#` characters.
        level: u8,
    },
    /// YAML front matter opening `---` on the first line.
    FrontMatter,
    /// Code fence opening.
    Fence,
    /// `:::` with an annotation.
    DivOpen,
    /// Bare `:::`.
    DivClose,
    /// `$$` display math.
    DisplayMath,
    /// `{{< include file.qmd >}}`.
    Include,
    /// Standalone `![caption](path)` image.
    Image,
    /// LaTeX page layout command line.
    Layout,
    /// Horizontal rule.
    Rule,
    /// `[^id]: text`.
    FootnoteDefinition,
    /// List item marker.
    ListItem,
    /// Anything else.
    Paragraph,
}

/// Classify the block starting at `line`.
#[must_use]
pub fn classify(line: &Line<'_>, lookahead: &[Line<'_>]) -> BlockKind {
    if line.is_blank() {
        return BlockKind::Blank;
    }

    let trimmed = line.text.trim();

    if let Some(level) = heading_level(trimmed) {
        return BlockKind::Heading { level };
    }
    if line.number == 1
        && trimmed == "---"
        && lookahead.iter().any(|l| matches!(l.text.trim(), "---" | "..."))
    {
        return BlockKind::FrontMatter;
    }
    if detect_fence(trimmed).is_some() {
        return BlockKind::Fence;
    }
    if let Some(fence) = DivFence::parse(trimmed) {
        return if fence.is_open() {
            BlockKind::DivOpen
        } else {
            BlockKind::DivClose
        };
    }
    if is_display_math(trimmed) {
        return BlockKind::DisplayMath;
    }
    if INCLUDE_RE.is_match(trimmed) {
        return BlockKind::Include;
    }
    if IMAGE_RE.is_match(trimmed) {
        return BlockKind::Image;
    }
    if LAYOUT_RE.is_match(trimmed) {
        return BlockKind::Layout;
    }
    if RULE_RE.is_match(trimmed) {
        return BlockKind::Rule;
    }
    if parse_definition(trimmed).is_some() {
        return BlockKind::FootnoteDefinition;
    }
    if list_marker(trimmed).is_some() {
        return BlockKind::ListItem;
    }
    BlockKind::Paragraph
}

/// A `$$` line that opens a display block.
///
/// A line closing its own `$$` only counts when nothing but an attribute
/// block follows; `$$x$$ is the total.` is a paragraph.
fn is_display_math(trimmed: &str) -> bool {
    let Some(after_open) = trimmed.strip_prefix("$$") else {
        return false;
    };
    match after_open.find("$$") {
        Some(end) => math_close_tail(&after_open[end + 2..]).1.is_none(),
        None => true,
    }
}

/// Split the text after a closing `$$` into an equation id and any prose
/// that follows the math.
pub(crate) fn math_close_tail(after: &str) -> (Option<String>, Option<&str>) {
    let after = after.trim();
    if after.is_empty() {
        return (None, None);
    }
    match split_trailing_attributes(after) {
        Some((before, inner)) if before.is_empty() => (Attributes::parse(inner).id, None),
        _ => (None, Some(after)),
    }
}

fn heading_level(trimmed: &str) -> Option<u8> {
    let caps = HEADING_RE.captures(trimmed)?;
    u8::try_from(caps.get(1)?.as_str().len()).ok()
}

/// Split a heading line into level and title text (attributes included).
pub(crate) fn parse_heading(trimmed: &str) -> Option<(u8, &str)> {
    let caps = HEADING_RE.captures(trimmed)?;
    let level = u8::try_from(caps.get(1)?.as_str().len()).ok()?;
    Some((level, caps.get(2)?.as_str()))
}

/// Parse an include shortcode into its path.
pub(crate) fn parse_include(trimmed: &str) -> Option<&str> {
    INCLUDE_RE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Parse a standalone image into caption, path and attribute block contents.
pub(crate) fn parse_image(trimmed: &str) -> Option<(&str, &str, &str)> {
    let caps = IMAGE_RE.captures(trimmed)?;
    Some((
        caps.get(1)?.as_str(),
        caps.get(2)?.as_str(),
        caps.get(3).map_or("", |m| m.as_str()),
    ))
}

/// List marker at the start of a trimmed line, and the text after it.
pub(crate) fn list_marker(trimmed: &str) -> Option<(&str, &str)> {
    let caps = LIST_MARKER_RE.captures(trimmed)?;
    let whole = caps.get(0)?;
    Some((caps.get(1)?.as_str(), &trimmed[whole.end()..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::split_lines;
    use pretty_assertions::assert_eq;

    fn kind(text: &str) -> BlockKind {
        classify(&Line::new(5, text), &[])
    }

    #[test]
    fn test_headings() {
        assert_eq!(kind("## Section One {#sec-a}"), BlockKind::Heading { level: 2 });
        assert_eq!(kind("#### Deep"), BlockKind::Heading { level: 4 });
        assert_eq!(kind("#| label: fig-a"), BlockKind::Paragraph);
        assert_eq!(kind("#hashtag"), BlockKind::Paragraph);
        assert_eq!(kind("##### too deep"), BlockKind::Paragraph);
    }

    #[test]
    fn test_closing_hashes_need_whitespace() {
        assert_eq!(parse_heading("## Using C#"), Some((2, "Using C#")));
        assert_eq!(parse_heading("## Closed ##"), Some((2, "Closed")));
        assert_eq!(parse_heading("### F# and C# {#sec-langs}"), Some((3, "F# and C# {#sec-langs}")));
    }

    #[test]
    fn test_display_math_lines() {
        assert_eq!(kind("$$ x = 1 $$"), BlockKind::DisplayMath);
        assert_eq!(kind("$$x$$ {#eq-x}"), BlockKind::DisplayMath);
        assert_eq!(kind("$$\\begin{aligned}"), BlockKind::DisplayMath);
        assert_eq!(kind("$$x$$ is the total."), BlockKind::Paragraph);
        assert_eq!(
            math_close_tail(" {#eq-sum}"),
            (Some("eq-sum".to_owned()), None)
        );
        assert_eq!(math_close_tail(" and text"), (None, Some("and text")));
        assert_eq!(math_close_tail("  "), (None, None));
    }

    #[test]
    fn test_fences_and_divs() {
        assert_eq!(kind("```{r fig-x}"), BlockKind::Fence);
        assert_eq!(kind("~~~ python"), BlockKind::Fence);
        assert_eq!(kind("::: {.important}"), BlockKind::DivOpen);
        assert_eq!(kind(":::: callout-tip"), BlockKind::DivOpen);
        assert_eq!(kind(":::"), BlockKind::DivClose);
    }

    #[test]
    fn test_single_line_constructs() {
        assert_eq!(kind("$$"), BlockKind::DisplayMath);
        assert_eq!(kind("{{< include _exercises.qmd >}}"), BlockKind::Include);
        assert_eq!(kind("![Loans](images/loans.png){#fig-loans width=50%}"), BlockKind::Image);
        assert_eq!(kind(r"\vspace{1cm} \clearpage"), BlockKind::Layout);
        assert_eq!(kind("---"), BlockKind::Rule);
        assert_eq!(kind("* * *"), BlockKind::Rule);
        assert_eq!(kind("[^1]: note"), BlockKind::FootnoteDefinition);
    }

    #[test]
    fn test_list_items() {
        assert_eq!(kind("- item"), BlockKind::ListItem);
        assert_eq!(kind("12. item"), BlockKind::ListItem);
        assert_eq!(kind("b) part"), BlockKind::ListItem);
        assert_eq!(kind("-1 is negative"), BlockKind::Paragraph);
        assert_eq!(kind("**bold** start"), BlockKind::Paragraph);
    }

    #[test]
    fn test_front_matter_only_on_first_line() {
        let lines = split_lines("---\ntitle: X\n---\nBody");
        assert_eq!(classify(&lines[0], &lines[1..]), BlockKind::FrontMatter);
        assert_eq!(classify(&lines[2], &lines[3..]), BlockKind::Rule);
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_heading("## Title {#sec-t}"), Some((2, "Title {#sec-t}")));
        assert_eq!(parse_include("{{< include a/b.qmd >}}"), Some("a/b.qmd"));
        assert_eq!(
            parse_image("![A cap](img.png \"t\"){#fig-a}"),
            Some(("A cap", "img.png", "#fig-a"))
        );
        assert_eq!(list_marker("a. first"), Some(("a.", "first")));
    }
}
