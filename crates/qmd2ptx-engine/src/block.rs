//! Block readers.
//!
//! [`read_block`] classifies the line under the cursor and consumes exactly
//! the lines of that block, returning it as an immutable [`Block`]. Readers
//! for containers (fences, divs, display math) fail with a structural error
//! when the closing line never comes.

use crate::attrs::{Attributes, DivFence, split_trailing_attributes};
use crate::classify::{
    BlockKind, classify, list_marker, math_close_tail, parse_heading, parse_image, parse_include,
};
use crate::cursor::{Cursor, Line};
use crate::error::ConvertError;
use crate::fence::{FenceOpen, FenceTracker};
use crate::footnotes::definition_extent;

/// A block read from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block<'a> {
    /// Heading with its title text (attributes removed).
    Heading {
        line: usize,
        level: u8,
        title: &'a str,
        attrs: Attributes,
    },
    /// YAML front matter between `---` lines.
    FrontMatter { line: usize, yaml: String },
    /// Code fence with the lines between its delimiters.
    Fence {
        line: usize,
        open: FenceOpen,
        body: &'a [Line<'a>],
    },
    /// Custom div with the lines between its fences.
    Div {
        line: usize,
        annotation: String,
        attrs: Attributes,
        body: &'a [Line<'a>],
    },
    /// Display math rows, optional `{#eq-id}` and prose after the closing `$$`.
    DisplayMath {
        line: usize,
        rows: Vec<&'a str>,
        id: Option<String>,
        trailing: Option<&'a str>,
    },
    /// `{{< include path >}}`.
    Include { line: usize, path: &'a str },
    /// Standalone image.
    Image {
        line: usize,
        caption: &'a str,
        source: &'a str,
        attrs: Attributes,
    },
    /// List of one marker style.
    List(ListBlock<'a>),
    /// Paragraph lines joined with single spaces.
    Paragraph { line: usize, text: String },
    /// Lines that produce no output (blank, layout, rules, footnote definitions).
    Skipped { line: usize, kind: BlockKind },
}

impl Block<'_> {
    /// Line the block starts on.
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::Heading { line, .. }
            | Self::FrontMatter { line, .. }
            | Self::Fence { line, .. }
            | Self::Div { line, .. }
            | Self::DisplayMath { line, .. }
            | Self::Include { line, .. }
            | Self::Image { line, .. }
            | Self::Paragraph { line, .. }
            | Self::Skipped { line, .. } => *line,
            Self::List(list) => list.line,
        }
    }
}

/// Marker style of a list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListStyle {
    /// `-`, `*` or `+`.
    Unordered,
    /// `1.` or `1)`.
    Ordered,
    /// `a.` or `a)`.
    Lettered,
}

impl ListStyle {
    fn of(marker: &str) -> Self {
        if marker.starts_with(['-', '*', '+']) {
            Self::Unordered
        } else if marker.starts_with(|c: char| c.is_ascii_digit()) {
            Self::Ordered
        } else {
            Self::Lettered
        }
    }
}

/// A list read from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListBlock<'a> {
    /// Line of the first item.
    pub line: usize,
    /// Marker style shared by every item.
    pub style: ListStyle,
    /// Items in order.
    pub items: Vec<ListItem<'a>>,
    /// Line of an item with a different marker style that ended the list.
    pub interrupted_at: Option<usize>,
}

/// A list item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem<'a> {
    /// Line of the marker.
    pub line: usize,
    /// Marker as written (`-`, `3.`, `b)`).
    pub marker: &'a str,
    /// Item content: the text after the marker, then continuation lines
    /// dedented to the item's content column. Nested lists stay as lines.
    pub body: Vec<Line<'a>>,
}

/// Read the block starting at the cursor.
///
/// # Errors
///
/// Returns a structural error for unterminated fences, divs or display
/// math, and for a `:::` close with no open div.
pub fn read_block<'a>(cursor: &mut Cursor<'a>) -> Result<Block<'a>, ConvertError> {
    let Some(line) = cursor.peek() else {
        return Ok(Block::Skipped {
            line: cursor.line_number(),
            kind: BlockKind::Blank,
        });
    };
    let kind = classify(&line, cursor.lookahead());

    match kind {
        BlockKind::Blank => {
            cursor.skip_blank();
            Ok(Block::Skipped {
                line: line.number,
                kind,
            })
        }
        BlockKind::Heading { .. } => {
            cursor.advance();
            Ok(read_heading(line))
        }
        BlockKind::FrontMatter => Ok(read_front_matter(cursor)),
        BlockKind::Fence => read_fence(cursor),
        BlockKind::DivOpen => read_div(cursor),
        BlockKind::DivClose => Err(ConvertError::StrayDivClose { line: line.number }),
        BlockKind::DisplayMath => read_display_math(cursor),
        BlockKind::Include => {
            cursor.advance();
            let path = parse_include(line.text.trim()).unwrap_or_default();
            Ok(Block::Include {
                line: line.number,
                path,
            })
        }
        BlockKind::Image => {
            cursor.advance();
            let (caption, source, attrs) = parse_image(line.text.trim()).unwrap_or_default();
            Ok(Block::Image {
                line: line.number,
                caption,
                source,
                attrs: Attributes::parse(attrs),
            })
        }
        BlockKind::FootnoteDefinition => {
            cursor.take(definition_extent(cursor.rest()));
            Ok(Block::Skipped {
                line: line.number,
                kind,
            })
        }
        BlockKind::Layout | BlockKind::Rule => {
            cursor.advance();
            Ok(Block::Skipped {
                line: line.number,
                kind,
            })
        }
        BlockKind::ListItem => Ok(Block::List(read_list(cursor))),
        BlockKind::Paragraph => Ok(read_paragraph(cursor)),
    }
}

fn read_heading(line: Line<'_>) -> Block<'_> {
    let (level, raw) = parse_heading(line.text.trim()).unwrap_or((2, line.text.trim()));
    let (title, attrs) = match split_trailing_attributes(raw) {
        Some((title, inner))
            if inner.trim_start().starts_with(['#', '.']) || inner.contains('=') =>
        {
            (title, Attributes::parse(inner))
        }
        _ => (raw, Attributes::default()),
    };
    Block::Heading {
        line: line.number,
        level,
        title,
        attrs,
    }
}

fn read_front_matter<'a>(cursor: &mut Cursor<'a>) -> Block<'a> {
    let line = cursor.line_number();
    cursor.advance();
    let mut yaml = String::new();
    while let Some(next) = cursor.advance() {
        if matches!(next.text.trim(), "---" | "...") {
            break;
        }
        yaml.push_str(next.text);
        yaml.push('\n');
    }
    Block::FrontMatter { line, yaml }
}

fn read_fence<'a>(cursor: &mut Cursor<'a>) -> Result<Block<'a>, ConvertError> {
    let Some(first) = cursor.advance() else {
        return Err(ConvertError::UnterminatedFence {
            line: cursor.line_number(),
            marker: String::new(),
        });
    };
    let open = FenceOpen::parse(first.text).ok_or_else(|| ConvertError::UnterminatedFence {
        line: first.number,
        marker: first.text.trim().to_owned(),
    })?;

    let rest = cursor.rest();
    let Some(close_at) = rest.iter().position(|line| open.is_closed_by(line.text)) else {
        return Err(ConvertError::UnterminatedFence {
            line: first.number,
            marker: open.marker,
        });
    };
    let body = cursor.take(close_at);
    cursor.advance();

    Ok(Block::Fence {
        line: first.number,
        open,
        body,
    })
}

/// Read a div with an explicit depth counter.
///
/// Depth goes up on every annotated `:::` line and down on every bare one;
/// lines inside code fences are ignored. The body is everything between
/// the opening line and the close that brings the depth back to zero.
fn read_div<'a>(cursor: &mut Cursor<'a>) -> Result<Block<'a>, ConvertError> {
    let Some(first) = cursor.advance() else {
        return Err(ConvertError::StrayDivClose {
            line: cursor.line_number(),
        });
    };
    let Some(DivFence::Open {
        annotation, attrs, ..
    }) = DivFence::parse(first.text)
    else {
        return Err(ConvertError::StrayDivClose { line: first.number });
    };

    let rest = cursor.rest();
    let mut depth = 1usize;
    let mut fences = FenceTracker::new();
    let mut close_at = None;

    for (idx, line) in rest.iter().enumerate() {
        if fences.update(line.text) || fences.in_fence() {
            continue;
        }
        match DivFence::parse(line.text) {
            Some(DivFence::Open { .. }) => depth += 1,
            Some(DivFence::Close { .. }) => {
                depth -= 1;
                if depth == 0 {
                    close_at = Some(idx);
                    break;
                }
            }
            None => {}
        }
    }

    let Some(close_at) = close_at else {
        return Err(ConvertError::UnterminatedDiv {
            line: first.number,
            annotation,
        });
    };
    let body = cursor.take(close_at);
    cursor.advance();

    Ok(Block::Div {
        line: first.number,
        annotation,
        attrs,
        body,
    })
}

fn read_display_math<'a>(cursor: &mut Cursor<'a>) -> Result<Block<'a>, ConvertError> {
    let Some(first) = cursor.advance() else {
        return Err(ConvertError::UnterminatedMath {
            line: cursor.line_number(),
        });
    };
    let opened = first.text.trim();
    let after_open = &opened[2..];

    // Single line: $$ … $$ {#eq-x}
    if let Some(end) = after_open.find("$$") {
        let content = after_open[..end].trim();
        let rows = if content.is_empty() { Vec::new() } else { vec![content] };
        let (id, trailing) = math_close_tail(&after_open[end + 2..]);
        return Ok(Block::DisplayMath {
            line: first.number,
            rows,
            id,
            trailing,
        });
    }

    let mut rows = Vec::new();
    if !after_open.trim().is_empty() {
        rows.push(after_open.trim());
    }
    while let Some(line) = cursor.advance() {
        let text = line.text.trim();
        if let Some(end) = text.find("$$") {
            let before = text[..end].trim();
            if !before.is_empty() {
                rows.push(before);
            }
            let (id, trailing) = math_close_tail(&text[end + 2..]);
            return Ok(Block::DisplayMath {
                line: first.number,
                rows,
                id,
                trailing,
            });
        }
        rows.push(line.text);
    }

    Err(ConvertError::UnterminatedMath { line: first.number })
}

fn read_paragraph<'a>(cursor: &mut Cursor<'a>) -> Block<'a> {
    let line = cursor.line_number();
    let mut text = String::new();
    while let Some(next) = cursor.peek() {
        if !text.is_empty() && classify(&next, cursor.lookahead()) != BlockKind::Paragraph {
            break;
        }
        if next.is_blank() {
            break;
        }
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(next.text.trim());
        cursor.advance();
    }
    Block::Paragraph { line, text }
}

/// Marker and content column of a list item line.
fn item_parts<'a>(line: &Line<'a>) -> Option<(&'a str, Line<'a>, usize)> {
    let trimmed = line.trimmed();
    let (marker, rest) = list_marker(trimmed)?;
    let content_col = line.text.len() - rest.len();
    Some((marker, Line::new(line.number, rest), content_col))
}

fn read_list<'a>(cursor: &mut Cursor<'a>) -> ListBlock<'a> {
    let first_line = cursor.line_number();
    let base_indent = cursor.peek().map_or(0, |line| line.indent());
    let mut style = None;
    let mut items: Vec<ListItem<'a>> = Vec::new();
    let mut content_col = 0;
    let mut interrupted_at = None;
    let mut after_blank = false;

    while let Some(line) = cursor.peek() {
        if line.is_blank() {
            let Some(next) = cursor.peek_non_blank() else {
                break;
            };
            let sibling = next.indent() <= base_indent + 1
                && item_parts(&next).is_some_and(|(marker, ..)| Some(ListStyle::of(marker)) == style);
            if (next.indent() >= base_indent + 2 && !items.is_empty()) || sibling {
                cursor.skip_blank();
                if !sibling && let Some(item) = items.last_mut() {
                    item.body.push(Line::new(line.number, ""));
                }
                after_blank = true;
                continue;
            }
            break;
        }

        let indent = line.indent();
        if indent <= base_indent + 1
            && let Some((marker, first, col)) = item_parts(&line)
        {
            let item_style = ListStyle::of(marker);
            match style {
                None => style = Some(item_style),
                Some(current) if current != item_style => {
                    interrupted_at = Some(line.number);
                    break;
                }
                Some(_) => {}
            }
            items.push(ListItem {
                line: line.number,
                marker,
                body: vec![first],
            });
            content_col = col;
            after_blank = false;
            cursor.advance();
            continue;
        }

        let Some(item) = items.last_mut() else {
            break;
        };
        let lazy = !after_blank
            && indent <= base_indent + 1
            && classify(&line, cursor.lookahead()) == BlockKind::Paragraph;
        if indent >= base_indent + 2 || lazy {
            item.body.push(line.dedent(content_col.min(indent)));
            cursor.advance();
            continue;
        }
        break;
    }

    // Trailing blank body lines carry no content
    for item in &mut items {
        while item.body.last().is_some_and(Line::is_blank) {
            item.body.pop();
        }
    }

    ListBlock {
        line: first_line,
        style: style.unwrap_or(ListStyle::Unordered),
        items,
        interrupted_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::split_lines;
    use pretty_assertions::assert_eq;

    fn read_all(input: &str) -> Result<Vec<String>, ConvertError> {
        let lines = split_lines(input);
        let mut cursor = Cursor::new(&lines);
        let mut kinds = Vec::new();
        while !cursor.is_done() {
            let block = read_block(&mut cursor)?;
            let name = match block {
                Block::Heading { level, .. } => format!("h{level}"),
                Block::FrontMatter { .. } => "front".to_owned(),
                Block::Fence { body, .. } => format!("fence({})", body.len()),
                Block::Div { body, .. } => format!("div({})", body.len()),
                Block::DisplayMath { rows, .. } => format!("math({})", rows.len()),
                Block::Include { .. } => "include".to_owned(),
                Block::Image { .. } => "image".to_owned(),
                Block::List(list) => format!("list({})", list.items.len()),
                Block::Paragraph { .. } => "p".to_owned(),
                Block::Skipped { .. } => continue,
            };
            kinds.push(name);
        }
        Ok(kinds)
    }

    #[test]
    fn test_block_sequence() {
        let kinds = read_all(
            "---\ntitle: T\n---\n# T\n\nIntro line\ncontinues.\n\n```{r}\nx <- 1\n```\n\n$$\na\n$$\n\n- a\n- b\n",
        )
        .unwrap();
        assert_eq!(kinds, vec!["front", "h1", "p", "fence(1)", "math(1)", "list(2)"]);
    }

    #[test]
    fn test_heading_attributes() {
        let lines = split_lines("## Section One {#sec-a .unnumbered}");
        let mut cursor = Cursor::new(&lines);
        let Block::Heading { title, attrs, .. } = read_block(&mut cursor).unwrap() else {
            panic!("expected heading");
        };
        assert_eq!(title, "Section One");
        assert_eq!(attrs.id.as_deref(), Some("sec-a"));
    }

    #[test]
    fn test_div_depth_counting_ignores_fences() {
        let input = "::: {.guidedpractice}\nQ\n::: {.callout-note}\nA\n```\n:::\n```\n:::\n:::\nafter";
        let lines = split_lines(input);
        let mut cursor = Cursor::new(&lines);
        let Block::Div { body, .. } = read_block(&mut cursor).unwrap() else {
            panic!("expected div");
        };
        assert_eq!(body.len(), 7);
        assert_eq!(cursor.peek().unwrap().text, "after");
    }

    #[test]
    fn test_unterminated_constructs() {
        assert_eq!(
            read_all("text\n\n::: {.important}\nbody\n"),
            Err(ConvertError::UnterminatedDiv {
                line: 3,
                annotation: "{.important}".to_owned()
            })
        );
        assert_eq!(
            read_all("```{r}\nx\n"),
            Err(ConvertError::UnterminatedFence {
                line: 1,
                marker: "```{r}".to_owned()
            })
        );
        assert_eq!(
            read_all("$$\nx\n"),
            Err(ConvertError::UnterminatedMath { line: 1 })
        );
        assert_eq!(read_all("a\n\n:::\n"), Err(ConvertError::StrayDivClose { line: 3 }));
    }

    #[test]
    fn test_display_math_with_id() {
        let lines = split_lines("$$\n\\bar{x} = 1\n$$ {#eq-mean}");
        let mut cursor = Cursor::new(&lines);
        let block = read_block(&mut cursor).unwrap();
        assert_eq!(
            block,
            Block::DisplayMath {
                line: 1,
                rows: vec!["\\bar{x} = 1"],
                id: Some("eq-mean".to_owned()),
                trailing: None,
            }
        );
    }

    #[test]
    fn test_list_continuation_and_nesting() {
        let lines = split_lines("1. First\n   more text\n   - nested\n\n2. Second\nlazy line\n\nAfter");
        let mut cursor = Cursor::new(&lines);
        let Block::List(list) = read_block(&mut cursor).unwrap() else {
            panic!("expected list");
        };
        assert_eq!(list.style, ListStyle::Ordered);
        assert_eq!(list.items.len(), 2);
        let first: Vec<&str> = list.items[0].body.iter().map(|l| l.text).collect();
        assert_eq!(first, vec!["First", "more text", "- nested"]);
        let second: Vec<&str> = list.items[1].body.iter().map(|l| l.text).collect();
        assert_eq!(second, vec!["Second", "lazy line"]);
        assert_eq!(cursor.peek_non_blank().unwrap().text, "After");
    }

    #[test]
    fn test_mixed_markers_interrupt_list() {
        let lines = split_lines("- a\n- b\n1. c");
        let mut cursor = Cursor::new(&lines);
        let Block::List(list) = read_block(&mut cursor).unwrap() else {
            panic!("expected list");
        };
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.interrupted_at, Some(3));
        assert_eq!(cursor.peek().unwrap().text, "1. c");
    }
}
