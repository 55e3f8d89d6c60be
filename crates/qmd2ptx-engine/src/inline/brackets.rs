//! Bracketed constructs whose contents stay source text: links
//! `[text](url)` and inline footnotes `^[text]`.
//!
//! Both may span several segments (`[the $x$ value](url)`), so they are
//! matched over a flat cell sequence rather than per text span. The opening
//! and closing tags become a scope pair that emphasis never crosses.

use super::span::{Role, Span, merge_text};

/// A character of source text or one protected markup segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Cell {
    Ch(char),
    Mark(String, Role),
}

impl Cell {
    pub(crate) fn is_char(&self, c: char) -> bool {
        matches!(self, Self::Ch(ch) if *ch == c)
    }
}

pub(crate) fn to_cells(spans: Vec<Span>) -> Vec<Cell> {
    let mut cells = Vec::new();
    for span in spans {
        match span {
            Span::Text(text) => cells.extend(text.chars().map(Cell::Ch)),
            Span::Markup { xml, role } => cells.push(Cell::Mark(xml, role)),
        }
    }
    cells
}

pub(crate) fn from_cells(cells: Vec<Cell>) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut text = String::new();
    for cell in cells {
        match cell {
            Cell::Ch(c) => text.push(c),
            Cell::Mark(xml, role) => {
                spans.push(Span::Text(std::mem::take(&mut text)));
                spans.push(Span::markup(xml, role));
            }
        }
    }
    spans.push(Span::Text(text));
    merge_text(spans)
}

/// Whether the cell at `idx` is preceded by an unescaped backslash.
fn is_escaped(cells: &[Cell], idx: usize) -> bool {
    let backslashes = cells[..idx]
        .iter()
        .rev()
        .take_while(|cell| cell.is_char('\\'))
        .count();
    backslashes % 2 == 1
}

/// Convert `[text](url)` into `<url href="url">text</url>`.
///
/// `next_scope` hands out scope ids for the emitted tag pairs.
pub(crate) fn links(spans: Vec<Span>, next_scope: &mut u32) -> Vec<Span> {
    let cells = to_cells(spans);
    let mut out: Vec<Cell> = Vec::with_capacity(cells.len());
    let mut openers: Vec<usize> = Vec::new();
    let mut i = 0;

    while i < cells.len() {
        let cell = &cells[i];
        if cell.is_char('[') && !is_escaped(&cells, i) {
            // Images are left alone
            if i == 0 || !cells[i - 1].is_char('!') {
                openers.push(out.len());
            }
            out.push(cell.clone());
            i += 1;
            continue;
        }

        if cell.is_char(']') && !is_escaped(&cells, i) {
            if let Some(open_at) = openers.pop()
                && let Some((url, end)) = link_target(&cells, i + 1)
            {
                let href = quick_xml::escape::escape(url.as_str());
                if open_at + 1 == out.len() {
                    out[open_at] = Cell::Mark(format!("<url href=\"{href}\"/>"), Role::Atom);
                } else {
                    let scope = *next_scope;
                    *next_scope += 1;
                    out[open_at] =
                        Cell::Mark(format!("<url href=\"{href}\">"), Role::Open(scope));
                    out.push(Cell::Mark("</url>".to_owned(), Role::Close(scope)));
                }
                // Brackets opened inside the link text stay literal
                openers.retain(|&pos| pos < open_at);
                i = end;
                continue;
            }
        }

        out.push(cell.clone());
        i += 1;
    }

    from_cells(out)
}

/// Parse `(url)` starting at `start`; returns the URL and the index after `)`.
fn link_target(cells: &[Cell], start: usize) -> Option<(String, usize)> {
    if !cells.get(start)?.is_char('(') {
        return None;
    }

    let mut url = String::new();
    let mut depth = 0usize;
    for (offset, cell) in cells[start + 1..].iter().enumerate() {
        match cell {
            Cell::Ch(')') if depth == 0 => {
                let url = url.trim();
                // Drop an optional link title: (url "title")
                let url = url.split_whitespace().next().unwrap_or("");
                return (!url.is_empty()).then(|| (url.to_owned(), start + offset + 2));
            }
            Cell::Ch(')') => {
                depth -= 1;
                url.push(')');
            }
            Cell::Ch('(') => {
                depth += 1;
                url.push('(');
            }
            Cell::Ch('\n') | Cell::Mark(..) => return None,
            Cell::Ch(c) => url.push(*c),
        }
    }
    None
}

/// Convert inline footnotes `^[text]` into `<fn>text</fn>`.
pub(crate) fn inline_notes(spans: Vec<Span>, next_scope: &mut u32) -> Vec<Span> {
    let cells = to_cells(spans);
    if !cells
        .windows(2)
        .any(|pair| pair[0].is_char('^') && pair[1].is_char('['))
    {
        return from_cells(cells);
    }

    let mut out: Vec<Cell> = Vec::with_capacity(cells.len());
    // (position in `out`, is a footnote opener)
    let mut openers: Vec<(usize, bool)> = Vec::new();

    for (i, cell) in cells.iter().enumerate() {
        if cell.is_char('[') && !is_escaped(&cells, i) {
            let note = i > 0 && cells[i - 1].is_char('^');
            openers.push((out.len(), note));
        } else if cell.is_char(']') && !is_escaped(&cells, i) {
            if let Some((open_at, true)) = openers.pop() {
                let scope = *next_scope;
                *next_scope += 1;
                // Replace the `^` before the bracket with the opening tag
                out[open_at - 1] = Cell::Mark("<fn>".to_owned(), Role::Open(scope));
                out.remove(open_at);
                out.push(Cell::Mark("</fn>".to_owned(), Role::Close(scope)));
                continue;
            }
        }
        out.push(cell.clone());
    }

    from_cells(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_simple_link() {
        let mut scope = 0;
        let spans = links(vec![Span::text("see [the docs](https://a.org/x?a=1&b=2).")], &mut scope);
        assert_eq!(
            spans,
            vec![
                Span::text("see "),
                Span::markup(
                    "<url href=\"https://a.org/x?a=1&amp;b=2\">",
                    Role::Open(0)
                ),
                Span::text("the docs"),
                Span::markup("</url>", Role::Close(0)),
                Span::text("."),
            ]
        );
    }

    #[test]
    fn test_link_text_spans_markup() {
        let mut scope = 3;
        let spans = links(
            vec![
                Span::text("[value "),
                Span::atom("<m>x</m>"),
                Span::text("](https://x.org)"),
            ],
            &mut scope,
        );
        assert_eq!(spans.len(), 4);
        assert_eq!(spans[1], Span::text("value "));
        assert_eq!(scope, 4);
    }

    #[test]
    fn test_brackets_without_target_are_literal() {
        let mut scope = 0;
        let input = "an interval [0, 1] and ![img](a.png)";
        let spans = links(vec![Span::text(input)], &mut scope);
        assert_eq!(spans, vec![Span::text(input)]);
    }

    #[test]
    fn test_empty_link_text() {
        let mut scope = 0;
        let spans = links(vec![Span::text("[](https://x.org)")], &mut scope);
        assert_eq!(spans, vec![Span::atom("<url href=\"https://x.org\"/>")]);
    }

    #[test]
    fn test_inline_note_with_nested_brackets() {
        let mut scope = 0;
        let spans = inline_notes(vec![Span::text("Fact^[See [1] too.] here")], &mut scope);
        assert_eq!(
            spans,
            vec![
                Span::text("Fact"),
                Span::markup("<fn>", Role::Open(0)),
                Span::text("See [1] too."),
                Span::markup("</fn>", Role::Close(0)),
                Span::text(" here"),
            ]
        );
    }
}
