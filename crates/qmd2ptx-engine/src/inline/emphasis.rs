//! Emphasis resolution with a delimiter stack.
//!
//! Runs of `*` or `_` are classified as left/right flanking the way
//! `CommonMark` does, then closers are matched against the nearest
//! compatible opener. Strong delimiters (length two) are consumed before
//! single ones, so `**` is never split into two `<em>`s. Delimiters only
//! match within the same scope: emphasis cannot cross a link or footnote
//! boundary.

use super::brackets::{Cell, from_cells, to_cells};
use super::span::{Role, Span};
use crate::warning::{Diagnostics, WarningKind};

#[derive(Debug)]
struct Delimiter {
    ch: char,
    /// Index of the first cell of the run.
    start: usize,
    /// Original run length.
    len: usize,
    /// Cells still unmatched on the opener side (counted from `start`).
    remaining: usize,
    /// Cells consumed from the front of the run when closing.
    closed: usize,
    can_open: bool,
    can_close: bool,
    scope: Option<u32>,
}

impl Delimiter {
    fn unmatched(&self) -> usize {
        self.remaining - self.closed
    }

    /// Intraword `_` is literal and never worth a warning.
    fn warns_when_unmatched(&self) -> bool {
        (self.can_open || self.can_close) && !(self.ch == '_' && self.can_open && self.can_close)
    }
}

/// What a character looks like to the flanking rules.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Class {
    Whitespace,
    Punctuation,
    Other,
}

fn classify(cell: Option<&Cell>) -> Class {
    match cell {
        None => Class::Whitespace,
        Some(Cell::Ch(c)) if c.is_whitespace() => Class::Whitespace,
        Some(Cell::Ch(c)) if c.is_ascii_punctuation() || (!c.is_alphanumeric() && !c.is_ascii()) => {
            Class::Punctuation
        }
        Some(Cell::Mark(_, Role::Open(_) | Role::Close(_))) => Class::Punctuation,
        Some(_) => Class::Other,
    }
}

/// Resolve `*`/`_` emphasis into `<alert>`, `<term>` and `<em>`.
pub(crate) fn emphasis(spans: Vec<Span>, diagnostics: &mut Diagnostics) -> Vec<Span> {
    if !spans
        .iter()
        .any(|span| matches!(span, Span::Text(t) if t.contains(['*', '_'])))
    {
        return spans;
    }

    let cells = to_cells(spans);
    let mut delimiters = scan_delimiters(&cells);
    // Tags inserted before the cell at each index
    let mut before: Vec<Vec<String>> = vec![Vec::new(); cells.len() + 1];

    for closer_idx in 0..delimiters.len() {
        if !delimiters[closer_idx].can_close {
            continue;
        }
        loop {
            if delimiters[closer_idx].unmatched() == 0 {
                break;
            }
            let Some(opener_idx) = find_opener(&delimiters, closer_idx) else {
                break;
            };

            let use_len = if delimiters[opener_idx].unmatched() >= 2
                && delimiters[closer_idx].unmatched() >= 2
            {
                2
            } else {
                1
            };

            let closer = &delimiters[closer_idx];
            let (open_tag, close_tag) = if use_len == 2 {
                let after = closer.start + closer.len;
                if matches!(cells.get(after), Some(Cell::Mark(_, Role::Index))) {
                    ("<term>", "</term>")
                } else {
                    ("<alert>", "</alert>")
                }
            } else {
                ("<em>", "</em>")
            };

            let close_at = closer.start + closer.closed;
            before[close_at].push(close_tag.to_owned());
            delimiters[closer_idx].closed += use_len;

            let opener = &mut delimiters[opener_idx];
            opener.remaining -= use_len;
            before[opener.start + opener.remaining].push(open_tag.to_owned());

            // Openers between the pair can no longer match
            for between in &mut delimiters[opener_idx + 1..closer_idx] {
                between.can_open = false;
            }
        }
    }

    for delim in &delimiters {
        if delim.unmatched() > 0 && delim.warns_when_unmatched() {
            diagnostics.warn(
                WarningKind::UnbalancedInline,
                format!("unmatched `{}`", delim.ch.to_string().repeat(delim.unmatched())),
            );
        }
    }

    build(cells, &delimiters, before)
}

fn scan_delimiters(cells: &[Cell]) -> Vec<Delimiter> {
    let mut delimiters = Vec::new();
    let mut scopes: Vec<u32> = Vec::new();
    let mut i = 0;

    while i < cells.len() {
        match &cells[i] {
            Cell::Mark(_, Role::Open(id)) => {
                scopes.push(*id);
                i += 1;
            }
            Cell::Mark(_, Role::Close(_)) => {
                scopes.pop();
                i += 1;
            }
            Cell::Ch(ch @ ('*' | '_')) => {
                let ch = *ch;
                let escaped = i > 0 && cells[i - 1].is_char('\\');
                let len = cells[i..].iter().take_while(|c| c.is_char(ch)).count();
                if !escaped {
                    let prev = classify(i.checked_sub(1).and_then(|p| cells.get(p)));
                    let next = classify(cells.get(i + len));
                    let left = next != Class::Whitespace
                        && (next != Class::Punctuation || prev != Class::Other);
                    let right = prev != Class::Whitespace
                        && (prev != Class::Punctuation || next != Class::Other);
                    let (can_open, can_close) = if ch == '*' {
                        (left, right)
                    } else {
                        (
                            left && (!right || prev == Class::Punctuation),
                            right && (!left || next == Class::Punctuation),
                        )
                    };
                    delimiters.push(Delimiter {
                        ch,
                        start: i,
                        len,
                        remaining: len,
                        closed: 0,
                        can_open,
                        can_close,
                        scope: scopes.last().copied(),
                    });
                }
                i += len;
            }
            _ => i += 1,
        }
    }
    delimiters
}

fn find_opener(delimiters: &[Delimiter], closer_idx: usize) -> Option<usize> {
    let closer = &delimiters[closer_idx];
    (0..closer_idx).rev().find(|&idx| {
        let opener = &delimiters[idx];
        if opener.ch != closer.ch
            || !opener.can_open
            || opener.scope != closer.scope
            || opener.unmatched() == 0
        {
            return false;
        }
        // Rule of three for runs that can both open and close
        let both = (opener.can_open && opener.can_close) || (closer.can_open && closer.can_close);
        let sum = opener.len + closer.len;
        !(both && sum % 3 == 0 && !(opener.len % 3 == 0 && closer.len % 3 == 0))
    })
}

fn build(cells: Vec<Cell>, delimiters: &[Delimiter], mut before: Vec<Vec<String>>) -> Vec<Span> {
    let mut consumed = vec![false; cells.len()];
    for delim in delimiters {
        // Opener side consumed from the inner end, closer side from the front
        consumed[delim.start + delim.remaining..delim.start + delim.len].fill(true);
        consumed[delim.start..delim.start + delim.closed].fill(true);
    }

    let mut out = Vec::with_capacity(cells.len());
    let tail = before.pop().unwrap_or_default();
    for ((cell, tags), used) in cells.into_iter().zip(before).zip(consumed) {
        out.extend(tags.into_iter().map(|tag| Cell::Mark(tag, Role::Atom)));
        if !used {
            out.push(cell);
        }
    }
    out.extend(tail.into_iter().map(|tag| Cell::Mark(tag, Role::Atom)));
    from_cells(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inline::span::render;
    use pretty_assertions::assert_eq;

    fn emph(text: &str) -> (String, usize) {
        let mut diagnostics = Diagnostics::new();
        let spans = emphasis(vec![Span::text(text)], &mut diagnostics);
        (render(&spans), diagnostics.into_warnings().len())
    }

    #[test]
    fn test_strong_and_emphasis() {
        assert_eq!(emph("a **bold** and *it* word").0, "a <alert>bold</alert> and <em>it</em> word");
        assert_eq!(emph("__b__ and _i_").0, "<alert>b</alert> and <em>i</em>");
    }

    #[test]
    fn test_nested_strong_inside_emphasis() {
        assert_eq!(emph("*an **x** y*").0, "<em>an <alert>x</alert> y</em>");
        assert_eq!(emph("***both***").0, "<em><alert>both</alert></em>");
    }

    #[test]
    fn test_intraword_underscore_literal() {
        let (out, warnings) = emph("snake_case_name and x_1");
        assert_eq!(out, "snake_case_name and x_1");
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_arithmetic_star_literal() {
        let (out, warnings) = emph("5 * 3 = 15");
        assert_eq!(out, "5 * 3 = 15");
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_unbalanced_warns_and_passes_through() {
        let (out, warnings) = emph("an **open strong");
        assert_eq!(out, "an **open strong");
        assert_eq!(warnings, 1);
    }

    #[test]
    fn test_strong_before_index_is_term() {
        let mut diagnostics = Diagnostics::new();
        let spans = emphasis(
            vec![
                Span::text("a **median**"),
                Span::markup("<idx><h>median</h></idx>", Role::Index),
                Span::text(" is"),
            ],
            &mut diagnostics,
        );
        assert_eq!(
            render(&spans),
            "a <term>median</term><idx><h>median</h></idx> is"
        );
    }

    #[test]
    fn test_emphasis_does_not_cross_scope() {
        let mut diagnostics = Diagnostics::new();
        let spans = emphasis(
            vec![
                Span::text("*a "),
                Span::markup("<url href=\"u\">", Role::Open(0)),
                Span::text("b* c"),
                Span::markup("</url>", Role::Close(0)),
            ],
            &mut diagnostics,
        );
        assert_eq!(render(&spans), "*a <url href=\"u\">b* c</url>");
        assert_eq!(diagnostics.into_warnings().len(), 2);
    }

    #[test]
    fn test_emphasis_inside_scope() {
        let mut diagnostics = Diagnostics::new();
        let spans = emphasis(
            vec![
                Span::markup("<url href=\"u\">", Role::Open(0)),
                Span::text("**go**"),
                Span::markup("</url>", Role::Close(0)),
            ],
            &mut diagnostics,
        );
        assert_eq!(render(&spans), "<url href=\"u\"><alert>go</alert></url>");
    }
}
