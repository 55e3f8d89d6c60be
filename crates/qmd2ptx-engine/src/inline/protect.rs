//! Rules that protect content from every later rule: existing target
//! markup, math and code.

use std::sync::LazyLock;

use regex::Regex;

use super::span::{Span, escape_content, escape_text, map_text};
use crate::warning::{Diagnostics, WarningKind};

/// Target-dialect elements that may already be present in source text.
const PASSTHROUGH_TAGS: &[&str] = &[
    "m", "me", "c", "alert", "em", "term", "idx", "url", "fn", "q", "xref", "foreign",
];

static PASSTHROUGH_RE: LazyLock<Regex> = LazyLock::new(|| {
    let names = PASSTHROUGH_TAGS.join("|");
    let paired = PASSTHROUGH_TAGS
        .iter()
        .map(|tag| format!(r"<{tag}(?:\s[^<>]*)?>.*?</{tag}>"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"<(?:{names})(?:\s[^<>]*)?/>|{paired}")).unwrap()
});

/// One target tag (open, close or self-closing) inside a protected match.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    let names = PASSTHROUGH_TAGS.join("|");
    Regex::new(&format!(r"</?(?:{names})(?:\s[^<>]*?)?/?>")).unwrap()
});

/// Protect target markup already present in the text.
pub(crate) fn passthrough(spans: Vec<Span>) -> Vec<Span> {
    map_text(spans, |text, out| {
        let mut last = 0;
        for m in PASSTHROUGH_RE.find_iter(text) {
            out.push(Span::text(&text[last..m.start()]));
            out.push(Span::atom(escape_fragment(m.as_str())));
            last = m.end();
        }
        out.push(Span::text(&text[last..]));
    })
}

/// Escape bare `<` and `&` in a markup fragment, keeping its tags and any
/// entity references.
fn escape_fragment(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut last = 0;
    for tag in TAG_RE.find_iter(fragment) {
        out.push_str(&escape_text(&fragment[last..tag.start()]));
        let inner = &tag.as_str()[1..tag.len() - 1];
        out.push('<');
        out.push_str(&escape_text(inner));
        out.push('>');
        last = tag.end();
    }
    out.push_str(&escape_text(&fragment[last..]));
    out
}

/// Protect `$…$` and `$$…$$` as `<m>` and `<me>`.
pub(crate) fn math(spans: Vec<Span>, diagnostics: &mut Diagnostics) -> Vec<Span> {
    map_text(spans, |text, out| split_math(text, out, diagnostics))
}

fn split_math(text: &str, out: &mut Vec<Span>, diagnostics: &mut Diagnostics) {
    let bytes = text.as_bytes();
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'$' if bytes.get(i + 1) == Some(&b'$') => {
                if let Some(end) = find_display_close(bytes, i + 2) {
                    out.push(Span::text(&text[last..i]));
                    let content = text[i + 2..end].trim();
                    out.push(Span::atom(format!("<me>{}</me>", escape_content(content))));
                    i = end + 2;
                    last = i;
                } else {
                    diagnostics.warn(WarningKind::UnbalancedInline, "unmatched `$$`");
                    i += 2;
                }
            }
            b'$' => match find_inline_close(bytes, i + 1) {
                Ok(end) => {
                    out.push(Span::text(&text[last..i]));
                    out.push(Span::atom(format!(
                        "<m>{}</m>",
                        escape_content(&text[i + 1..end])
                    )));
                    i = end + 1;
                    last = i;
                }
                Err(refused) => {
                    if bytes.get(i + 1).is_some_and(|b| !b.is_ascii_whitespace()) {
                        diagnostics.warn(WarningKind::UnbalancedInline, "unmatched `$`");
                    }
                    // A closer refused for the digit after it is part of this run
                    i = refused.map_or(i + 1, |j| j + 1);
                }
            },
            _ => i += 1,
        }
    }

    if last < text.len() {
        out.push(Span::text(&text[last..]));
    }
}

fn find_display_close(bytes: &[u8], start: usize) -> Option<usize> {
    let mut j = start;
    while j + 1 < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'$' if bytes[j + 1] == b'$' => return Some(j),
            _ => j += 1,
        }
    }
    None
}

/// Find the `$` closing inline math opened just before `start`.
///
/// The opener must be followed by a non-space; the closer must be preceded
/// by a non-space and not followed by a digit. On failure, returns the
/// first closer refused only because a digit follows it.
fn find_inline_close(bytes: &[u8], start: usize) -> Result<usize, Option<usize>> {
    match bytes.get(start) {
        None | Some(b'$') => return Err(None),
        Some(b) if b.is_ascii_whitespace() => return Err(None),
        Some(_) => {}
    }

    let mut refused = None;
    let mut j = start;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'$' => {
                let after_space = bytes[j - 1].is_ascii_whitespace();
                let before_digit = bytes.get(j + 1).is_some_and(u8::is_ascii_digit);
                if j > start && !after_space {
                    if !before_digit {
                        return Ok(j);
                    }
                    refused = refused.or(Some(j));
                }
                j += 1;
            }
            _ => j += 1,
        }
    }
    Err(refused)
}

/// Protect backtick code spans as `<c>`.
pub(crate) fn code(spans: Vec<Span>) -> Vec<Span> {
    map_text(spans, split_code)
}

fn split_code(text: &str, out: &mut Vec<Span>) {
    let bytes = text.as_bytes();
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let n = run_length(bytes, i);
        match find_closing_run(bytes, i + n, n) {
            Some(end) => {
                out.push(Span::text(&text[last..i]));
                let mut content = &text[i + n..end];
                if content.len() > 2
                    && content.starts_with(' ')
                    && content.ends_with(' ')
                    && !content.trim().is_empty()
                {
                    content = &content[1..content.len() - 1];
                }
                out.push(Span::atom(format!("<c>{}</c>", escape_content(content))));
                i = end + n;
                last = i;
            }
            None => i += n,
        }
    }

    if last < text.len() {
        out.push(Span::text(&text[last..]));
    }
}

fn run_length(bytes: &[u8], start: usize) -> usize {
    bytes[start..].iter().take_while(|&&b| b == b'`').count()
}

fn find_closing_run(bytes: &[u8], start: usize, n: usize) -> Option<usize> {
    let mut j = start;
    while j < bytes.len() {
        if bytes[j] == b'`' {
            let m = run_length(bytes, j);
            if m == n {
                return Some(j);
            }
            j += m;
        } else {
            j += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn math_of(text: &str) -> (Vec<Span>, usize) {
        let mut diagnostics = Diagnostics::new();
        let spans = math(vec![Span::text(text)], &mut diagnostics);
        (spans, diagnostics.into_warnings().len())
    }

    #[test]
    fn test_passthrough_protects_existing_markup() {
        let spans = passthrough(vec![Span::text(
            "see <xref ref=\"fig-a\"/> and <m>x_1</m> here",
        )]);
        assert_eq!(
            spans,
            vec![
                Span::text("see "),
                Span::atom("<xref ref=\"fig-a\"/>"),
                Span::text(" and "),
                Span::atom("<m>x_1</m>"),
                Span::text(" here"),
            ]
        );
    }

    #[test]
    fn test_passthrough_escapes_bare_text() {
        let spans = passthrough(vec![Span::text(
            "<em>R&D</em>, <m>a < b</m> and <url href=\"https://a.org/?x=1&y=2\"><em>A&amp;B</em></url>",
        )]);
        assert_eq!(
            spans,
            vec![
                Span::atom("<em>R&amp;D</em>"),
                Span::text(", "),
                Span::atom("<m>a &lt; b</m>"),
                Span::text(" and "),
                Span::atom("<url href=\"https://a.org/?x=1&amp;y=2\"><em>A&amp;B</em></url>"),
            ]
        );
    }

    #[test]
    fn test_inline_math() {
        let (spans, warnings) = math_of("the mean $\\bar{x} < 2$ is small");
        assert_eq!(warnings, 0);
        assert_eq!(spans[1], Span::atom("<m>\\bar{x} &lt; 2</m>"));
    }

    #[test]
    fn test_display_math_inline() {
        let (spans, _) = math_of("so $$ a + b $$ holds");
        assert_eq!(spans[1], Span::atom("<me>a + b</me>"));
    }

    #[test]
    fn test_currency_is_not_math() {
        let (spans, warnings) = math_of("costs $5 and $10 each");
        assert_eq!(spans, vec![Span::text("costs $5 and $10 each")]);
        // Opening `$5` has no valid closer
        assert_eq!(warnings, 2);

        let (spans, warnings) = math_of("between $ 5 and $ 6");
        assert_eq!(spans.len(), 1);
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_escaped_dollar_is_not_delimiter() {
        let (spans, warnings) = math_of(r"pay \$3 or $x$");
        assert_eq!(warnings, 0);
        assert_eq!(spans[0], Span::text(r"pay \$3 or "));
        assert_eq!(spans[1], Span::atom("<m>x</m>"));
    }

    #[test]
    fn test_closing_dollar_followed_by_digit() {
        let (spans, warnings) = math_of("$a$1 more");
        assert_eq!(spans, vec![Span::text("$a$1 more")]);
        assert_eq!(warnings, 1);
    }

    #[test]
    fn test_code_spans() {
        let spans = code(vec![Span::text("call `f(x) < 1` or ``a`b``")]);
        assert_eq!(
            spans,
            vec![
                Span::text("call "),
                Span::atom("<c>f(x) &lt; 1</c>"),
                Span::text(" or "),
                Span::atom("<c>a`b</c>"),
            ]
        );
    }

    #[test]
    fn test_unmatched_backticks_literal() {
        let spans = code(vec![Span::text("a ``b` c")]);
        assert_eq!(spans, vec![Span::text("a ``b` c")]);
    }
}
