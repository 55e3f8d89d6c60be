//! Tagged segments of a partially transformed inline run.

use std::borrow::Cow;

/// What an emitted markup segment means to later rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Self-contained markup (`<m>`, `<c>`, `<xref/>`, `<fn>…</fn>`).
    Atom,
    /// An `<idx>` entry; strong emphasis right before it becomes `<term>`.
    Index,
    /// Opening tag of a scope whose contents are still source text.
    Open(u32),
    /// Closing tag of the scope with the same id.
    Close(u32),
}

/// One segment of an inline run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Span {
    /// Source text still eligible for rules.
    Text(String),
    /// Target markup, already escaped, never touched again.
    Markup {
        /// Serialized XML.
        xml: String,
        /// Meaning for later rules.
        role: Role,
    },
}

impl Span {
    pub(crate) fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub(crate) fn atom(xml: impl Into<String>) -> Self {
        Self::Markup {
            xml: xml.into(),
            role: Role::Atom,
        }
    }

    pub(crate) fn markup(xml: impl Into<String>, role: Role) -> Self {
        Self::Markup {
            xml: xml.into(),
            role,
        }
    }
}

/// Rewrite every text span with `f`, keeping markup untouched.
///
/// `f` pushes the replacement segments for one text span.
pub(crate) fn map_text<F>(spans: Vec<Span>, mut f: F) -> Vec<Span>
where
    F: FnMut(&str, &mut Vec<Span>),
{
    let mut out = Vec::with_capacity(spans.len());
    for span in spans {
        match span {
            Span::Text(text) => f(&text, &mut out),
            markup @ Span::Markup { .. } => out.push(markup),
        }
    }
    merge_text(out)
}

/// Join adjacent text spans and drop empty ones.
pub(crate) fn merge_text(spans: Vec<Span>) -> Vec<Span> {
    let mut out: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        match span {
            Span::Text(text) if text.is_empty() => {}
            Span::Text(text) => {
                if let Some(Span::Text(prev)) = out.last_mut() {
                    prev.push_str(&text);
                } else {
                    out.push(Span::Text(text));
                }
            }
            markup @ Span::Markup { .. } => out.push(markup),
        }
    }
    out
}

/// Serialize segments: markup verbatim, text escaped.
pub(crate) fn render(spans: &[Span]) -> String {
    let mut out = String::new();
    for span in spans {
        match span {
            Span::Text(text) => out.push_str(&escape_text(text)),
            Span::Markup { xml, .. } => out.push_str(xml),
        }
    }
    out
}

/// Escape `<`, `>` and `&`, leaving existing entity references intact.
pub(crate) fn escape_text(text: &str) -> Cow<'_, str> {
    if !text.contains(['<', '>', '&']) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 8);
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&quick_xml::escape::partial_escape(&rest[..pos]));
        let tail = &rest[pos..];
        let entity_len = entity_reference_len(tail);
        if entity_len > 0 {
            out.push_str(&tail[..entity_len]);
            rest = &tail[entity_len..];
        } else {
            out.push_str("&amp;");
            rest = &tail[1..];
        }
    }
    out.push_str(&quick_xml::escape::partial_escape(rest));
    Cow::Owned(out)
}

/// Length of an entity reference (`&amp;`, `&#38;`, `&#x26;`) at the start.
fn entity_reference_len(s: &str) -> usize {
    let Some(body) = s.strip_prefix('&') else {
        return 0;
    };
    let Some(end) = body.find(';') else {
        return 0;
    };
    let name = &body[..end];
    let valid = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit())
    } else if let Some(dec) = name.strip_prefix('#') {
        !dec.is_empty() && dec.chars().all(|c| c.is_ascii_digit())
    } else {
        name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            && name.chars().all(|c| c.is_ascii_alphanumeric())
    };
    if valid { end + 2 } else { 0 }
}

/// Escape math or code content for element text.
pub(crate) fn escape_content(text: &str) -> Cow<'_, str> {
    quick_xml::escape::partial_escape(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_text_preserves_entities() {
        assert_eq!(escape_text("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(escape_text("R&amp;D &#169; &#x2014;"), "R&amp;D &#169; &#x2014;");
        assert_eq!(escape_text("AT&T and & more;"), "AT&amp;T and &amp; more;");
        assert!(matches!(escape_text("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_merge_text_joins_neighbours() {
        let spans = merge_text(vec![
            Span::text("a"),
            Span::text(""),
            Span::text("b"),
            Span::atom("<m>x</m>"),
            Span::text("c"),
        ]);
        assert_eq!(
            spans,
            vec![Span::text("ab"), Span::atom("<m>x</m>"), Span::text("c")]
        );
    }

    #[test]
    fn test_render_escapes_text_only() {
        let spans = vec![Span::text("x < y "), Span::atom("<m>x &lt; y</m>")];
        assert_eq!(render(&spans), "x &lt; y <m>x &lt; y</m>");
    }
}
