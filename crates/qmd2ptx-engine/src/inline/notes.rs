//! Citations, footnote markers and index entries.

use std::sync::LazyLock;

use regex::Regex;

use super::span::{Role, Span, escape_content, map_text};
use crate::profile::CitationPolicy;

static CITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(\s*-?@[\w][\w:.#$%&+?<>~/-]*[^;\[\]@]*(?:;\s*-?@[\w][\w:.#$%&+?<>~/-]*[^;\[\]@]*)*)\]")
        .unwrap()
});

static CITATION_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(-?)@([\w][\w:.#$%&+?<>~/-]*)").unwrap());

static FOOTNOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\^([^\]\s]+)\]").unwrap());

static INDEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\index\{((?:[^{}]|\{[^{}]*\})*)\}").unwrap());

/// Format one cross-reference; `-@` suppresses the type name.
pub(crate) fn xref(key: &str, suppressed: bool) -> String {
    let key = quick_xml::escape::escape(key);
    if suppressed {
        format!("<xref ref=\"{key}\" text=\"global\"/>")
    } else {
        format!("<xref ref=\"{key}\"/>")
    }
}

/// Resolve `[@key]` and `[@a; @b]` groups.
///
/// Keys that look like cross-references always become `<xref>`; other
/// bibliography keys follow `policy`.
pub(crate) fn citations<F>(spans: Vec<Span>, policy: CitationPolicy, is_xref_key: F) -> Vec<Span>
where
    F: Fn(&str) -> bool,
{
    map_text(spans, |text, out| {
        let mut last = 0;
        for caps in CITATION_RE.captures_iter(text) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let refs: Vec<String> = CITATION_KEY_RE
                .captures_iter(inner.as_str())
                .filter_map(|key_caps| {
                    let suppressed = !key_caps[1].is_empty();
                    let key = key_caps[2].trim_end_matches(['.', ':', ',']);
                    (is_xref_key(key) || policy == CitationPolicy::Xref)
                        .then(|| xref(key, suppressed))
                })
                .collect();

            let before = &text[last..whole.start()];
            if refs.is_empty() {
                out.push(Span::text(before.trim_end()));
            } else {
                out.push(Span::text(before));
                out.push(Span::atom(refs.join(", ")));
            }
            last = whole.end();
        }
        out.push(Span::text(&text[last..]));
    })
}

/// Replace `[^id]` markers; `resolve` returns the rendered note body.
pub(crate) fn footnotes<F>(spans: Vec<Span>, mut resolve: F) -> Vec<Span>
where
    F: FnMut(&str) -> Option<String>,
{
    map_text(spans, |text, out| {
        let mut last = 0;
        for caps in FOOTNOTE_RE.captures_iter(text) {
            let (Some(whole), Some(id)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push(Span::text(&text[last..whole.start()]));
            if let Some(body) = resolve(id.as_str()) {
                out.push(Span::atom(format!("<fn>{body}</fn>")));
            }
            last = whole.end();
        }
        out.push(Span::text(&text[last..]));
    })
}

/// Convert `\index{a!b}` into `<idx><h>a</h><h>b</h></idx>`.
pub(crate) fn index(spans: Vec<Span>) -> Vec<Span> {
    map_text(spans, |text, out| {
        let mut last = 0;
        for caps in INDEX_RE.captures_iter(text) {
            let (Some(whole), Some(entry)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push(Span::text(&text[last..whole.start()]));
            out.push(Span::markup(index_entry(entry.as_str()), Role::Index));
            last = whole.end();
        }
        out.push(Span::text(&text[last..]));
    })
}

fn index_entry(entry: &str) -> String {
    // `|see{…}` and other page formats have no counterpart
    let entry = entry.split('|').next().unwrap_or(entry);
    let mut xml = String::from("<idx>");
    for level in entry.split('!') {
        // `sort@display`
        let display = level.rsplit('@').next().unwrap_or(level).trim();
        xml.push_str("<h>");
        xml.push_str(&escape_content(display));
        xml.push_str("</h>");
    }
    xml.push_str("</idx>");
    xml
}
