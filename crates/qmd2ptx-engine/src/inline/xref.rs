//! Cross-references and final escape handling.

use std::sync::LazyLock;

use regex::Regex;

use super::notes::xref;
use super::span::{Span, map_text};

static LAYOUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\\(?:[vh]space\*?\{[^}]*\}|(?:clearpage|newpage|pagebreak|vfill|noindent|medskip|bigskip|smallskip)\b)",
    )
    .unwrap()
});

static ESCAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([!-/:-@\[-`{-~])").unwrap());

/// Matches `@kind-id` cross-references for a configured set of kinds.
#[derive(Debug, Clone)]
pub(crate) struct CrossRefMatcher {
    prefixes: Vec<String>,
    /// Bracketed and bare patterns; `None` when no kinds are configured.
    patterns: Option<(Regex, Regex)>,
}

impl CrossRefMatcher {
    pub(crate) fn new(prefixes: &[String]) -> Self {
        Self {
            prefixes: prefixes.to_vec(),
            patterns: build_patterns(prefixes),
        }
    }

    /// Whether a citation key names a cross-reference target.
    pub(crate) fn is_xref_key(&self, key: &str) -> bool {
        key.split_once('-')
            .is_some_and(|(kind, id)| !id.is_empty() && self.prefixes.iter().any(|p| p == kind))
    }

    /// Replace `[Chapter -@sec-x]`, `-@fig-a` and `@tbl-b` references.
    pub(crate) fn apply(&self, spans: Vec<Span>) -> Vec<Span> {
        let Some((bracketed, bare)) = &self.patterns else {
            return spans;
        };
        let spans = replace_refs(spans, bracketed);
        replace_refs(spans, bare)
    }
}

fn build_patterns(prefixes: &[String]) -> Option<(Regex, Regex)> {
    if prefixes.is_empty() {
        return None;
    }
    let kinds = prefixes
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    let id = format!(r"(?:{kinds})-[\w:-]*\w");
    let bracketed = Regex::new(&format!(r"\[([^\[\]@]*?)(-?)@({id})\]")).ok()?;
    let bare = Regex::new(&format!(r"(^|[^\w@\\])(-?)@({id})")).ok()?;
    Some((bracketed, bare))
}

/// Both patterns capture leading text, the `-` flag and the target id.
fn replace_refs(spans: Vec<Span>, pattern: &Regex) -> Vec<Span> {
    map_text(spans, |text, out| {
        let mut last = 0;
        for caps in pattern.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            out.push(Span::text(&text[last..whole.start()]));
            out.push(Span::text(&caps[1]));
            out.push(Span::atom(xref(&caps[3], !caps[2].is_empty())));
            last = whole.end();
        }
        out.push(Span::text(&text[last..]));
    })
}

/// Strip inline layout commands and resolve backslash escapes.
pub(crate) fn escapes(spans: Vec<Span>) -> Vec<Span> {
    map_text(spans, |text, out| {
        if !text.contains('\\') {
            out.push(Span::text(text));
            return;
        }
        let stripped = LAYOUT_RE.replace_all(text, "");
        out.push(Span::text(ESCAPE_RE.replace_all(&stripped, "$1")));
    })
}
