//! Inline text transformer.
//!
//! Maps a run of source text to target markup through an explicit, ordered
//! list of rules ([`INLINE_RULES`]). Text is held as a list of tagged
//! segments ([`Span`]): a rule only ever rewrites `Text` segments, and the
//! markup it emits is never seen by later rules. That is what keeps math
//! and code content byte-identical and makes the transform idempotent on
//! already converted text.
//!
//! # Example
//!
//! ```
//! use qmd2ptx_engine::{InlineTransformer, Profile};
//!
//! let profile = Profile::chapter();
//! let transformer = InlineTransformer::new(&profile);
//! assert_eq!(
//!     transformer.transform("**Mean** of $x_i$, see @fig-a"),
//!     r#"<alert>Mean</alert> of <m>x_i</m>, see <xref ref="fig-a"/>"#
//! );
//! ```

mod brackets;
mod emphasis;
mod notes;
mod protect;
pub(crate) mod span;
mod xref;

use std::fmt;

pub use span::{Role, Span};

use crate::footnotes::Footnotes;
use crate::profile::{CitationPolicy, Profile};
use crate::warning::{Diagnostics, Warning, WarningKind};
use xref::CrossRefMatcher;

/// Footnotes nested deeper than this are dropped.
const MAX_NOTE_DEPTH: usize = 2;

/// One step of the inline pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InlineRule {
    /// Protect target markup already present in the input.
    Passthrough,
    /// `$…$` → `<m>`, `$$…$$` → `<me>`.
    Math,
    /// Backtick spans → `<c>`.
    Code,
    /// Citations, footnote markers, inline footnotes and index entries.
    Notes,
    /// `[text](url)` → `<url>`.
    Links,
    /// `**strong**` → `<alert>`/`<term>`, `*emphasis*` → `<em>`.
    Emphasis,
    /// `@kind-id` → `<xref>`.
    CrossReferences,
    /// `\$` → `$`, inline layout commands stripped.
    Escapes,
}

impl fmt::Display for InlineRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Passthrough => "passthrough",
            Self::Math => "math",
            Self::Code => "code",
            Self::Notes => "notes",
            Self::Links => "links",
            Self::Emphasis => "emphasis",
            Self::CrossReferences => "cross-references",
            Self::Escapes => "escapes",
        };
        f.write_str(name)
    }
}

/// Rules in application order. Rendering the segments is the final step.
pub const INLINE_RULES: [InlineRule; 8] = [
    InlineRule::Passthrough,
    InlineRule::Math,
    InlineRule::Code,
    InlineRule::Notes,
    InlineRule::Links,
    InlineRule::Emphasis,
    InlineRule::CrossReferences,
    InlineRule::Escapes,
];

/// Mutable state of one transform call.
struct RunState<'d> {
    diagnostics: &'d mut Diagnostics,
    next_scope: u32,
    depth: usize,
}

/// Transforms inline source text into target markup.
#[derive(Debug, Clone)]
pub struct InlineTransformer<'a> {
    citations: CitationPolicy,
    xrefs: CrossRefMatcher,
    footnotes: Option<&'a Footnotes>,
}

impl<'a> InlineTransformer<'a> {
    /// Create a transformer using the profile's citation and cross-reference
    /// settings.
    #[must_use]
    pub fn new(profile: &Profile) -> Self {
        Self {
            citations: profile.citations,
            xrefs: CrossRefMatcher::new(&profile.xref_prefixes),
            footnotes: None,
        }
    }

    /// Resolve `[^id]` markers against these definitions.
    #[must_use]
    pub fn with_footnotes(mut self, footnotes: &'a Footnotes) -> Self {
        self.footnotes = Some(footnotes);
        self
    }

    /// Transform text, discarding warnings.
    #[must_use]
    pub fn transform(&self, text: &str) -> String {
        let mut diagnostics = Diagnostics::new();
        self.transform_into(text, &mut diagnostics)
    }

    /// Transform text and return the warnings it produced.
    #[must_use]
    pub fn transform_with_warnings(&self, text: &str) -> (String, Vec<Warning>) {
        let mut diagnostics = Diagnostics::new();
        let xml = self.transform_into(text, &mut diagnostics);
        (xml, diagnostics.into_warnings())
    }

    pub(crate) fn transform_into(&self, text: &str, diagnostics: &mut Diagnostics) -> String {
        let mut state = RunState {
            diagnostics,
            next_scope: 0,
            depth: 0,
        };
        self.run(text, &mut state)
    }

    fn run(&self, text: &str, state: &mut RunState<'_>) -> String {
        let mut spans = vec![Span::text(text)];
        for rule in INLINE_RULES {
            spans = self.apply(rule, spans, state);
        }
        span::render(&spans)
    }

    fn apply(&self, rule: InlineRule, spans: Vec<Span>, state: &mut RunState<'_>) -> Vec<Span> {
        match rule {
            InlineRule::Passthrough => protect::passthrough(spans),
            InlineRule::Math => protect::math(spans, state.diagnostics),
            InlineRule::Code => protect::code(spans),
            InlineRule::Notes => {
                let spans =
                    notes::citations(spans, self.citations, |key| self.xrefs.is_xref_key(key));
                let spans = notes::footnotes(spans, |id| self.footnote_body(id, state));
                let spans = brackets::inline_notes(spans, &mut state.next_scope);
                notes::index(spans)
            }
            InlineRule::Links => brackets::links(spans, &mut state.next_scope),
            InlineRule::Emphasis => emphasis::emphasis(spans, state.diagnostics),
            InlineRule::CrossReferences => self.xrefs.apply(spans),
            InlineRule::Escapes => xref::escapes(spans),
        }
    }

    /// Render a footnote definition, or warn and drop an undefined marker.
    fn footnote_body(&self, id: &str, state: &mut RunState<'_>) -> Option<String> {
        let Some(definition) = self.footnotes.and_then(|notes| notes.get(id)) else {
            state.diagnostics.warn(
                WarningKind::UndefinedFootnote,
                format!("footnote [^{id}] has no definition"),
            );
            return None;
        };
        if state.depth >= MAX_NOTE_DEPTH {
            return None;
        }

        let mut nested = RunState {
            diagnostics: &mut *state.diagnostics,
            next_scope: 0,
            depth: state.depth + 1,
        };
        Some(self.run(definition, &mut nested))
    }
}
