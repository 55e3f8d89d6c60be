//! Document driver.
//!
//! Splits the input into lines, collects footnote definitions, feeds every
//! block to its handler and wraps the result in the root element. Section
//! scopes are closed exactly once, after the last block.

use tracing::debug;

use crate::cursor::split_lines;
use crate::error::ConvertError;
use crate::footnotes::Footnotes;
use crate::handlers::{Context, Session};
use crate::inline::InlineTransformer;
use crate::profile::{DocumentKind, Profile};
use crate::solutions::SolutionBook;
use crate::warning::Warning;
use crate::writer::XmlWriter;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
const XINCLUDE_NS: &str = "http://www.w3.org/2001/XInclude";

/// Result of converting one document.
#[derive(Clone, Debug)]
pub struct Conversion {
    /// Complete XML document.
    pub xml: String,
    /// Root `xml:id`.
    pub root_id: String,
    /// Root title markup, if the document has one.
    pub title: Option<String>,
    /// Non-fatal diagnostics in source order of detection.
    pub warnings: Vec<Warning>,
}

/// Converts documents with one profile.
///
/// # Example
///
/// ```
/// use qmd2ptx_engine::{Converter, Profile};
///
/// let converter = Converter::new(Profile::chapter().with_source_stem("intro"));
/// let result = converter.convert("# Introduction\n\n## Data {#sec-data}\n\nSome *data*.\n", None)?;
/// assert_eq!(result.root_id, "ch-intro");
/// assert!(result.xml.contains("<section xml:id=\"sec-data\">"));
/// # Ok::<(), qmd2ptx_engine::ConvertError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Converter {
    profile: Profile,
}

impl Converter {
    /// Create a converter.
    #[must_use]
    pub fn new(profile: Profile) -> Self {
        Self { profile }
    }

    /// Profile in use.
    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Convert one document.
    ///
    /// `solutions` supplies exercise solutions for exercise sets.
    ///
    /// # Errors
    ///
    /// Returns the first structural error; nothing is produced for the
    /// document in that case.
    pub fn convert(
        &self,
        input: &str,
        solutions: Option<&SolutionBook>,
    ) -> Result<Conversion, ConvertError> {
        let lines = split_lines(input);
        let footnotes = Footnotes::collect(&lines);
        let inline = InlineTransformer::new(&self.profile).with_footnotes(&footnotes);
        debug!(
            lines = lines.len(),
            footnotes = footnotes.len(),
            kind = %self.profile.kind,
            "Converting document"
        );

        let mut session = Session::new(&self.profile, inline, solutions);
        session.convert_lines(&lines, Context::Document)?;
        session.sections.close_all(&mut session.writer);
        if self.profile.kind == DocumentKind::Exercises {
            session.unused_solutions();
        }

        let title = self.title(&mut session);
        let root_id = self.root_id(&session);
        let uses_xinclude = session.root.uses_xinclude;
        let body = session.writer.finish();

        let mut root_attrs = vec![("xml:id", root_id.as_str())];
        if uses_xinclude {
            root_attrs.push(("xmlns:xi", XINCLUDE_NS));
        }
        let mut root = XmlWriter::new();
        root.open(self.profile.kind.root_element(), &root_attrs);
        if let Some(title) = &title {
            root.leaf("title", &[], title);
        }
        root.raw(&body);

        let mut xml = String::from(XML_DECLARATION);
        xml.push_str(&root.finish());

        let warnings = session.diagnostics.into_warnings();
        debug!(root_id = %root_id, warnings = warnings.len(), "Converted document");

        Ok(Conversion {
            xml,
            root_id,
            title,
            warnings,
        })
    }

    /// Title precedence: profile, first level-1 heading, front matter.
    fn title(&self, session: &mut Session<'_>) -> Option<String> {
        if let Some(title) = &self.profile.title {
            return Some(session.inline(title));
        }
        if let Some(title) = session.root.heading_title.take() {
            return Some(title);
        }
        let title = session.root.front_matter.title.clone()?;
        Some(session.inline(&title))
    }

    /// Identifier precedence: profile, heading `{#id}`, front matter, derived.
    fn root_id(&self, session: &Session<'_>) -> String {
        let root = &session.root;
        self.profile
            .root_id
            .clone()
            .or_else(|| root.heading_id.clone())
            .or_else(|| root.front_matter.id.clone())
            .unwrap_or_else(|| {
                let title = self
                    .profile
                    .title
                    .as_deref()
                    .or(root.heading_text.as_deref())
                    .or(root.front_matter.title.as_deref());
                self.profile.derived_id(title)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warning::WarningKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_full_chapter() {
        let input = "---\ntitle: Ignored\n---\n\n# Summarizing data {#ch-summary}\n\n## Mean\n\nThe mean of $x$.[^1]\n\n[^1]: See @sec-mean.\n";
        let result = Converter::new(Profile::chapter()).convert(input, None).unwrap();

        assert_eq!(result.root_id, "ch-summary");
        assert_eq!(result.title.as_deref(), Some("Summarizing data"));
        assert_eq!(
            result.xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<chapter xml:id=\"ch-summary\">\n  <title>Summarizing data</title>\n  <section>\n    <title>Mean</title>\n    <p>The mean of <m>x</m>.<fn>See <xref ref=\"sec-mean\"/>.</fn></p>\n  </section>\n</chapter>\n"
        );
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_front_matter_and_derived_ids() {
        let converter = Converter::new(Profile::chapter());
        let result = converter.convert("---\ntitle: Data basics\nid: ch-basics\n---\n\nText.\n", None).unwrap();
        assert_eq!(result.root_id, "ch-basics");
        assert_eq!(result.title.as_deref(), Some("Data basics"));

        let result = converter.convert("# Study design\n", None).unwrap();
        assert_eq!(result.root_id, "ch-study-design");

        let stem = Converter::new(Profile::exercises().with_source_stem("02-exercises"));
        let result = stem.convert("1. One\n", None).unwrap();
        assert_eq!(result.root_id, "exercises-02-exercises");
        assert!(result.xml.contains("<exercises xml:id=\"exercises-02-exercises\">"));
    }

    #[test]
    fn test_profile_overrides() {
        let profile = Profile::chapter().with_root_id("ch-x").with_title("Chosen & kept");
        let result = Converter::new(profile).convert("# Heading title\n", None).unwrap();
        assert_eq!(result.root_id, "ch-x");
        assert_eq!(result.title.as_deref(), Some("Chosen &amp; kept"));
    }

    #[test]
    fn test_xinclude_namespace() {
        let result = Converter::new(Profile::chapter())
            .convert("{{< include a.qmd >}}\n", None)
            .unwrap();
        assert!(result.xml.contains(
            "<chapter xml:id=\"ch-document\" xmlns:xi=\"http://www.w3.org/2001/XInclude\">"
        ));
        assert!(result.xml.contains("  <xi:include href=\"a.ptx\"/>\n"));
    }

    #[test]
    fn test_structural_error_aborts() {
        let err = Converter::new(Profile::chapter())
            .convert("Text.\n\n::: {.important}\nNever closed.\n", None)
            .unwrap_err();
        assert_eq!(
            err,
            ConvertError::UnterminatedDiv {
                line: 3,
                annotation: "{.important}".to_owned(),
            }
        );
    }

    #[test]
    fn test_duplicate_title_warns() {
        let result = Converter::new(Profile::chapter())
            .convert("# One\n\n# Two\n", None)
            .unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::DuplicateTitle);
        assert_eq!(result.warnings[0].line, Some(3));
    }
}
