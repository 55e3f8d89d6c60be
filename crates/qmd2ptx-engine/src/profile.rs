//! Per-document-type conversion profiles.
//!
//! A [`Profile`] parameterizes the single conversion pipeline: which root
//! element to emit, how identifiers are derived, where figures live and
//! which optional policies apply.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Div classes skipped entirely unless configured otherwise.
pub const DEFAULT_SKIP_DIVS: &[&str] = &["content-visible", "content-hidden", "pronunciation"];

/// Cross-reference kinds recognized unless configured otherwise.
pub const DEFAULT_XREF_PREFIXES: &[&str] = &["fig", "tbl", "sec", "eq", "exr"];

/// Unknown value for one of the policy enums.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what} `{value}` (expected one of: {expected})")]
pub struct ParsePolicyError {
    what: &'static str,
    value: String,
    expected: &'static str,
}

macro_rules! policy_enum {
    ($(#[$meta:meta])* $name:ident, $what:literal, { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Name as used on the command line and in configuration.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParsePolicyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ParsePolicyError {
                        what: $what,
                        value: s.to_owned(),
                        expected: concat!($($text, " "),+).trim_ascii_end(),
                    }),
                }
            }
        }
    };
}

policy_enum!(
    /// Type of document being converted.
    DocumentKind, "document kind", {
        /// A chapter: `<chapter>` root with sections.
        #[default]
        Chapter => "chapter",
        /// An exercise set: `<exercises>` root with numbered exercises.
        Exercises => "exercises",
    }
);

policy_enum!(
    /// What to do with executable chunks that are not figures or tables.
    CodeBlockPolicy, "code block policy", {
        /// Leave them out of the output.
        #[default]
        Omit => "omit",
        /// Emit them as `<program>` listings.
        Listing => "listing",
    }
);

policy_enum!(
    /// What to do with bibliography citations (`[@key]`).
    CitationPolicy, "citation policy", {
        /// One `<xref ref="key"/>` per key.
        #[default]
        Xref => "xref",
        /// Remove the citation.
        Drop => "drop",
    }
);

impl DocumentKind {
    /// Root element name.
    #[must_use]
    pub fn root_element(self) -> &'static str {
        match self {
            Self::Chapter => "chapter",
            Self::Exercises => "exercises",
        }
    }

    /// Identifier prefix used when none is configured.
    #[must_use]
    pub fn default_id_prefix(self) -> &'static str {
        match self {
            Self::Chapter => "ch-",
            Self::Exercises => "exercises-",
        }
    }
}

/// Conversion settings for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Document type.
    pub kind: DocumentKind,
    /// Root `xml:id`; derived from the document when unset.
    pub root_id: Option<String>,
    /// Root title; taken from the document when unset.
    pub title: Option<String>,
    /// Prefix for derived root identifiers.
    pub id_prefix: String,
    /// Source file stem, used to derive the root identifier.
    pub source_stem: Option<String>,
    /// Directory figure images are referenced from.
    pub image_dir: String,
    /// Default figure width.
    pub figure_width: String,
    /// Executable chunk policy.
    pub code_blocks: CodeBlockPolicy,
    /// Citation policy.
    pub citations: CitationPolicy,
    /// Div classes dropped with their content.
    pub skip_divs: Vec<String>,
    /// Cross-reference kinds recognized in `@kind-id`.
    pub xref_prefixes: Vec<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self::new(DocumentKind::default())
    }
}

impl Profile {
    /// Create a profile with default settings for a document kind.
    #[must_use]
    pub fn new(kind: DocumentKind) -> Self {
        Self {
            kind,
            root_id: None,
            title: None,
            id_prefix: kind.default_id_prefix().to_owned(),
            source_stem: None,
            image_dir: "images".to_owned(),
            figure_width: "70%".to_owned(),
            code_blocks: CodeBlockPolicy::default(),
            citations: CitationPolicy::default(),
            skip_divs: DEFAULT_SKIP_DIVS.iter().map(|s| (*s).to_owned()).collect(),
            xref_prefixes: DEFAULT_XREF_PREFIXES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
        }
    }

    /// Default chapter profile.
    #[must_use]
    pub fn chapter() -> Self {
        Self::new(DocumentKind::Chapter)
    }

    /// Default exercise-set profile.
    #[must_use]
    pub fn exercises() -> Self {
        Self::new(DocumentKind::Exercises)
    }

    /// Set the root identifier.
    #[must_use]
    pub fn with_root_id(mut self, id: impl Into<String>) -> Self {
        self.root_id = Some(id.into());
        self
    }

    /// Set the root title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the prefix for derived identifiers.
    #[must_use]
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    /// Set the source file stem.
    #[must_use]
    pub fn with_source_stem(mut self, stem: impl Into<String>) -> Self {
        self.source_stem = Some(stem.into());
        self
    }

    /// Set the image directory.
    #[must_use]
    pub fn with_image_dir(mut self, dir: impl Into<String>) -> Self {
        self.image_dir = dir.into();
        self
    }

    /// Set the default figure width.
    #[must_use]
    pub fn with_figure_width(mut self, width: impl Into<String>) -> Self {
        self.figure_width = width.into();
        self
    }

    /// Set the executable chunk policy.
    #[must_use]
    pub fn with_code_blocks(mut self, policy: CodeBlockPolicy) -> Self {
        self.code_blocks = policy;
        self
    }

    /// Set the citation policy.
    #[must_use]
    pub fn with_citations(mut self, policy: CitationPolicy) -> Self {
        self.citations = policy;
        self
    }

    /// Replace the skipped div classes.
    #[must_use]
    pub fn with_skip_divs<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_divs = classes.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the recognized cross-reference kinds.
    #[must_use]
    pub fn with_xref_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.xref_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Whether a div class is dropped with its content.
    #[must_use]
    pub fn skips(&self, class: &str) -> bool {
        self.skip_divs.iter().any(|skip| skip == class)
    }

    /// Root identifier derived from the source stem or title.
    pub(crate) fn derived_id(&self, title: Option<&str>) -> String {
        let base = self
            .source_stem
            .as_deref()
            .or(title)
            .map(slugify)
            .filter(|slug| !slug.is_empty())
            .unwrap_or_else(|| "document".to_owned());
        format!("{}{base}", self.id_prefix)
    }
}

/// Lowercase ASCII slug: alphanumerics kept, other runs become `-`.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_owned()
}
