//! Structural conversion errors.
//!
//! A structural error means the input document is malformed in a way that
//! would produce broken output. Conversion of that document is aborted.

/// Error that aborts the conversion of a single document.
///
/// Every variant carries the 1-indexed source line where the problem
/// starts, so the author can jump to the offending construct.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConvertError {
    /// A code fence opened but never closed.
    #[error("line {line}: unterminated code fence `{marker}`")]
    UnterminatedFence {
        /// Line of the opening fence.
        line: usize,
        /// Opening fence marker as written (e.g. "```{r}").
        marker: String,
    },

    /// A custom div opened but never closed.
    #[error("line {line}: unterminated div `{annotation}` (missing closing :::)")]
    UnterminatedDiv {
        /// Line of the opening `:::` fence.
        line: usize,
        /// Annotation from the opening fence (e.g. "{.guidedpractice}").
        annotation: String,
    },

    /// A `:::` close with no div open.
    #[error("line {line}: closing ::: without a matching opening div")]
    StrayDivClose {
        /// Line of the stray close.
        line: usize,
    },

    /// A `$$` display math block opened but never closed.
    #[error("line {line}: unterminated display math block (missing closing $$)")]
    UnterminatedMath {
        /// Line of the opening `$$`.
        line: usize,
    },

    /// A heading deeper than the open section scopes allow.
    #[error("line {line}: heading level {level} without an enclosing level {} heading", .level - 1)]
    HeadingLevelSkip {
        /// Line of the heading.
        line: usize,
        /// Level of the offending heading.
        level: u8,
    },

    /// YAML front matter that could not be parsed.
    #[error("line {line}: invalid front matter: {message}")]
    FrontMatter {
        /// Line of the opening `---`.
        line: usize,
        /// Parser message.
        message: String,
    },
}

impl ConvertError {
    /// Source line the error points at.
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::UnterminatedFence { line, .. }
            | Self::UnterminatedDiv { line, .. }
            | Self::StrayDivClose { line }
            | Self::UnterminatedMath { line }
            | Self::HeadingLevelSkip { line, .. }
            | Self::FrontMatter { line, .. } => *line,
        }
    }
}
