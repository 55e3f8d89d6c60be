//! Non-fatal diagnostics collected during conversion.

use std::fmt;

/// Category of a non-fatal diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// A div class or fence annotation outside the known vocabulary.
    UnrecognizedConstruct,
    /// An inline delimiter that could not be paired.
    UnbalancedInline,
    /// A footnote marker without a definition.
    UndefinedFootnote,
    /// A list that switched marker style midway.
    MixedListMarkers,
    /// A second level-1 heading in one document.
    DuplicateTitle,
    /// An exercise without a published solution where one was expected.
    MissingSolution,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnrecognizedConstruct => "unrecognized construct",
            Self::UnbalancedInline => "unbalanced inline markup",
            Self::UndefinedFootnote => "undefined footnote",
            Self::MixedListMarkers => "mixed list markers",
            Self::DuplicateTitle => "duplicate title",
            Self::MissingSolution => "missing solution",
        };
        f.write_str(name)
    }
}

/// A non-fatal diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Warning {
    /// Source line (1-indexed) when known.
    pub line: Option<usize>,
    /// Category.
    pub kind: WarningKind,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}: {}", self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

/// Collector for warnings emitted by the driver, handlers and inline rules.
///
/// Each warning is also logged through `tracing` as it is recorded.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    warnings: Vec<Warning>,
    line: Option<usize>,
}

impl Diagnostics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Set the line attributed to warnings that don't name one.
    pub(crate) fn at_line(&mut self, line: usize) {
        self.line = Some(line);
    }

    /// Record a warning at the current line.
    pub(crate) fn warn(&mut self, kind: WarningKind, message: impl Into<String>) {
        let line = self.line;
        self.push(line, kind, message.into());
    }

    /// Record a warning at an explicit line.
    pub(crate) fn warn_at(&mut self, line: usize, kind: WarningKind, message: impl Into<String>) {
        self.push(Some(line), kind, message.into());
    }

    fn push(&mut self, line: Option<usize>, kind: WarningKind, message: String) {
        tracing::warn!(line = ?line, kind = %kind, "{message}");
        self.warnings.push(Warning {
            line,
            kind,
            message,
        });
    }

    pub(crate) fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}
