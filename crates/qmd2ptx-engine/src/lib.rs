//! Quarto markdown to PreTeXt conversion engine.
//!
//! This crate provides a line-oriented [`Converter`] that turns one Quarto
//! markdown document into a PreTeXt `chapter` or `exercises` document.
//!
//! # Architecture
//!
//! Data flows one way through the pipeline:
//! - [`classify`] decides which block construct starts at a line
//! - [`read_block`] consumes exactly the lines of that block from a [`Cursor`]
//! - block handlers write elements, keeping sections balanced through a
//!   [`SectionStack`]
//! - [`InlineTransformer`] converts the text inside blocks through an
//!   explicit, ordered rule list ([`INLINE_RULES`])
//!
//! Malformed structure (unterminated fences, divs or display math, stray div
//! closes, skipped heading levels) aborts with a [`ConvertError`] carrying
//! the source line. Everything else degrades to a [`Warning`] returned with
//! the output.
//!
//! Conversion settings live in a [`Profile`]: document kind, identifiers,
//! figure defaults and the policies for code chunks and citations.
//!
//! # Example
//!
//! ```
//! use qmd2ptx_engine::{Converter, Profile};
//!
//! let markdown = "# Data\n\n::: {.important}\n**Tidy data.** One row per case.\n:::\n";
//! let result = Converter::new(Profile::chapter()).convert(markdown, None)?;
//! assert!(result.xml.contains("<assemblage>"));
//! assert!(result.xml.contains("<title>Tidy data</title>"));
//! # Ok::<(), qmd2ptx_engine::ConvertError>(())
//! ```

mod attrs;
mod block;
mod classify;
mod converter;
mod cursor;
mod error;
mod fence;
mod footnotes;
mod front_matter;
mod handlers;
mod inline;
mod profile;
mod sections;
mod solutions;
mod warning;
mod writer;

pub use attrs::{Attributes, DivFence, split_trailing_attributes};
pub use block::{Block, ListBlock, ListItem, ListStyle, read_block};
pub use classify::{BlockKind, classify};
pub use converter::{Conversion, Converter};
pub use cursor::{Cursor, Line, split_lines};
pub use error::ConvertError;
pub use fence::{DIRECTIVE_SENTINEL, FenceMetadata, FenceOpen};
pub use footnotes::Footnotes;
pub use front_matter::FrontMatter;
pub use inline::{INLINE_RULES, InlineRule, InlineTransformer, Role, Span};
pub use profile::{
    CitationPolicy, CodeBlockPolicy, DEFAULT_SKIP_DIVS, DEFAULT_XREF_PREFIXES, DocumentKind,
    ParsePolicyError, Profile, slugify,
};
pub use sections::{SectionScope, SectionStack, division_element};
pub use solutions::{SolutionBook, solution_parts};
pub use warning::{Warning, WarningKind};
