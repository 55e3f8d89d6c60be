//! Block handlers.
//!
//! A [`Session`] holds the state of one conversion run: the output writer,
//! the section stack, collected diagnostics and root metadata. Each handler
//! is an `impl Session` method in its own module that consumes one
//! [`Block`] and writes its elements. Container handlers recurse through
//! [`Session::convert_lines`] on their body slice.

mod div;
mod exercise;
mod fence;
mod heading;
mod list;
mod math;

use tracing::debug;

use crate::block::{Block, read_block};
use crate::cursor::{Cursor, Line};
use crate::error::ConvertError;
use crate::front_matter::FrontMatter;
use crate::inline::InlineTransformer;
use crate::profile::{DocumentKind, Profile};
use crate::sections::SectionStack;
use crate::solutions::SolutionBook;
use crate::warning::{Diagnostics, WarningKind};
use crate::writer::XmlWriter;

/// Identifiers with this prefix are tables rather than figures.
const TABLE_PREFIX: &str = "tbl-";

/// Where a block sits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Context {
    /// Directly in the document body: headings open sections.
    Document,
    /// Inside a container element: headings never touch the section stack.
    Container,
}

/// Root metadata gathered while converting.
#[derive(Debug, Default)]
pub(crate) struct RootMeta {
    /// Transformed title of the first level-1 heading.
    pub(crate) heading_title: Option<String>,
    /// Source text of that heading, for identifier derivation.
    pub(crate) heading_text: Option<String>,
    /// `{#id}` of that heading.
    pub(crate) heading_id: Option<String>,
    pub(crate) front_matter: FrontMatter,
    /// An `<xi:include>` was written.
    pub(crate) uses_xinclude: bool,
}

/// State of one conversion run.
pub(crate) struct Session<'a> {
    pub(crate) profile: &'a Profile,
    pub(crate) inline: InlineTransformer<'a>,
    pub(crate) solutions: Option<&'a SolutionBook>,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) writer: XmlWriter,
    pub(crate) sections: SectionStack,
    pub(crate) root: RootMeta,
    /// Exercises numbered so far in an exercise set.
    pub(crate) exercise_count: u32,
}

impl<'a> Session<'a> {
    pub(crate) fn new(
        profile: &'a Profile,
        inline: InlineTransformer<'a>,
        solutions: Option<&'a SolutionBook>,
    ) -> Self {
        Self {
            profile,
            inline,
            solutions,
            diagnostics: Diagnostics::new(),
            // Body content sits one level inside the root element
            writer: XmlWriter::with_indent(1),
            sections: SectionStack::new(),
            root: RootMeta::default(),
            exercise_count: 0,
        }
    }

    /// Read and handle every block in `lines`.
    pub(crate) fn convert_lines(
        &mut self,
        lines: &[Line<'_>],
        context: Context,
    ) -> Result<(), ConvertError> {
        let mut cursor = Cursor::new(lines);
        while !cursor.is_done() {
            let block = read_block(&mut cursor)?;
            self.handle(&block, context)?;
        }
        Ok(())
    }

    fn handle(&mut self, block: &Block<'_>, context: Context) -> Result<(), ConvertError> {
        self.diagnostics.at_line(block.line());

        match block {
            Block::Heading {
                line,
                level,
                title,
                attrs,
            } => match context {
                Context::Document => self.heading(*line, *level, title, attrs.id.clone())?,
                Context::Container => self.container_heading(title),
            },
            Block::FrontMatter { line, yaml } => {
                self.root.front_matter = FrontMatter::parse(yaml, *line)?;
            }
            Block::Fence { open, body, .. } => self.fence(open, body),
            Block::Div {
                line,
                annotation,
                attrs,
                body,
            } => self.div(*line, annotation, attrs, body, context)?,
            Block::DisplayMath {
                rows, id, trailing, ..
            } => {
                self.display_math(rows, id.as_deref());
                if let Some(text) = trailing {
                    self.paragraph(text);
                }
            }
            Block::Include { path, .. } => self.include(path),
            Block::Image {
                caption,
                source,
                attrs,
                ..
            } => {
                let width = self.width(attrs.get("width").or_else(|| attrs.get("out-width")));
                self.figure(attrs.id.as_deref(), caption, source, &width, attrs.get("fig-alt"));
            }
            Block::List(list) => {
                if self.profile.kind == DocumentKind::Exercises && context == Context::Document {
                    self.exercise_list(list)?;
                } else {
                    self.list(list)?;
                }
            }
            Block::Paragraph { text, .. } => self.paragraph(text),
            Block::Skipped { line, kind } => {
                debug!(line, kind = ?kind, "Skipped block");
            }
        }
        Ok(())
    }

    /// Run the inline transformer, recording its warnings.
    pub(crate) fn inline(&mut self, text: &str) -> String {
        self.inline.transform_into(text, &mut self.diagnostics)
    }

    fn paragraph(&mut self, text: &str) {
        let xml = self.inline(text);
        if !xml.trim().is_empty() {
            self.writer.leaf("p", &[], xml.trim());
        }
    }

    fn include(&mut self, path: &str) {
        let href = std::path::Path::new(path).with_extension("ptx");
        let href = href.to_string_lossy();
        self.writer.empty("xi:include", &[("href", href.as_ref())]);
        self.root.uses_xinclude = true;
    }

    /// Figure width from an explicit value, falling back to the profile.
    ///
    /// Only percentages are meaningful to the target format.
    pub(crate) fn width(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::trim)
            .filter(|w| w.ends_with('%') && w[..w.len() - 1].parse::<u32>().is_ok())
            .unwrap_or(&self.profile.figure_width)
            .to_owned()
    }

    /// Write a `<figure>` with caption and image.
    ///
    /// `tbl-` identifiers make a `<table>` titled by the caption instead.
    pub(crate) fn figure(
        &mut self,
        id: Option<&str>,
        caption: &str,
        source: &str,
        width: &str,
        alt: Option<&str>,
    ) {
        let caption = self.inline(caption);
        let (element, heading) = match id {
            Some(id) if id.starts_with(TABLE_PREFIX) => ("table", "title"),
            _ => ("figure", "caption"),
        };
        match id {
            Some(id) => self.writer.open(element, &[("xml:id", id)]),
            None => self.writer.open(element, &[]),
        }
        self.writer.leaf(heading, &[], caption.trim());
        let image_attrs = [("source", source), ("width", width)];
        match alt {
            Some(alt) => {
                let alt = self.inline(alt);
                self.writer.open("image", &image_attrs);
                self.writer.leaf("shortdescription", &[], alt.trim());
                self.writer.close();
            }
            None => self.writer.empty("image", &image_attrs),
        }
        self.writer.close();
    }

    pub(crate) fn unrecognized(&mut self, line: usize, message: String) {
        self.diagnostics
            .warn_at(line, WarningKind::UnrecognizedConstruct, message);
    }
}
