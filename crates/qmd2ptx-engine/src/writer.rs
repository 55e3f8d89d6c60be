//! Indented XML output buffer.
//!
//! Handlers write through [`XmlWriter`], which tracks open elements so
//! every close matches the most recent open. Attribute values are escaped
//! here; element content passed to [`XmlWriter::leaf`] is already markup.

use quick_xml::escape::escape;

const INDENT: &str = "  ";

#[derive(Debug, Default)]
pub(crate) struct XmlWriter {
    out: String,
    stack: Vec<&'static str>,
    /// Indentation levels added to every line, for content of an element
    /// written by someone else.
    base_indent: usize,
}

impl XmlWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Writer for content nested `levels` deep in an outer element.
    pub(crate) fn with_indent(levels: usize) -> Self {
        Self {
            base_indent: levels,
            ..Self::default()
        }
    }

    fn indent(&mut self) {
        for _ in 0..self.base_indent + self.stack.len() {
            self.out.push_str(INDENT);
        }
    }

    fn start_tag(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.out.push('<');
        self.out.push_str(name);
        for (key, value) in attrs {
            self.out.push(' ');
            self.out.push_str(key);
            self.out.push_str("=\"");
            self.out.push_str(&escape(*value));
            self.out.push('"');
        }
    }

    /// Open an element on its own line.
    pub(crate) fn open(&mut self, name: &'static str, attrs: &[(&str, &str)]) {
        self.indent();
        self.start_tag(name, attrs);
        self.out.push_str(">\n");
        self.stack.push(name);
    }

    /// Close the most recently opened element.
    pub(crate) fn close(&mut self) {
        if let Some(name) = self.stack.pop() {
            self.indent();
            self.out.push_str("</");
            self.out.push_str(name);
            self.out.push_str(">\n");
        }
    }

    /// Close elements until `depth` remain open.
    pub(crate) fn close_to_depth(&mut self, depth: usize) {
        while self.stack.len() > depth {
            self.close();
        }
    }

    /// Write `<name attrs>content</name>` on one line.
    pub(crate) fn leaf(&mut self, name: &str, attrs: &[(&str, &str)], content: &str) {
        self.indent();
        self.start_tag(name, attrs);
        self.out.push('>');
        self.out.push_str(content);
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push_str(">\n");
    }

    /// Write `<name attrs/>`.
    pub(crate) fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.indent();
        self.start_tag(name, attrs);
        self.out.push_str("/>\n");
    }

    /// Write preformatted lines without added indentation, escaped.
    pub(crate) fn verbatim(&mut self, name: &str, lines: &[&str]) {
        self.indent();
        self.start_tag(name, &[]);
        self.out.push_str(">\n");
        for line in lines {
            self.out.push_str(&quick_xml::escape::partial_escape(*line));
            self.out.push('\n');
        }
        self.indent();
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push_str(">\n");
    }

    /// Append lines rendered elsewhere, already indented for this depth.
    pub(crate) fn raw(&mut self, rendered: &str) {
        self.out.push_str(rendered);
        if !rendered.is_empty() && !rendered.ends_with('\n') {
            self.out.push('\n');
        }
    }

    /// Close everything still open and return the output.
    pub(crate) fn finish(mut self) -> String {
        self.close_to_depth(0);
        self.out
    }
}
