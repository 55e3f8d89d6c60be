//! Section nesting controller.
//!
//! Keeps the stack of open section scopes. Levels are strictly increasing
//! from bottom to top after every operation; a heading closes every scope
//! at its own level or deeper before opening its own.

use crate::error::ConvertError;
use crate::writer::XmlWriter;

/// An open section scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionScope {
    /// Heading level (2–4).
    pub level: u8,
    /// `xml:id` of the division.
    pub id: Option<String>,
}

/// Division element for a heading level.
#[must_use]
pub fn division_element(level: u8) -> &'static str {
    match level {
        0..=2 => "section",
        3 => "subsection",
        _ => "paragraphs",
    }
}

/// Stack of open section scopes.
#[derive(Debug, Default)]
pub struct SectionStack {
    scopes: Vec<SectionScope>,
}

impl SectionStack {
    /// Create an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open scopes, bottom first.
    #[must_use]
    pub fn scopes(&self) -> &[SectionScope] {
        &self.scopes
    }

    /// Level of the innermost open scope.
    #[must_use]
    pub fn current_level(&self) -> Option<u8> {
        self.scopes.last().map(|scope| scope.level)
    }

    /// Close every scope whose level is at least `level`.
    pub(crate) fn close_to(&mut self, writer: &mut XmlWriter, level: u8) {
        while self.current_level().is_some_and(|open| open >= level) {
            self.scopes.pop();
            writer.close();
        }
    }

    /// Close all scopes.
    pub(crate) fn close_all(&mut self, writer: &mut XmlWriter) {
        self.close_to(writer, 0);
    }

    /// Open a scope for a heading, closing deeper and equal scopes first.
    ///
    /// `title` is already transformed markup.
    pub(crate) fn open(
        &mut self,
        writer: &mut XmlWriter,
        line: usize,
        level: u8,
        id: Option<String>,
        title: &str,
    ) -> Result<(), ConvertError> {
        self.open_as(writer, line, level, id, title, division_element(level))
    }

    /// Like [`SectionStack::open`] with an explicit division element.
    pub(crate) fn open_as(
        &mut self,
        writer: &mut XmlWriter,
        line: usize,
        level: u8,
        id: Option<String>,
        title: &str,
        element: &'static str,
    ) -> Result<(), ConvertError> {
        self.close_to(writer, level);
        if level > 2 && self.current_level() != Some(level - 1) {
            return Err(ConvertError::HeadingLevelSkip { line, level });
        }

        match &id {
            Some(id) => writer.open(element, &[("xml:id", id.as_str())]),
            None => writer.open(element, &[]),
        }
        writer.leaf("title", &[], title);
        self.scopes.push(SectionScope { level, id });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nesting_and_closing() {
        let mut writer = XmlWriter::new();
        let mut stack = SectionStack::new();

        stack.open(&mut writer, 1, 2, Some("sec-a".to_owned()), "A").unwrap();
        stack.open(&mut writer, 3, 3, None, "A.1").unwrap();
        stack.open(&mut writer, 5, 2, None, "B").unwrap();
        assert_eq!(stack.scopes().len(), 1);
        stack.close_all(&mut writer);
        assert!(stack.scopes().is_empty());

        assert_eq!(
            writer.finish(),
            "<section xml:id=\"sec-a\">\n  <title>A</title>\n  <subsection>\n    <title>A.1</title>\n  </subsection>\n</section>\n<section>\n  <title>B</title>\n</section>\n"
        );
    }

    #[test]
    fn test_levels_strictly_increase() {
        let mut writer = XmlWriter::new();
        let mut stack = SectionStack::new();
        stack.open(&mut writer, 1, 2, None, "a").unwrap();
        stack.open(&mut writer, 2, 3, None, "b").unwrap();
        stack.open(&mut writer, 3, 4, None, "c").unwrap();
        stack.open(&mut writer, 4, 3, None, "d").unwrap();

        let levels: Vec<u8> = stack.scopes().iter().map(|s| s.level).collect();
        assert_eq!(levels, vec![2, 3]);
    }

    #[test]
    fn test_level_skip_is_error() {
        let mut writer = XmlWriter::new();
        let mut stack = SectionStack::new();
        assert_eq!(
            stack.open(&mut writer, 7, 3, None, "orphan"),
            Err(ConvertError::HeadingLevelSkip { line: 7, level: 3 })
        );

        stack.open(&mut writer, 8, 2, None, "a").unwrap();
        assert_eq!(
            stack.open(&mut writer, 9, 4, None, "deep"),
            Err(ConvertError::HeadingLevelSkip { line: 9, level: 4 })
        );
    }

    #[test]
    fn test_open_as_custom_element() {
        let mut writer = XmlWriter::new();
        let mut stack = SectionStack::new();
        stack
            .open_as(&mut writer, 1, 2, None, "Part A", "subexercises")
            .unwrap();
        stack.close_all(&mut writer);
        assert_eq!(
            writer.finish(),
            "<subexercises>\n  <title>Part A</title>\n</subexercises>\n"
        );
    }
}
