//! Source lines and the forward-only cursor handlers consume them through.
//!
//! The driver owns one [`Cursor`] over the document and passes it by `&mut`
//! to each handler. A handler consumes exactly the lines of its block and
//! leaves the cursor on the first line it did not consume. Handlers that
//! recurse into a container body build a fresh cursor over the body slice.

/// A single source line with its 1-indexed line number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Line<'a> {
    /// Line number in the original document (1-indexed).
    pub number: usize,
    /// Line content without the line terminator or trailing whitespace.
    pub text: &'a str,
}

impl<'a> Line<'a> {
    /// Create a line.
    #[must_use]
    pub fn new(number: usize, text: &'a str) -> Self {
        Self { number, text }
    }

    /// Content with leading whitespace removed.
    #[must_use]
    pub fn trimmed(&self) -> &'a str {
        self.text.trim_start()
    }

    /// Whether the line contains only whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Number of leading spaces (tabs count as four).
    #[must_use]
    pub fn indent(&self) -> usize {
        let mut width = 0;
        for c in self.text.chars() {
            match c {
                ' ' => width += 1,
                '\t' => width += 4,
                _ => break,
            }
        }
        width
    }

    /// Same line with up to `width` columns of leading whitespace removed.
    #[must_use]
    pub fn dedent(&self, width: usize) -> Self {
        let mut removed = 0;
        let mut offset = 0;
        for (idx, c) in self.text.char_indices() {
            if removed >= width {
                break;
            }
            match c {
                ' ' => removed += 1,
                '\t' => removed += 4,
                _ => break,
            }
            offset = idx + c.len_utf8();
        }
        Self {
            number: self.number,
            text: &self.text[offset..],
        }
    }
}

/// Split a document into numbered lines.
///
/// Handles both `\n` and `\r\n` terminators and strips trailing whitespace.
#[must_use]
pub fn split_lines(input: &str) -> Vec<Line<'_>> {
    input
        .lines()
        .enumerate()
        .map(|(idx, text)| Line::new(idx + 1, text.trim_end()))
        .collect()
}

/// Forward-only cursor over a slice of lines with bounded lookahead.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    lines: &'a [Line<'a>],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor positioned on the first line.
    #[must_use]
    pub fn new(lines: &'a [Line<'a>]) -> Self {
        Self { lines, pos: 0 }
    }

    /// Whether every line has been consumed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.pos >= self.lines.len()
    }

    /// Current line without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<Line<'a>> {
        self.lines.get(self.pos).copied()
    }

    /// First non-blank line at or after the current position.
    #[must_use]
    pub fn peek_non_blank(&self) -> Option<Line<'a>> {
        self.lines[self.pos.min(self.lines.len())..]
            .iter()
            .find(|line| !line.is_blank())
            .copied()
    }

    /// Lines after the current one, for classifier lookahead.
    #[must_use]
    pub fn lookahead(&self) -> &'a [Line<'a>] {
        let start = (self.pos + 1).min(self.lines.len());
        &self.lines[start..]
    }

    /// Consume and return the current line.
    pub fn advance(&mut self) -> Option<Line<'a>> {
        let line = self.peek()?;
        self.pos += 1;
        Some(line)
    }

    /// Consume blank lines.
    pub fn skip_blank(&mut self) {
        while self.peek().is_some_and(|line| line.is_blank()) {
            self.pos += 1;
        }
    }

    /// Consume the next `count` lines and return them as a slice.
    pub fn take(&mut self, count: usize) -> &'a [Line<'a>] {
        let end = (self.pos + count).min(self.lines.len());
        let slice = &self.lines[self.pos..end];
        self.pos = end;
        slice
    }

    /// Lines from the current position to the end, without consuming them.
    #[must_use]
    pub fn rest(&self) -> &'a [Line<'a>] {
        &self.lines[self.pos.min(self.lines.len())..]
    }

    /// Number of the line the cursor is on, or of the last line at the end.
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.peek()
            .or_else(|| self.lines.last().copied())
            .map_or(0, |line| line.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines_numbers_from_one() {
        let lines = split_lines("a\r\nb  \n\nc");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], Line::new(1, "a"));
        assert_eq!(lines[1], Line::new(2, "b"));
        assert!(lines[2].is_blank());
        assert_eq!(lines[3].number, 4);
    }

    #[test]
    fn test_cursor_advance_and_peek() {
        let lines = split_lines("one\ntwo\nthree");
        let mut cursor = Cursor::new(&lines);

        assert_eq!(cursor.peek().unwrap().text, "one");
        assert_eq!(cursor.lookahead()[1].text, "three");
        assert_eq!(cursor.lookahead().len(), 2);
        assert_eq!(cursor.advance().unwrap().text, "one");
        assert_eq!(cursor.line_number(), 2);
        assert_eq!(cursor.take(5).len(), 2);
        assert!(cursor.is_done());
        assert_eq!(cursor.line_number(), 3);
    }

    #[test]
    fn test_peek_non_blank_skips_blank_lines() {
        let lines = split_lines("\n\n  \nbody");
        let mut cursor = Cursor::new(&lines);
        assert_eq!(cursor.peek_non_blank().unwrap().number, 4);
        cursor.skip_blank();
        assert_eq!(cursor.peek().unwrap().text, "body");
    }

    #[test]
    fn test_indent_and_dedent() {
        let line = Line::new(1, "    - nested");
        assert_eq!(line.indent(), 4);
        assert_eq!(line.dedent(2).text, "  - nested");
        assert_eq!(line.dedent(10).text, "- nested");

        let tabbed = Line::new(2, "\titem");
        assert_eq!(tabbed.indent(), 4);
        assert_eq!(tabbed.dedent(4).text, "item");
    }
}
