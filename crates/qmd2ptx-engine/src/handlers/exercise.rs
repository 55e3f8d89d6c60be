//! Exercise sets: numbered items become `<exercise>` elements with
//! solutions looked up by number.

use crate::block::{ListBlock, ListItem, ListStyle};
use crate::cursor::Line;
use crate::error::ConvertError;
use crate::solutions::solution_parts;
use crate::warning::WarningKind;

use super::div::strong_title;
use super::Session;

impl Session<'_> {
    /// Top-level list in an exercise set.
    ///
    /// Only ordered lists number exercises; other lists stay lists.
    pub(crate) fn exercise_list(&mut self, list: &ListBlock<'_>) -> Result<(), ConvertError> {
        if list.style != ListStyle::Ordered {
            return self.list(list);
        }
        self.warn_interrupted(list);
        for item in &list.items {
            self.exercise_count += 1;
            self.exercise_item(self.exercise_count, item)?;
        }
        Ok(())
    }

    fn exercise_item(&mut self, number: u32, item: &ListItem<'_>) -> Result<(), ConvertError> {
        self.writer.open("exercise", &[]);

        // Only a strong span that opens the item is a title
        let promoted = item
            .body
            .first()
            .filter(|first| first.text.starts_with("**"))
            .and_then(|first| strong_title(first.text));
        let mut body = item.body.clone();
        if let Some((title, rest)) = &promoted {
            self.title(title);
            body[0] = Line::new(item.line, rest);
        }
        self.part("statement", &[&body])?;
        self.solution(number, item.line);

        self.writer.close();
        Ok(())
    }

    fn solution(&mut self, number: u32, line: usize) {
        let Some(book) = self.solutions else {
            return;
        };
        let Some(text) = book.get(number) else {
            if book.expects(number) {
                self.diagnostics.warn_at(
                    line,
                    WarningKind::MissingSolution,
                    format!("exercise {number} has no solution"),
                );
            }
            return;
        };

        self.writer.open("solution", &[]);
        match solution_parts(text) {
            Some(parts) => {
                self.writer.open("p", &[]);
                self.writer.open("ol", &[("marker", "a.")]);
                for part in parts {
                    let xml = self.inline(part);
                    self.writer.open("li", &[]);
                    self.writer.leaf("p", &[], xml.trim());
                    self.writer.close();
                }
                self.writer.close();
                self.writer.close();
            }
            None => {
                let xml = self.inline(text);
                self.writer.leaf("p", &[], xml.trim());
            }
        }
        self.writer.close();
    }

    /// Warn about solutions whose exercise never appeared.
    pub(crate) fn unused_solutions(&mut self) {
        let Some(book) = self.solutions else {
            return;
        };
        let count = self.exercise_count;
        for number in book.numbers().filter(|n| *n > count) {
            self.diagnostics.warn(
                WarningKind::MissingSolution,
                format!("solution {number} has no matching exercise"),
            );
        }
    }
}
