//! Lists. The target format keeps lists inside a paragraph.

use crate::block::{ListBlock, ListStyle};
use crate::error::ConvertError;
use crate::warning::WarningKind;

use super::{Context, Session};

impl Session<'_> {
    pub(crate) fn list(&mut self, list: &ListBlock<'_>) -> Result<(), ConvertError> {
        self.warn_interrupted(list);

        self.writer.open("p", &[]);
        match list.style {
            ListStyle::Unordered => self.writer.open("ul", &[]),
            ListStyle::Ordered => self.writer.open("ol", &[]),
            ListStyle::Lettered => self.writer.open("ol", &[("marker", "a.")]),
        }
        for item in &list.items {
            self.writer.open("li", &[]);
            self.convert_lines(&item.body, Context::Container)?;
            self.writer.close();
        }
        self.writer.close();
        self.writer.close();
        Ok(())
    }

    pub(crate) fn warn_interrupted(&mut self, list: &ListBlock<'_>) {
        if let Some(line) = list.interrupted_at {
            self.diagnostics.warn_at(
                line,
                WarningKind::MixedListMarkers,
                "list marker style changes; starting a new list",
            );
        }
    }
}
