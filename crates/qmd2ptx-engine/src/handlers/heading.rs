//! Headings: document title, divisions and container headings.

use crate::error::ConvertError;
use crate::profile::DocumentKind;
use crate::warning::WarningKind;

use super::Session;

impl Session<'_> {
    /// Heading directly in the document body.
    pub(crate) fn heading(
        &mut self,
        line: usize,
        level: u8,
        title: &str,
        id: Option<String>,
    ) -> Result<(), ConvertError> {
        let title_xml = self.inline(title);

        if level == 1 {
            self.sections.close_all(&mut self.writer);
            if self.root.heading_title.is_none() {
                self.root.heading_title = Some(title_xml);
                self.root.heading_text = Some(title.to_owned());
                self.root.heading_id = id;
                return Ok(());
            }
            self.diagnostics.warn_at(
                line,
                WarningKind::DuplicateTitle,
                format!("second level-1 heading `{title}` opens a section"),
            );
            return self.sections.open(&mut self.writer, line, 2, id, &title_xml);
        }

        match self.profile.kind {
            DocumentKind::Chapter => self.sections.open(&mut self.writer, line, level, id, &title_xml),
            DocumentKind::Exercises if level == 2 => {
                self.sections
                    .open_as(&mut self.writer, line, level, id, &title_xml, "subexercises")
            }
            DocumentKind::Exercises => {
                self.writer.leaf("p", &[], &format!("<alert>{title_xml}</alert>"));
                Ok(())
            }
        }
    }

    /// Heading inside a container element.
    pub(crate) fn container_heading(&mut self, title: &str) {
        let title_xml = self.inline(title);
        self.writer.leaf("p", &[], &format!("<alert>{title_xml}</alert>"));
    }
}
