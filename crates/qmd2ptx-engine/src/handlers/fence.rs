//! Code fences: figure chunks, listings and omitted chunks.

use tracing::debug;

use crate::cursor::Line;
use crate::fence::{FenceMetadata, FenceOpen};
use crate::profile::CodeBlockPolicy;

use super::{Session, TABLE_PREFIX};

/// Labels with these prefixes turn a chunk into a figure or table.
const FIGURE_PREFIXES: [&str; 2] = ["fig-", TABLE_PREFIX];

impl Session<'_> {
    pub(crate) fn fence(&mut self, open: &FenceOpen, body: &[Line<'_>]) {
        if !open.executable {
            self.program(open.language.as_deref(), body);
            return;
        }

        let (mut metadata, code) = FenceMetadata::parse(body);
        // Header options (`fig.cap="…"`) fill in what directives left unset
        for (key, value) in &open.attrs.attrs {
            metadata.insert_default(&key.replace('.', "-"), value);
        }
        if let Some(label) = &open.label {
            metadata.insert_default("label", label);
        }

        if !metadata.include() {
            debug!(marker = %open.marker, "Chunk excluded by include: false");
            return;
        }

        match metadata.get("label") {
            Some(label) if FIGURE_PREFIXES.iter().any(|p| label.starts_with(p)) => {
                self.chunk_figure(label, &metadata);
            }
            _ => match self.profile.code_blocks {
                CodeBlockPolicy::Omit => debug!(marker = %open.marker, "Chunk omitted"),
                CodeBlockPolicy::Listing => {
                    let echo = metadata
                        .get("echo")
                        .is_none_or(|v| !v.eq_ignore_ascii_case("false"));
                    if echo {
                        self.program(open.language.as_deref(), &code);
                    }
                }
            },
        }
    }

    fn chunk_figure(&mut self, label: &str, metadata: &FenceMetadata) {
        let (first, second) = if label.starts_with(TABLE_PREFIX) {
            ("tbl-cap", "fig-cap")
        } else {
            ("fig-cap", "tbl-cap")
        };
        let caption = metadata
            .get(first)
            .or_else(|| metadata.get(second))
            .unwrap_or_default();
        let source = format!("{}/{label}-1.png", self.profile.image_dir.trim_end_matches('/'));
        let width = self.width(metadata.get("out-width"));
        self.figure(Some(label), caption, &source, &width, metadata.get("fig-alt"));
    }

    fn program(&mut self, language: Option<&str>, code: &[Line<'_>]) {
        let lines: Vec<&str> = code.iter().map(|line| line.text).collect();
        match language {
            Some(language) => self.writer.open("program", &[("language", language)]),
            None => self.writer.open("program", &[]),
        }
        self.writer.verbatim("code", &lines);
        self.writer.close();
    }
}

#[cfg(test)]
mod tests {
    use crate::handlers::tests::body;
    use crate::profile::{CodeBlockPolicy, Profile};
    use pretty_assertions::assert_eq;

    const FIGURE_CHUNK: &str = "```{r}\n\
#| label: fig-loans\n\
#| fig-cap: |\n\
#|   Distribution of loan\n\
#|   amounts.\n\
#| out-width: 50%\n\
ggplot(loans)\n\
```\n";

    #[test]
    fn test_figure_chunk() {
        let out = body(&Profile::chapter(), FIGURE_CHUNK).unwrap();
        assert_eq!(
            out,
            "<figure xml:id=\"fig-loans\">\n  <caption>Distribution of loan amounts.</caption>\n  <image source=\"images/fig-loans-1.png\" width=\"50%\"/>\n</figure>\n"
        );
    }

    #[test]
    fn test_header_label_and_alt_text() {
        let out = body(
            &Profile::chapter().with_image_dir("img/ch1/"),
            "```{r tbl-counts, fig.alt=\"Bar chart\"}\n#| tbl-cap: Counts\ntable(x)\n```",
        )
        .unwrap();
        assert_eq!(
            out,
            "<table xml:id=\"tbl-counts\">\n  <title>Counts</title>\n  <image source=\"img/ch1/tbl-counts-1.png\" width=\"70%\">\n    <shortdescription>Bar chart</shortdescription>\n  </image>\n</table>\n"
        );
    }

    #[test]
    fn test_table_prefers_table_caption() {
        let out = body(
            &Profile::chapter(),
            "```{r}\n#| label: tbl-means\n#| fig-cap: Plot caption\n#| tbl-cap: Group means\nsummary(x)\n```",
        )
        .unwrap();
        assert_eq!(
            out,
            "<table xml:id=\"tbl-means\">\n  <title>Group means</title>\n  <image source=\"images/tbl-means-1.png\" width=\"70%\"/>\n</table>\n"
        );
    }

    #[test]
    fn test_code_block_policy() {
        let input = "```{r}\n#| echo: true\nx <- 1\n```\n\n```{r}\n#| include: false\nlibrary(dplyr)\n```";
        assert_eq!(body(&Profile::chapter(), input).unwrap(), "");

        let listing = Profile::chapter().with_code_blocks(CodeBlockPolicy::Listing);
        assert_eq!(
            body(&listing, input).unwrap(),
            "<program language=\"r\">\n  <code>\nx &lt;- 1\n  </code>\n</program>\n"
        );
    }

    #[test]
    fn test_static_fence_is_listing() {
        let out = body(&Profile::chapter(), "```python\nif a < b:\n    pass\n```").unwrap();
        assert_eq!(
            out,
            "<program language=\"python\">\n  <code>\nif a &lt; b:\n    pass\n  </code>\n</program>\n"
        );
    }
}
