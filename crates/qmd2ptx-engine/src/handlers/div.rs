//! Custom divs: callouts, worked examples, guided practice and friends.
//!
//! Two-phase containers (worked examples and exercises) split their body
//! into a statement and a solution. The split point is searched at div
//! depth zero and outside code fences, so a separator inside a nested div
//! or a listing never counts.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::attrs::{Attributes, DivFence, split_trailing_attributes};
use crate::classify::{BlockKind, classify, parse_heading};
use crate::cursor::Line;
use crate::error::ConvertError;
use crate::fence::FenceTracker;
use crate::profile::Profile;

use super::{Context, Session};

static STRONG_TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+?)\*\*[.:]?").unwrap());

/// Headings that only announce the solution part.
const SOLUTION_HEADINGS: [&str; 2] = ["solution", "answer"];

/// What a div class turns into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DivKind {
    Data,
    Important,
    WorkedExample,
    Exercise,
    Introduction,
    Callout,
    Transparent,
    Skipped,
    Unknown,
}

impl DivKind {
    fn of(attrs: &Attributes, profile: &Profile) -> Self {
        if attrs.classes.iter().any(|class| profile.skips(class)) {
            return Self::Skipped;
        }
        match attrs.classes.first().map(String::as_str) {
            Some("data") => Self::Data,
            Some("important") => Self::Important,
            Some("workedexample") => Self::WorkedExample,
            Some("guidedpractice" | "exercise") => Self::Exercise,
            Some("chapterintro") => Self::Introduction,
            Some("exercises") => Self::Transparent,
            Some(class) if class.starts_with("callout-") => Self::Callout,
            _ => Self::Unknown,
        }
    }
}

/// Index of the first line at div depth zero, outside fences, matching `pred`.
fn find_top_level<F>(lines: &[Line<'_>], mut pred: F) -> Option<usize>
where
    F: FnMut(&Line<'_>, Option<&DivFence>) -> bool,
{
    let mut fences = FenceTracker::new();
    let mut depth = 0usize;
    for (idx, line) in lines.iter().enumerate() {
        if fences.update(line.text) || fences.in_fence() {
            continue;
        }
        let fence = DivFence::parse(line.text);
        if depth == 0 && pred(line, fence.as_ref()) {
            return Some(idx);
        }
        match fence {
            Some(DivFence::Open { .. }) => depth += 1,
            Some(DivFence::Close { .. }) => depth = depth.saturating_sub(1),
            None => {}
        }
    }
    None
}

/// Index of the close matching the div opened at `open`.
fn matching_close(lines: &[Line<'_>], open: usize) -> Option<usize> {
    let rest = lines.get(open + 1..)?;
    // Depth zero within `rest` is directly inside the div at `open`
    find_top_level(rest, |_, fence| matches!(fence, Some(DivFence::Close { .. })))
        .map(|idx| open + 1 + idx)
}

/// Leading heading title and the index of the line after it.
fn leading_heading<'a>(lines: &[Line<'a>]) -> Option<(&'a str, usize)> {
    let idx = lines.iter().position(|line| !line.is_blank())?;
    let (_, raw) = parse_heading(lines[idx].text.trim())?;
    let title = split_trailing_attributes(raw).map_or(raw, |(title, _)| title);
    Some((title, idx + 1))
}

fn is_solution_heading(title: &str) -> bool {
    let title = title.trim().trim_end_matches([':', '.']).trim();
    SOLUTION_HEADINGS
        .iter()
        .any(|heading| title.eq_ignore_ascii_case(heading))
}

/// Drop a leading `Solution`/`Answer` heading.
fn strip_solution_heading<'s, 'a>(lines: &'s [Line<'a>]) -> &'s [Line<'a>] {
    match leading_heading(lines) {
        Some((title, after)) if is_solution_heading(title) => &lines[after..],
        _ => lines,
    }
}

fn is_blank(lines: &[Line<'_>]) -> bool {
    lines.iter().all(Line::is_blank)
}

/// First `**strong**` span of a line as a title, and the line without it.
pub(super) fn strong_title(text: &str) -> Option<(String, String)> {
    let m = STRONG_TITLE_RE.captures(text)?;
    let whole = m.get(0)?;
    let title = m[1].trim().trim_end_matches(['.', ':']).trim().to_owned();
    if title.is_empty() {
        return None;
    }
    let before = text[..whole.start()].trim();
    let after = text[whole.end()..].trim();
    let rest = match (before.is_empty(), after.is_empty()) {
        (false, false) => format!("{before} {after}"),
        _ => format!("{before}{after}"),
    };
    Some((title, rest))
}

impl Session<'_> {
    pub(crate) fn div(
        &mut self,
        line: usize,
        annotation: &str,
        attrs: &Attributes,
        body: &[Line<'_>],
        context: Context,
    ) -> Result<(), ConvertError> {
        let kind = DivKind::of(attrs, self.profile);
        debug!(line, kind = ?kind, "Div");

        match kind {
            DivKind::Skipped => Ok(()),
            DivKind::Transparent => self.convert_lines(body, context),
            DivKind::Unknown => {
                self.unrecognized(line, format!("unrecognized div `{annotation}`; content kept"));
                self.convert_lines(body, context)
            }
            DivKind::Data => {
                self.open_container("note", attrs);
                self.writer.leaf("title", &[], "Data");
                self.container(body)
            }
            DivKind::Introduction => {
                self.open_container("introduction", attrs);
                self.container(body)
            }
            DivKind::Callout => {
                self.open_container("note", attrs);
                let body = match (attrs.get("title"), leading_heading(body)) {
                    (Some(title), _) => {
                        self.title(title);
                        body
                    }
                    (None, Some((title, after))) => {
                        self.title(title);
                        &body[after..]
                    }
                    (None, None) => body,
                };
                self.container(body)
            }
            DivKind::Important => self.important(attrs, body),
            DivKind::WorkedExample => self.worked_example(attrs, body),
            DivKind::Exercise => self.exercise_div(attrs, body),
        }
    }

    fn open_container(&mut self, element: &'static str, attrs: &Attributes) {
        match &attrs.id {
            Some(id) => self.writer.open(element, &[("xml:id", id.as_str())]),
            None => self.writer.open(element, &[]),
        }
    }

    /// Convert a body inside the open container, then close it.
    fn container(&mut self, body: &[Line<'_>]) -> Result<(), ConvertError> {
        self.convert_lines(body, Context::Container)?;
        self.writer.close();
        Ok(())
    }

    /// `<name>` wrapping converted lines.
    pub(super) fn part(
        &mut self,
        element: &'static str,
        chunks: &[&[Line<'_>]],
    ) -> Result<(), ConvertError> {
        if chunks.iter().all(|chunk| is_blank(chunk)) {
            return Ok(());
        }
        self.writer.open(element, &[]);
        for chunk in chunks {
            self.convert_lines(chunk, Context::Container)?;
        }
        self.writer.close();
        Ok(())
    }

    pub(super) fn title(&mut self, title: &str) {
        let xml = self.inline(title);
        self.writer.leaf("title", &[], xml.trim());
    }

    fn important(&mut self, attrs: &Attributes, body: &[Line<'_>]) -> Result<(), ConvertError> {
        self.open_container("assemblage", attrs);

        let first = body.iter().position(|line| !line.is_blank());
        let promoted = first.and_then(|idx| Some((idx, strong_title(body[idx].text)?)));
        let Some((idx, (title, rest))) = promoted else {
            return self.container(body);
        };

        self.title(&title);
        let mut lines = body.to_vec();
        lines[idx] = Line::new(lines[idx].number, &rest);
        self.container(&lines)
    }

    fn worked_example(&mut self, attrs: &Attributes, body: &[Line<'_>]) -> Result<(), ConvertError> {
        self.open_container("example", attrs);
        let body = match leading_heading(body) {
            Some((title, after)) => {
                self.title(title);
                &body[after..]
            }
            None => body,
        };

        let rule = find_top_level(body, |line, fence| {
            fence.is_none() && classify(line, &[]) == BlockKind::Rule
        });
        let Some(rule) = rule else {
            return self.container(body);
        };

        self.part("statement", &[&body[..rule]])?;
        self.part("solution", &[strip_solution_heading(&body[rule + 1..])])?;
        self.writer.close();
        Ok(())
    }

    fn exercise_div(&mut self, attrs: &Attributes, body: &[Line<'_>]) -> Result<(), ConvertError> {
        self.open_container("exercise", attrs);
        let body = match leading_heading(body) {
            Some((title, after)) if !is_solution_heading(title) => {
                self.title(title);
                &body[after..]
            }
            _ => body,
        };

        let callout = find_top_level(body, |_, fence| {
            matches!(fence, Some(DivFence::Open { attrs, .. })
                if attrs.classes.iter().any(|c| c.starts_with("callout-")))
        });

        if let Some(open) = callout {
            let close = matching_close(body, open).unwrap_or(body.len());
            let inside = strip_solution_heading(&body[open + 1..close]);
            let after = body.get(close + 1..).unwrap_or_default();
            self.part("statement", &[&body[..open]])?;
            self.part("solution", &[inside, after])?;
        } else if let Some(heading) = find_top_level(body, |line, fence| {
            fence.is_none()
                && parse_heading(line.text.trim()).is_some_and(|(_, title)| is_solution_heading(title))
        }) {
            self.part("statement", &[&body[..heading]])?;
            self.part("solution", &[&body[heading + 1..]])?;
        } else {
            self.part("statement", &[body])?;
        }

        self.writer.close();
        Ok(())
    }
}
