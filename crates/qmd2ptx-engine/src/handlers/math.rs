//! Display math: `<me>` for a single expression, `<md>` with rows otherwise.

use std::sync::LazyLock;

use regex::Regex;

use crate::inline::span::escape_content;

use super::Session;

static ENVIRONMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\(?:begin|end)\{(?:aligned|align)\*?\}").unwrap());

/// Display math split for output.
#[derive(Debug, PartialEq, Eq)]
enum DisplayMath {
    Single(String),
    Rows(Vec<String>),
}

/// Decide between a single expression and rows, and clean up the rows.
fn display_math(rows: &[&str]) -> Option<DisplayMath> {
    let lines: Vec<&str> = rows
        .iter()
        .map(|row| row.trim())
        .filter(|row| !row.is_empty())
        .collect();
    if lines.is_empty() {
        return None;
    }

    let multi = lines.len() > 1 || lines.iter().any(|l| l.contains("\\\\") || l.contains('&'));
    if !multi {
        return Some(DisplayMath::Single(lines[0].to_owned()));
    }

    let joined = ENVIRONMENT_RE.replace_all(&lines.join("\n"), "").into_owned();
    let split: Vec<String> = if joined.contains("\\\\") {
        joined
            .split("\\\\")
            .map(|row| row.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect()
    } else {
        joined.lines().map(|row| row.trim().to_owned()).collect()
    };
    let rows: Vec<String> = split
        .into_iter()
        .filter(|row| !row.is_empty())
        .map(|row| alignment_points(&row))
        .collect();

    match rows.len() {
        0 => None,
        _ => Some(DisplayMath::Rows(rows)),
    }
}

/// Replace unescaped `&` with the `\amp` macro.
fn alignment_points(row: &str) -> String {
    let mut out = String::with_capacity(row.len() + 8);
    let mut escaped = false;
    for c in row.chars() {
        if c == '&' && !escaped {
            out.push_str("\\amp ");
        } else {
            out.push(c);
        }
        escaped = c == '\\' && !escaped;
    }
    out
}

impl Session<'_> {
    pub(crate) fn display_math(&mut self, rows: &[&str], id: Option<&str>) {
        let Some(math) = display_math(rows) else {
            return;
        };
        let id_attr: Vec<(&str, &str)> = id.map(|id| ("xml:id", id)).into_iter().collect();

        self.writer.open("p", &[]);
        match math {
            DisplayMath::Single(expr) => {
                self.writer.leaf("me", &id_attr, &escape_content(&expr));
            }
            DisplayMath::Rows(rows) => {
                self.writer.open("md", &id_attr);
                for row in rows {
                    self.writer.leaf("mrow", &[], &escape_content(&row));
                }
                self.writer.close();
            }
        }
        self.writer.close();
    }
}
