//! YAML front matter.

use serde::Deserialize;

use crate::error::ConvertError;

/// Root metadata taken from the front matter block.
///
/// Other keys (`format`, `execute`, …) are ignored.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct FrontMatter {
    /// Document title.
    #[serde(default)]
    pub title: Option<String>,
    /// Root identifier.
    #[serde(default)]
    pub id: Option<String>,
}

impl FrontMatter {
    /// Parse the YAML between the `---` delimiters.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::FrontMatter`] when the YAML is invalid.
    pub fn parse(yaml: &str, line: usize) -> Result<Self, ConvertError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| ConvertError::FrontMatter {
            line,
            message: e.to_string(),
        })
    }
}
