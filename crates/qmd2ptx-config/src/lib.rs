//! Configuration management for qmd2ptx.
//!
//! Parses `qmd2ptx.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories. A loaded
//! [`Config`] turns into an engine [`Profile`] for each document kind.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `output.image_dir`
//! - `output.figure_width`
//! - `chapter.id_prefix`
//! - `exercises.id_prefix`

mod expand;

use qmd2ptx_engine::{
    CitationPolicy, CodeBlockPolicy, DEFAULT_SKIP_DIVS, DEFAULT_XREF_PREFIXES, DocumentKind,
    Profile,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the figure image directory.
    pub image_dir: Option<String>,
    /// Override the default figure width.
    pub figure_width: Option<String>,
    /// Override the executable chunk policy.
    pub code_blocks: Option<CodeBlockPolicy>,
    /// Override the citation policy.
    pub citations: Option<CitationPolicy>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "qmd2ptx.toml";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output settings shared by every document kind.
    pub output: OutputConfig,
    /// Chapter documents.
    pub chapter: KindConfig,
    /// Exercise-set documents.
    pub exercises: KindConfig,
    /// Custom div handling.
    pub divs: DivsConfig,
    /// Cross-reference recognition.
    pub xref: XrefConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Output configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory figure images are referenced from.
    pub image_dir: String,
    /// Default figure width, as a percentage.
    pub figure_width: String,
    /// What to do with executable chunks that are not figures.
    pub code_blocks: CodeBlockPolicy,
    /// What to do with bibliography citations.
    pub citations: CitationPolicy,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            image_dir: "images".to_owned(),
            figure_width: "70%".to_owned(),
            code_blocks: CodeBlockPolicy::default(),
            citations: CitationPolicy::default(),
        }
    }
}

/// Per-kind configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct KindConfig {
    /// Prefix for derived root identifiers; the kind's default when unset.
    pub id_prefix: Option<String>,
}

/// Div configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DivsConfig {
    /// Div classes dropped together with their content.
    pub skip: Vec<String>,
}

impl Default for DivsConfig {
    fn default() -> Self {
        Self {
            skip: DEFAULT_SKIP_DIVS.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

/// Cross-reference configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct XrefConfig {
    /// Kinds recognized in `@kind-id` references.
    pub prefixes: Vec<String>,
}

impl Default for XrefConfig {
    fn default() -> Self {
        Self {
            prefixes: DEFAULT_XREF_PREFIXES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`output.image_dir`").
        field: String,
        /// Error message (e.g., "${`CHAPTER`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a width of the form `N%` with `1 <= N <= 100`.
fn require_percentage(value: &str, field: &str) -> Result<(), ConfigError> {
    let percent = value
        .strip_suffix('%')
        .and_then(|n| n.parse::<u32>().ok())
        .filter(|n| (1..=100).contains(n));
    if percent.is_none() {
        return Err(ConfigError::Validation(format!(
            "{field} must be a percentage between 1% and 100%, got \"{value}\""
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `qmd2ptx.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading, allowing CLI arguments to take
    /// precedence over config file values. The result is validated once more
    /// after overrides.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or a value is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(image_dir) = &settings.image_dir {
            self.output.image_dir.clone_from(image_dir);
        }
        if let Some(figure_width) = &settings.figure_width {
            self.output.figure_width.clone_from(figure_width);
        }
        if let Some(code_blocks) = settings.code_blocks {
            self.output.code_blocks = code_blocks;
        }
        if let Some(citations) = settings.citations {
            self.output.citations = citations;
        }
    }

    /// Conversion profile for a document kind.
    #[must_use]
    pub fn profile(&self, kind: DocumentKind) -> Profile {
        let id_prefix = match kind {
            DocumentKind::Chapter => self.chapter.id_prefix.as_deref(),
            DocumentKind::Exercises => self.exercises.id_prefix.as_deref(),
        }
        .unwrap_or(kind.default_id_prefix());

        Profile::new(kind)
            .with_id_prefix(id_prefix)
            .with_image_dir(self.output.image_dir.as_str())
            .with_figure_width(self.output.figure_width.as_str())
            .with_code_blocks(self.output.code_blocks)
            .with_citations(self.output.citations)
            .with_skip_divs(self.divs.skip.iter().cloned())
            .with_xref_prefixes(self.xref.prefixes.iter().cloned())
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::discover_from(&current)
    }

    /// Search for config file in `start` and its parents.
    fn discover_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;
        config.config_path = Some(path.to_path_buf());

        // Validate configuration after loading and expansion
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after applying CLI
    /// settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_output()?;
        self.validate_kinds()?;
        self.validate_lists()?;
        Ok(())
    }

    fn validate_output(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.output.image_dir, "output.image_dir")?;
        require_percentage(&self.output.figure_width, "output.figure_width")?;
        Ok(())
    }

    fn validate_kinds(&self) -> Result<(), ConfigError> {
        if let Some(prefix) = &self.chapter.id_prefix {
            require_non_empty(prefix, "chapter.id_prefix")?;
        }
        if let Some(prefix) = &self.exercises.id_prefix {
            require_non_empty(prefix, "exercises.id_prefix")?;
        }
        Ok(())
    }

    fn validate_lists(&self) -> Result<(), ConfigError> {
        for class in &self.divs.skip {
            require_non_empty(class, "divs.skip entry")?;
        }
        if self.xref.prefixes.is_empty() {
            return Err(ConfigError::Validation(
                "xref.prefixes needs at least one prefix".to_owned(),
            ));
        }
        for prefix in &self.xref.prefixes {
            require_non_empty(prefix, "xref.prefixes entry")?;
            if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(ConfigError::Validation(format!(
                    "xref.prefixes entry \"{prefix}\" must be alphanumeric"
                )));
            }
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.output.image_dir = expand::expand_env(&self.output.image_dir, "output.image_dir")?;
        self.output.figure_width =
            expand::expand_env(&self.output.figure_width, "output.figure_width")?;

        if let Some(ref prefix) = self.chapter.id_prefix {
            self.chapter.id_prefix = Some(expand::expand_env(prefix, "chapter.id_prefix")?);
        }
        if let Some(ref prefix) = self.exercises.id_prefix {
            self.exercises.id_prefix = Some(expand::expand_env(prefix, "exercises.id_prefix")?);
        }

        Ok(())
    }
}
