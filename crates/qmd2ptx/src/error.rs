//! CLI error types.

use std::path::PathBuf;

use qmd2ptx_config::ConfigError;
use qmd2ptx_engine::ConvertError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{}: {source}", .path.display())]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Convert {
        path: PathBuf,
        source: ConvertError,
    },

    #[error("{}: {count} warning(s) with --deny-warnings", .path.display())]
    DeniedWarnings { path: PathBuf, count: usize },

    #[error("{failed} of {total} document(s) failed")]
    Failed { failed: usize, total: usize },

    #[error("{0}")]
    Validation(String),
}

impl CliError {
    pub(crate) fn file(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::File { path, source }
    }
}
