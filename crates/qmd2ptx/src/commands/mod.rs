//! CLI command implementations.
//!
//! Both commands share [`ConversionArgs`]: configuration is loaded once,
//! then every input is converted on its own.

pub(crate) mod check;
pub(crate) mod convert;

pub(crate) use check::CheckArgs;
pub(crate) use convert::ConvertArgs;

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use qmd2ptx_config::{CliSettings, Config};
use qmd2ptx_engine::{
    CitationPolicy, CodeBlockPolicy, Conversion, Converter, DocumentKind, SolutionBook,
};
use tracing::info;

use crate::error::CliError;
use crate::output::Output;

/// Options shared by every command that converts documents.
#[derive(Args)]
pub(crate) struct ConversionArgs {
    /// Quarto markdown documents.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Document type.
    #[arg(long, default_value_t = DocumentKind::Chapter)]
    pub kind: DocumentKind,

    /// Root xml:id (single input only).
    #[arg(long)]
    pub id: Option<String>,

    /// Solutions file for exercise sets.
    #[arg(long, value_name = "FILE")]
    pub solutions: Option<PathBuf>,

    /// Figure image directory (overrides config).
    #[arg(long, value_name = "DIR")]
    pub image_dir: Option<String>,

    /// Executable chunks: omit or listing (overrides config).
    #[arg(long)]
    pub code_blocks: Option<CodeBlockPolicy>,

    /// Citations: xref or drop (overrides config).
    #[arg(long)]
    pub citations: Option<CitationPolicy>,

    /// Path to configuration file (default: auto-discover qmd2ptx.toml).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Fail a document that produces warnings.
    #[arg(long)]
    pub deny_warnings: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Settings resolved once per run.
pub(crate) struct Batch {
    config: Config,
    solutions: Option<SolutionBook>,
}

impl ConversionArgs {
    /// Validate flag combinations and load configuration and solutions.
    pub(crate) fn prepare(&self) -> Result<Batch, CliError> {
        if self.id.is_some() && self.inputs.len() > 1 {
            return Err(CliError::Validation(
                "--id needs exactly one input".to_owned(),
            ));
        }
        if self.solutions.is_some() && self.kind != DocumentKind::Exercises {
            return Err(CliError::Validation(
                "--solutions needs --kind exercises".to_owned(),
            ));
        }

        let cli_settings = CliSettings {
            image_dir: self.image_dir.clone(),
            code_blocks: self.code_blocks,
            citations: self.citations,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        if let Some(path) = &config.config_path {
            info!(path = %path.display(), "Loaded configuration");
        }

        let solutions = match &self.solutions {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(CliError::file(path))?;
                let book = SolutionBook::parse(&text);
                info!(path = %path.display(), solutions = book.len(), "Loaded solutions");
                Some(book)
            }
            None => None,
        };

        Ok(Batch { config, solutions })
    }

    /// Converter for one input; the file stem seeds the derived root id.
    fn converter(&self, config: &Config, input: &Path) -> Converter {
        let mut profile = config.profile(self.kind);
        if let Some(stem) = input.file_stem() {
            profile = profile.with_source_stem(stem.to_string_lossy());
        }
        if let Some(id) = &self.id {
            profile = profile.with_root_id(id.as_str());
        }
        Converter::new(profile)
    }

    fn convert_one(&self, batch: &Batch, input: &Path) -> Result<Conversion, CliError> {
        let text = fs::read_to_string(input).map_err(CliError::file(input))?;
        info!(path = %input.display(), kind = %self.kind, "Converting");
        self.converter(&batch.config, input)
            .convert(&text, batch.solutions.as_ref())
            .map_err(|source| CliError::Convert {
                path: input.to_path_buf(),
                source,
            })
    }

    /// Convert every input and hand each result to `sink`.
    ///
    /// A failing input is reported and the remaining inputs still run.
    pub(crate) fn run<F>(&self, output: &Output, mut sink: F) -> Result<(), CliError>
    where
        F: FnMut(&Path, &Conversion) -> Result<(), CliError>,
    {
        let batch = self.prepare()?;
        let mut failed = 0;

        for input in &self.inputs {
            let result = self.convert_one(&batch, input).and_then(|conversion| {
                output.warnings(input, &conversion.warnings);
                if self.deny_warnings && !conversion.warnings.is_empty() {
                    return Err(CliError::DeniedWarnings {
                        path: input.clone(),
                        count: conversion.warnings.len(),
                    });
                }
                sink(input, &conversion)
            });
            if let Err(err) = result {
                output.error(&err.to_string());
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(CliError::Failed {
                failed,
                total: self.inputs.len(),
            });
        }
        Ok(())
    }
}
