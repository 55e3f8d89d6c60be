//! qmd2ptx CLI - Quarto markdown to PreTeXt converter.
//!
//! Provides commands for:
//! - `convert`: Write a `.ptx` document for each input
//! - `check`: Convert without writing and report problems

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CheckArgs, ConvertArgs};
use output::Output;

/// qmd2ptx - Quarto markdown to PreTeXt converter.
#[derive(Parser)]
#[command(name = "qmd2ptx", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert documents and write PreTeXt files.
    Convert(ConvertArgs),
    /// Convert documents without writing, reporting warnings and errors.
    Check(CheckArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Convert(args) => args.common.verbose,
            Self::Check(args) => args.common.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to ERROR
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Convert(args) => args.execute(&output),
        Commands::Check(args) => args.execute(&output),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use qmd2ptx_engine::{CodeBlockPolicy, DocumentKind};

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_convert_flags() {
        let cli = Cli::try_parse_from([
            "qmd2ptx",
            "convert",
            "ch1.qmd",
            "ch2.qmd",
            "--kind",
            "exercises",
            "--code-blocks",
            "listing",
            "-o",
            "out",
            "--deny-warnings",
        ])
        .unwrap();

        let Commands::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(args.common.inputs.len(), 2);
        assert_eq!(args.common.kind, DocumentKind::Exercises);
        assert_eq!(args.common.code_blocks, Some(CodeBlockPolicy::Listing));
        assert!(args.common.deny_warnings);
        assert_eq!(args.output.as_deref(), Some(std::path::Path::new("out")));
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        assert!(Cli::try_parse_from(["qmd2ptx", "check", "a.qmd", "--kind", "book"]).is_err());
        assert!(Cli::try_parse_from(["qmd2ptx", "check"]).is_err());
    }
}
