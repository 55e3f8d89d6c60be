//! `qmd2ptx convert` command implementation.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;

use super::ConversionArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the convert command.
#[derive(Args)]
pub(crate) struct ConvertArgs {
    #[command(flatten)]
    pub common: ConversionArgs,

    /// Output file, or directory when converting several inputs
    /// (default: `<stem>.ptx` next to each input).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ConvertArgs {
    /// Execute the convert command.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let many = self.common.inputs.len() > 1;
        if let Some(dir) = self.output.as_deref().filter(|_| many) {
            fs::create_dir_all(dir).map_err(CliError::file(dir))?;
        }

        self.common.run(output, |input, conversion| {
            let target = output_path(input, self.output.as_deref(), many);
            if target == input {
                return Err(CliError::Validation(format!(
                    "{}: refusing to overwrite the input",
                    input.display()
                )));
            }
            fs::write(&target, &conversion.xml).map_err(CliError::file(&target))?;
            output.success(&format!("Wrote {}", target.display()));
            Ok(())
        })
    }
}

/// Where the document converted from `input` is written.
///
/// `output` is a directory when several inputs are converted or when it
/// already exists as one; otherwise it names the file.
fn output_path(input: &Path, output: Option<&Path>, many: bool) -> PathBuf {
    let beside = input.with_extension("ptx");
    match output {
        None => beside,
        Some(dir) if many || dir.is_dir() => match beside.file_name() {
            Some(name) => dir.join(name),
            None => dir.to_path_buf(),
        },
        Some(file) => file.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use std::ffi::OsStr;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: ConvertArgs,
    }

    /// Run `convert` with an empty config file in `dir`.
    fn run(dir: &Path, args: &[&OsStr]) -> Result<(), CliError> {
        let config = dir.join("qmd2ptx.toml");
        fs::write(&config, "").unwrap();
        let mut argv = vec![OsStr::new("convert"), OsStr::new("-c"), config.as_os_str()];
        argv.extend_from_slice(args);
        Harness::try_parse_from(argv).unwrap().args.execute(&Output::new())
    }

    #[test]
    fn test_output_path() {
        let input = Path::new("chapters/intro.qmd");
        assert_eq!(output_path(input, None, false), Path::new("chapters/intro.ptx"));
        assert_eq!(
            output_path(input, Some(Path::new("build")), true),
            Path::new("build/intro.ptx")
        );
        assert_eq!(
            output_path(input, Some(Path::new("out.xml")), false),
            Path::new("out.xml")
        );
    }

    #[test]
    fn test_convert_writes_beside_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("intro.qmd");
        fs::write(&input, "# Introduction\n\nHello.\n").unwrap();

        run(dir.path(), &[input.as_os_str()]).unwrap();

        let xml = fs::read_to_string(dir.path().join("intro.ptx")).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
        assert!(xml.contains("<chapter xml:id=\"ch-intro\">"));
        assert!(xml.contains("<title>Introduction</title>"));
    }

    #[test]
    fn test_convert_many_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let one = dir.path().join("one.qmd");
        let two = dir.path().join("two.qmd");
        fs::write(&one, "One.\n").unwrap();
        fs::write(&two, "Two.\n").unwrap();
        let out = dir.path().join("build");

        run(
            dir.path(),
            &[one.as_os_str(), two.as_os_str(), OsStr::new("-o"), out.as_os_str()],
        )
        .unwrap();

        assert!(out.join("one.ptx").exists());
        assert!(out.join("two.ptx").exists());
    }

    #[test]
    fn test_failure_does_not_stop_other_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.qmd");
        let good = dir.path().join("good.qmd");
        fs::write(&bad, "```{r}\nx <- 1\n").unwrap();
        fs::write(&good, "Fine.\n").unwrap();

        let err = run(dir.path(), &[bad.as_os_str(), good.as_os_str()]).unwrap_err();

        assert!(matches!(err, CliError::Failed { failed: 1, total: 2 }));
        assert!(!dir.path().join("bad.ptx").exists());
        assert!(dir.path().join("good.ptx").exists());
    }

    #[test]
    fn test_deny_warnings_skips_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("odd.qmd");
        fs::write(&input, "::: {.mystery}\nText.\n:::\n").unwrap();

        let err = run(
            dir.path(),
            &[input.as_os_str(), OsStr::new("--deny-warnings")],
        )
        .unwrap_err();

        assert!(matches!(err, CliError::Failed { failed: 1, total: 1 }));
        assert!(!dir.path().join("odd.ptx").exists());

        run(dir.path(), &[input.as_os_str()]).unwrap();
        assert!(dir.path().join("odd.ptx").exists());
    }

    #[test]
    fn test_exercises_with_solutions() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ch1-exercises.qmd");
        let key = dir.path().join("key.md");
        fs::write(&input, "1. **Means.** Compute the mean.\n").unwrap();
        fs::write(&key, "1. About 4.\n").unwrap();

        run(
            dir.path(),
            &[
                input.as_os_str(),
                OsStr::new("--kind"),
                OsStr::new("exercises"),
                OsStr::new("--solutions"),
                key.as_os_str(),
            ],
        )
        .unwrap();

        let xml = fs::read_to_string(dir.path().join("ch1-exercises.ptx")).unwrap();
        assert!(xml.contains("<exercises xml:id=\"exercises-ch1-exercises\">"));
        assert!(xml.contains("<title>Means</title>"));
        assert!(xml.contains("<p>About 4.</p>"));
    }

    #[test]
    fn test_invalid_flag_combinations() {
        let dir = tempfile::tempdir().unwrap();
        let one = dir.path().join("one.qmd");
        let two = dir.path().join("two.qmd");
        fs::write(&one, "One.\n").unwrap();
        fs::write(&two, "Two.\n").unwrap();

        let err = run(
            dir.path(),
            &[one.as_os_str(), two.as_os_str(), OsStr::new("--id"), OsStr::new("x")],
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Validation(_)));

        let err = run(
            dir.path(),
            &[one.as_os_str(), OsStr::new("--solutions"), two.as_os_str()],
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Validation(_)));
    }
}
