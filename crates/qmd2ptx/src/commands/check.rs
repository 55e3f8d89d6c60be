//! `qmd2ptx check` command implementation.

use clap::Args;

use super::ConversionArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the check command.
#[derive(Args)]
pub(crate) struct CheckArgs {
    #[command(flatten)]
    pub common: ConversionArgs,
}

impl CheckArgs {
    /// Execute the check command.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        self.common.run(output, |input, conversion| {
            let count = conversion.warnings.len();
            let msg = if count == 0 {
                format!("{}: ok", input.display())
            } else {
                format!("{}: ok with {count} warning(s)", input.display())
            };
            output.info(&msg);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::ffi::OsStr;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: CheckArgs,
    }

    #[test]
    fn test_check_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("qmd2ptx.toml");
        std::fs::write(&config, "").unwrap();
        let good = dir.path().join("good.qmd");
        let bad = dir.path().join("bad.qmd");
        std::fs::write(&good, "# Good\n\nFine.\n").unwrap();
        std::fs::write(&bad, "::: {.important}\nNever closed.\n").unwrap();

        let harness = Harness::try_parse_from([
            OsStr::new("check"),
            good.as_os_str(),
            bad.as_os_str(),
            OsStr::new("-c"),
            config.as_os_str(),
        ])
        .unwrap();
        let err = harness.args.execute(&Output::new()).unwrap_err();

        assert!(matches!(err, CliError::Failed { failed: 1, total: 2 }));
        assert!(!dir.path().join("good.ptx").exists());
    }
}
