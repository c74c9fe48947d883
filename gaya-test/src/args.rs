use std::{num::NonZeroUsize, path::PathBuf, time::Duration};

use clap::Parser;
use gaya_test_harness::{FixtureFilter, OutputFormat, RunnerConfig};

use crate::events;

const SHORT_DESCRIPTION: &str = "Runs gaya conformance fixtures against the gaya executable";

const LONG_DESCRIPTION: &str = r"
Runs every fixture file in a directory through the gaya executable and checks that
each run fails or succeeds as the fixture declares. A fixture whose first line
contains the error marker must make the executable exit with a nonzero status; every
other fixture must make it exit successfully.

The exit status is 0 when every fixture passes, and otherwise the number of failing
fixtures (at most 255).
";

/// Parsed command-line arguments for the harness.
#[derive(Parser, Debug)]
#[clap(name = "gaya-test",
       version,
       about = SHORT_DESCRIPTION,
       long_about = LONG_DESCRIPTION,
       disable_help_flag = true)]
pub struct CommandLineArgs {
    /// Display usage information.
    #[clap(long = "help", action = clap::ArgAction::HelpLong)]
    pub help: Option<bool>,

    /// Path to the executable under test.
    #[clap(long = "exe", default_value = gaya_test_harness::DEFAULT_EXECUTABLE, env = "GAYA_EXE")]
    pub executable: PathBuf,

    /// Directory containing the fixtures (not searched recursively).
    #[clap(
        long = "fixtures-dir",
        default_value = gaya_test_harness::DEFAULT_FIXTURES_DIR,
        env = "GAYA_TEST_FIXTURES"
    )]
    pub fixtures_dir: PathBuf,

    /// File-name suffix identifying fixtures.
    #[clap(long = "extension", default_value = gaya_test_harness::DEFAULT_EXTENSION)]
    pub extension: String,

    /// Text marking a fixture as expected to fail when found on its first line.
    #[clap(long = "error-marker", default_value = gaya_test_harness::DEFAULT_ERROR_MARKER)]
    pub error_marker: String,

    /// Treat the error marker as a regular expression.
    #[clap(long = "marker-regex")]
    pub marker_is_regex: bool,

    /// Maximum number of fixtures to run at once [default: available parallelism].
    #[clap(short = 'j', long = "jobs", env = "GAYA_TEST_JOBS")]
    pub jobs: Option<NonZeroUsize>,

    /// Fail any run of the executable that takes longer than this many seconds.
    #[clap(long = "timeout", value_name = "SECONDS")]
    pub timeout_in_seconds: Option<u64>,

    /// Output format for test results.
    #[clap(long = "format", default_value = "pretty")]
    pub format: OutputFormat,

    /// Display durations and progress details.
    #[clap(short = 'v', long = "verbose", env = "GAYA_TEST_VERBOSE")]
    pub verbose: bool,

    /// Colorize output?
    #[clap(long = "color", default_value_t = clap::ColorChoice::Auto)]
    pub color: clap::ColorChoice,

    /// List the selected fixtures without running them.
    #[clap(long = "list")]
    pub list_fixtures_only: bool,

    /// Exactly match filters (not just substring match).
    #[clap(long = "exact")]
    pub exact_match: bool,

    /// Patterns for fixtures to be excluded.
    #[clap(long = "skip", value_name = "FILTER")]
    pub exclude_filters: Vec<String>,

    /// Enable debug logging for classes of tracing events.
    #[clap(long = "debug", alias = "log-enable", value_name = "EVENT")]
    pub enabled_debug_events: Vec<events::TraceEvent>,

    /// Patterns for fixtures to be included.
    #[clap(value_name = "FILTER")]
    pub include_filters: Vec<String>,
}

impl CommandLineArgs {
    /// Builds the runner configuration these arguments describe.
    pub fn runner_config(&self) -> RunnerConfig {
        let mut config = RunnerConfig::new(&self.executable, &self.fixtures_dir)
            .with_extension(&self.extension)
            .with_error_marker(&self.error_marker, self.marker_is_regex)
            .with_timeout(self.timeout_in_seconds.map(Duration::from_secs))
            .with_filter(FixtureFilter {
                include: self.include_filters.clone(),
                exclude: self.exclude_filters.clone(),
                exact: self.exact_match,
            });

        if let Some(jobs) = self.jobs {
            config = config.with_jobs(jobs);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_project_layout() {
        let args = CommandLineArgs::parse_from(["gaya-test"]);
        let config = args.runner_config();

        assert_eq!(config.executable, PathBuf::from("./build/src/gaya"));
        assert_eq!(config.fixtures_dir, PathBuf::from("tests"));
        assert_eq!(config.extension, ".gaya");
        assert_eq!(config.error_marker, "Expect error");
        assert!(config.timeout.is_none());
        assert_eq!(args.format, OutputFormat::Pretty);
    }

    #[test]
    fn flags_flow_into_config() {
        let args = CommandLineArgs::parse_from([
            "gaya-test",
            "--exe",
            "bin/gaya",
            "--fixtures-dir",
            "conformance",
            "--extension",
            ".gy",
            "--error-marker",
            "^// error",
            "--marker-regex",
            "-j",
            "3",
            "--timeout",
            "10",
            "--skip",
            "slow",
            "--exact",
            "loop.gy",
        ]);
        let config = args.runner_config();

        assert_eq!(config.executable, PathBuf::from("bin/gaya"));
        assert_eq!(config.fixtures_dir, PathBuf::from("conformance"));
        assert_eq!(config.extension, ".gy");
        assert_eq!(config.error_marker, "^// error");
        assert!(config.marker_is_regex);
        assert_eq!(config.jobs.get(), 3);
        assert_eq!(config.timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.filter.include, ["loop.gy"]);
        assert_eq!(config.filter.exclude, ["slow"]);
        assert!(config.filter.exact);
    }

    #[test]
    fn zero_jobs_is_rejected() {
        assert!(CommandLineArgs::try_parse_from(["gaya-test", "--jobs", "0"]).is_err());
    }
}
