//! Configuration types for the test harness.

use std::{num::NonZeroUsize, path::PathBuf, time::Duration};

use crate::fixture::DEFAULT_ERROR_MARKER;

/// Default path to the executable under test.
pub const DEFAULT_EXECUTABLE: &str = "./build/src/gaya";

/// Default directory containing fixtures.
pub const DEFAULT_FIXTURES_DIR: &str = "tests";

/// Default file-name suffix identifying fixtures.
pub const DEFAULT_EXTENSION: &str = ".gaya";

/// Output format for test results.
#[derive(Clone, Copy, Default, clap::ValueEnum, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable colored output, one line per fixture.
    #[default]
    Pretty,
    /// Only failing fixtures and the summary.
    Terse,
    /// `JUnit` XML format.
    Junit,
}

/// Selects which discovered fixtures get run.
#[derive(Clone, Debug, Default)]
pub struct FixtureFilter {
    /// Patterns for fixtures to be included. Empty means all.
    pub include: Vec<String>,
    /// Patterns for fixtures to be excluded.
    pub exclude: Vec<String>,
    /// Match patterns against the whole fixture name instead of a substring.
    pub exact: bool,
}

impl FixtureFilter {
    /// Returns whether a fixture with the given file name should run.
    pub fn should_run(&self, fixture_name: &str) -> bool {
        // If any include filters were given, then we are in opt-in mode.
        if !self.include.is_empty() && !self.matches_any(fixture_name, &self.include) {
            return false;
        }

        !self.matches_any(fixture_name, &self.exclude)
    }

    fn matches_any(&self, fixture_name: &str, filters: &[String]) -> bool {
        if self.exact {
            filters.iter().any(|f| f == fixture_name)
        } else {
            filters.iter().any(|f| fixture_name.contains(f.as_str()))
        }
    }
}

/// Configuration for the test runner.
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// The executable under test; each fixture path is passed as its only argument.
    pub executable: PathBuf,
    /// Directory containing the fixtures. Not searched recursively.
    pub fixtures_dir: PathBuf,
    /// File-name suffix that identifies fixtures.
    pub extension: String,
    /// Marker that flags a fixture as expected to fail when found on its first line.
    pub error_marker: String,
    /// Whether `error_marker` is a regular expression rather than literal text.
    pub marker_is_regex: bool,
    /// Maximum number of fixtures run at once.
    pub jobs: NonZeroUsize,
    /// Optional limit on how long a single run of the executable may take.
    pub timeout: Option<Duration>,
    /// Which discovered fixtures to run.
    pub filter: FixtureFilter,
}

impl RunnerConfig {
    /// Creates a new runner config with default values.
    pub fn new(executable: impl Into<PathBuf>, fixtures_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            fixtures_dir: fixtures_dir.into(),
            extension: String::from(DEFAULT_EXTENSION),
            error_marker: String::from(DEFAULT_ERROR_MARKER),
            marker_is_regex: false,
            jobs: std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
            timeout: None,
            filter: FixtureFilter::default(),
        }
    }

    /// Sets the fixture file-name suffix.
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Sets the error marker and whether it is a regular expression.
    #[must_use]
    pub fn with_error_marker(mut self, marker: impl Into<String>, is_regex: bool) -> Self {
        self.error_marker = marker.into();
        self.marker_is_regex = is_regex;
        self
    }

    /// Sets the maximum number of fixtures run at once.
    #[must_use]
    pub const fn with_jobs(mut self, jobs: NonZeroUsize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Sets the per-fixture timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the fixture filter.
    #[must_use]
    pub fn with_filter(mut self, filter: FixtureFilter) -> Self {
        self.filter = filter;
        self
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_EXECUTABLE, DEFAULT_FIXTURES_DIR)
    }
}
