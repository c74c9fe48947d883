//! Reporting of fixture results.

use std::{fmt::Display, fmt::Write as _, io::Write, time::Duration};

use colored::Colorize;

use crate::config::OutputFormat;
use crate::error::HarnessError;
use crate::execution::RunOutcome;
use crate::fixture::{Expectation, Fixture};

/// Exit status used when a run was interrupted before all fixtures ran.
const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Result of running a single fixture.
#[derive(Clone, Debug)]
pub struct FixtureResult {
    /// The fixture that was run.
    pub fixture: Fixture,
    /// What the fixture declared, if it could be read.
    pub expectation: Option<Expectation>,
    /// What happened when the executable ran, if it ran at all.
    pub outcome: Option<RunOutcome>,
    /// Description of an error that kept the fixture from being checked.
    pub error: Option<String>,
    /// Time spent on the fixture.
    pub duration: Duration,
}

impl FixtureResult {
    /// Creates the result of a fixture that was read and run.
    pub fn new(
        fixture: Fixture,
        expectation: Expectation,
        outcome: RunOutcome,
        duration: Duration,
    ) -> Self {
        Self {
            fixture,
            expectation: Some(expectation),
            outcome: Some(outcome),
            error: None,
            duration,
        }
    }

    /// Creates the result of a fixture that could not be checked.
    pub fn errored(fixture: Fixture, error: impl Display, duration: Duration) -> Self {
        Self {
            fixture,
            expectation: None,
            outcome: None,
            error: Some(error.to_string()),
            duration,
        }
    }

    /// Whether the observed outcome matches the fixture's expectation.
    pub const fn passed(&self) -> bool {
        match (self.expectation, self.outcome) {
            (Some(expectation), Some(outcome)) => expectation.is_met_by(outcome),
            _ => false,
        }
    }

    /// Human-readable reason this fixture failed, or `None` if it passed.
    pub fn failure_reason(&self) -> Option<String> {
        if let Some(error) = &self.error {
            return Some(error.clone());
        }

        match (self.expectation, self.outcome) {
            (Some(expectation), Some(outcome)) if !expectation.is_met_by(outcome) => {
                Some(format!("expected {expectation}, but the run {outcome}"))
            }
            (Some(_), Some(_)) => None,
            _ => Some(String::from("fixture was not run")),
        }
    }
}

/// Aggregate counts for one harness run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of fixtures whose outcome matched their expectation.
    pub success_count: usize,
    /// Number of fixtures whose outcome did not match, or that could not be checked.
    pub failure_count: usize,
    /// Whether the run stopped before every fixture was reported.
    pub interrupted: bool,
}

impl RunSummary {
    /// Number of fixtures reported.
    pub const fn total(&self) -> usize {
        self.success_count + self.failure_count
    }

    /// Whether every fixture was reported and passed.
    pub const fn is_success(&self) -> bool {
        self.failure_count == 0 && !self.interrupted
    }

    /// Process exit status for this run: 0 if everything passed, otherwise the
    /// number of failures, saturated to the largest representable status.
    pub fn exit_code(&self) -> u8 {
        if self.interrupted {
            INTERRUPTED_EXIT_CODE
        } else {
            u8::try_from(self.failure_count).unwrap_or(u8::MAX)
        }
    }

    fn record(&mut self, passed: bool) {
        if passed {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
    }
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Summary: {} successes, {} failures",
            self.success_count, self.failure_count
        )
    }
}

/// Accumulates fixture results, writing them out as they arrive.
pub struct Reporter<W: Write> {
    writer: W,
    format: OutputFormat,
    verbose: bool,
    suite_name: String,
    summary: RunSummary,
    not_run_count: usize,
    junit_results: Vec<FixtureResult>,
    start_time: std::time::Instant,
}

impl<W: Write> Reporter<W> {
    /// Creates a reporter writing in the given format.
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            verbose: false,
            suite_name: String::from("gaya"),
            summary: RunSummary::default(),
            not_run_count: 0,
            junit_results: vec![],
            start_time: std::time::Instant::now(),
        }
    }

    /// Includes durations in the output.
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Sets the test suite name used in `JUnit` output.
    #[must_use]
    pub fn with_suite_name(mut self, name: impl Into<String>) -> Self {
        self.suite_name = name.into();
        self
    }

    /// Counts accumulated so far.
    pub const fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Records one fixture result.
    pub fn record(&mut self, result: FixtureResult) -> Result<(), HarnessError> {
        let passed = result.passed();
        self.summary.record(passed);

        match self.format {
            OutputFormat::Pretty => self.write_result_line(&result)?,
            OutputFormat::Terse if !passed => self.write_result_line(&result)?,
            OutputFormat::Terse => (),
            OutputFormat::Junit => self.junit_results.push(result),
        }

        Ok(())
    }

    /// Notes that the run stopped early, leaving `not_run` fixtures unreported.
    pub fn interrupt(&mut self, not_run: usize) {
        self.summary.interrupted = true;
        self.not_run_count = not_run;
    }

    /// Writes the closing summary and returns the final counts.
    pub fn finish(&mut self) -> Result<RunSummary, HarnessError> {
        let duration = self.start_time.elapsed();

        match self.format {
            OutputFormat::Pretty | OutputFormat::Terse => {
                if self.summary.interrupted {
                    writeln!(
                        self.writer,
                        "{}",
                        format!("Interrupted: {} fixture(s) not run", self.not_run_count)
                            .yellow()
                    )?;
                }

                writeln!(self.writer, "{}", self.summary)?;

                if self.verbose {
                    writeln!(self.writer, "ran in {duration:?}")?;
                }
            }
            OutputFormat::Junit => {
                self.write_junit()?;
                tracing::info!("{}", self.summary);
            }
        }

        self.writer.flush()?;

        Ok(self.summary.clone())
    }

    /// Consumes the reporter, returning its writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_result_line(&mut self, result: &FixtureResult) -> Result<(), HarnessError> {
        let mut line = if result.passed() {
            format!("✅ {}", result.fixture)
        } else {
            format!("❌ {}", result.fixture)
        };

        if let Some(reason) = result.failure_reason() {
            line.push_str(" (");
            line.push_str(&reason);
            line.push(')');
        }

        if self.verbose {
            write!(line, " [{:?}]", result.duration).ok();
        }

        if result.passed() {
            writeln!(self.writer, "{}", line.green())?;
        } else {
            writeln!(self.writer, "{}", line.red())?;
        }

        Ok(())
    }

    fn write_junit(&mut self) -> Result<(), HarnessError> {
        let mut suite = junit_report::TestSuite::new(&self.suite_name);

        for result in &self.junit_results {
            let name = result.fixture.to_string();
            let duration = result.duration.try_into().unwrap_or_default();

            let test_case = match result.failure_reason() {
                None => junit_report::TestCase::success(&name, duration),
                Some(reason) => {
                    junit_report::TestCase::failure(&name, duration, "fixture failure", &reason)
                }
            };

            suite.add_testcase(test_case);
        }

        let mut report = junit_report::Report::new();
        report.add_testsuite(suite);
        report
            .write_xml(&mut self.writer)
            .map_err(|err| std::io::Error::other(err.to_string()))?;
        writeln!(self.writer)?;

        Ok(())
    }
}
