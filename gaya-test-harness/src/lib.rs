//! Conformance test harness library for the gaya language executable.
//!
//! The harness runs every fixture file found in a single directory through the
//! executable under test and checks whether the run's outcome matches what the
//! fixture declares on its first line:
//!
//! * A fixture whose first line carries the error marker (`Expect error` by
//!   default) passes only if the executable exits with a nonzero status.
//! * Every other fixture passes only if the executable exits successfully.
//!
//! Results are streamed to a [`Reporter`] in discovery order and summarized in a
//! [`RunSummary`], which also yields the harness's process exit status.

mod config;
mod error;
mod execution;
mod fixture;
mod reporting;
mod runner;

pub use config::{
    DEFAULT_EXECUTABLE, DEFAULT_EXTENSION, DEFAULT_FIXTURES_DIR, FixtureFilter, OutputFormat,
    RunnerConfig,
};
pub use error::HarnessError;
pub use execution::{Executor, ProcessExecutor, RunOutcome};
pub use fixture::{
    DEFAULT_ERROR_MARKER, Expectation, ExpectationParser, Fixture, discover_fixtures,
};
pub use reporting::{FixtureResult, Reporter, RunSummary};
pub use runner::TestRunner;
