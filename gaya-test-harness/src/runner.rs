//! Test runner implementation.

use std::{future::Future, io::Write, sync::Arc};

use tokio::sync::Semaphore;

use crate::config::RunnerConfig;
use crate::error::HarnessError;
use crate::execution::{Executor, ProcessExecutor};
use crate::fixture::{ExpectationParser, Fixture, discover_fixtures};
use crate::reporting::{FixtureResult, Reporter, RunSummary};

/// Runs every fixture in a directory and reports how each one fared.
pub struct TestRunner<E: Executor = ProcessExecutor> {
    config: RunnerConfig,
    parser: Arc<ExpectationParser>,
    executor: Arc<E>,
}

impl TestRunner<ProcessExecutor> {
    /// Creates a runner that spawns the configured executable for each fixture.
    pub fn new(config: RunnerConfig) -> Result<Self, HarnessError> {
        let executor = ProcessExecutor::new(&config.executable).with_timeout(config.timeout);
        Self::with_executor(config, executor)
    }
}

impl<E: Executor> TestRunner<E> {
    /// Creates a runner that uses the given executor for each fixture.
    pub fn with_executor(config: RunnerConfig, executor: E) -> Result<Self, HarnessError> {
        let parser = ExpectationParser::new(&config.error_marker, config.marker_is_regex)?;

        Ok(Self {
            config,
            parser: Arc::new(parser),
            executor: Arc::new(executor),
        })
    }

    /// The configuration this runner was created with.
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Lists the fixtures this runner would run, in the order they are reported.
    pub fn discover(&self) -> Result<Vec<Fixture>, HarnessError> {
        let mut fixtures = discover_fixtures(&self.config.fixtures_dir, &self.config.extension)?;
        fixtures.retain(|fixture| self.config.filter.should_run(fixture.name()));

        Ok(fixtures)
    }

    /// Runs all fixtures, feeding results to `reporter`, and returns the summary.
    pub async fn run<W: Write>(
        &self,
        reporter: &mut Reporter<W>,
    ) -> Result<RunSummary, HarnessError> {
        self.run_until(reporter, std::future::pending()).await
    }

    /// Like [`TestRunner::run`], but stops early once `shutdown` completes.
    ///
    /// Fixtures still in flight at that point are abandoned; the returned summary
    /// covers only fixtures already reported and is marked as interrupted.
    pub async fn run_until<W: Write>(
        &self,
        reporter: &mut Reporter<W>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<RunSummary, HarnessError> {
        // Discovery failures abort the run before anything is reported.
        let fixtures = self.discover()?;

        tracing::info!(
            target: "runner",
            "running {} fixture(s) from {} with {} job(s)",
            fixtures.len(),
            self.config.fixtures_dir.display(),
            self.config.jobs
        );

        // Spawn everything up front; the semaphore bounds how many run at once.
        let semaphore = Arc::new(Semaphore::new(self.config.jobs.get()));
        let mut pending = fixtures
            .into_iter()
            .map(|fixture| {
                let task = tokio::spawn(run_fixture(
                    fixture.clone(),
                    Arc::clone(&self.parser),
                    Arc::clone(&self.executor),
                    Arc::clone(&semaphore),
                ));
                (fixture, task)
            })
            .collect::<Vec<_>>()
            .into_iter();

        let mut shutdown = std::pin::pin!(shutdown);

        // Await results in discovery order so output never depends on scheduling.
        while let Some((fixture, mut task)) = pending.next() {
            let result = tokio::select! {
                biased;

                () = &mut shutdown => {
                    task.abort();
                    let mut not_run = 1;
                    for (_, remaining) in pending.by_ref() {
                        remaining.abort();
                        not_run += 1;
                    }

                    tracing::warn!(target: "runner", "run interrupted; {not_run} fixture(s) not run");
                    reporter.interrupt(not_run);
                    break;
                }

                joined = &mut task => match joined {
                    Ok(result) => result,
                    Err(err) => {
                        tracing::warn!(target: "runner", "{fixture}: fixture task failed: {err}");
                        FixtureResult::errored(fixture, err, std::time::Duration::ZERO)
                    }
                },
            };

            if let Err(err) = reporter.record(result) {
                for (_, remaining) in pending.by_ref() {
                    remaining.abort();
                }
                return Err(err);
            }
        }

        reporter.finish()
    }
}

async fn run_fixture<E: Executor>(
    fixture: Fixture,
    parser: Arc<ExpectationParser>,
    executor: Arc<E>,
    semaphore: Arc<Semaphore>,
) -> FixtureResult {
    let Ok(_permit) = semaphore.acquire_owned().await else {
        return FixtureResult::errored(
            fixture,
            "fixture scheduling was shut down",
            std::time::Duration::ZERO,
        );
    };

    let start_time = std::time::Instant::now();

    // An unreadable fixture fails on its own without affecting the rest of the run.
    let expectation = match parser.read(fixture.path()).await {
        Ok(expectation) => expectation,
        Err(err) => {
            tracing::warn!(target: "runner", "{err}");
            return FixtureResult::errored(fixture, err, start_time.elapsed());
        }
    };

    let outcome = executor.run(fixture.path()).await;

    FixtureResult::new(fixture, expectation, outcome, start_time.elapsed())
}
