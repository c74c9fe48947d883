//! Execution of the binary under test.

use std::{
    fmt::Display,
    future::Future,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

/// Observed outcome of running the executable on one fixture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The executable exited with a zero status.
    Succeeded,
    /// The executable exited with a nonzero status, was killed, or never started.
    Failed,
}

impl From<bool> for RunOutcome {
    fn from(success: bool) -> Self {
        if success { Self::Succeeded } else { Self::Failed }
    }
}

impl Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Runs the executable under test on a fixture.
pub trait Executor: Send + Sync + 'static {
    /// Runs the fixture at `fixture` to completion and reports how it went.
    fn run(&self, fixture: &Path) -> impl Future<Output = RunOutcome> + Send;
}

/// Executor that spawns an external program, passing the fixture path as its
/// sole argument. Output of the program is discarded.
#[derive(Clone, Debug)]
pub struct ProcessExecutor {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    /// Creates an executor for the given program, without a timeout.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kills the program and reports failure if a run takes longer than `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The program this executor spawns.
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Executor for ProcessExecutor {
    async fn run(&self, fixture: &Path) -> RunOutcome {
        let mut command = tokio::process::Command::new(&self.program);
        command
            .arg(fixture)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                tracing::warn!(
                    target: "execution",
                    "failed to launch {}: {err}",
                    self.program.display()
                );
                return RunOutcome::Failed;
            }
        };

        let wait_result = if let Some(timeout) = self.timeout {
            let waited = tokio::time::timeout(timeout, child.wait()).await;
            if let Ok(result) = waited {
                result
            } else {
                tracing::warn!(
                    target: "execution",
                    "{}: timed out after {timeout:?}",
                    fixture.display()
                );
                if let Err(err) = child.kill().await {
                    tracing::debug!(target: "execution", "failed to kill timed out run: {err}");
                }
                return RunOutcome::Failed;
            }
        } else {
            child.wait().await
        };

        match wait_result {
            Ok(status) => {
                tracing::debug!(target: "execution", "{}: {status}", fixture.display());
                RunOutcome::from(status.success())
            }
            Err(err) => {
                tracing::warn!(
                    target: "execution",
                    "failed waiting on {} for {}: {err}",
                    self.program.display(),
                    fixture.display()
                );
                RunOutcome::Failed
            }
        }
    }
}
