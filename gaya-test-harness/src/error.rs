use std::path::PathBuf;

/// Errors raised by the test harness.
#[derive(thiserror::Error, Debug)]
pub enum HarnessError {
    /// The fixture directory could not be listed. Fatal to the whole run.
    #[error("failed to read fixture directory {}: {source}", .dir.display())]
    Discovery {
        /// The directory that was being listed.
        dir: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A single fixture could not be read. Only fails that fixture.
    #[error("failed to read fixture {}: {source}", .path.display())]
    MalformedFixture {
        /// The fixture that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The configured error marker is not a valid pattern.
    #[error("invalid error marker: {0}")]
    InvalidMarker(#[from] regex::Error),

    /// Results could not be written out.
    #[error("failed to write test report: {0}")]
    Report(#[from] std::io::Error),
}
