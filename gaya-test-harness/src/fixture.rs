//! Fixture discovery and expectation parsing.

use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncReadExt};

use crate::error::HarnessError;
use crate::execution::RunOutcome;

/// Marker that, found on a fixture's first line, declares that running the
/// fixture is expected to fail.
pub const DEFAULT_ERROR_MARKER: &str = "Expect error";

/// Longest prefix of a fixture inspected when looking for its first line.
const MAX_FIRST_LINE_BYTES: u64 = 64 * 1024;

/// A single fixture file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fixture {
    path: PathBuf,
    name: String,
}

impl Fixture {
    /// Creates a fixture for the file at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        Self { path, name }
    }

    /// Path to the fixture file, as passed to the executable under test.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name of the fixture.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for Fixture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// The outcome a fixture declares for itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expectation {
    /// The executable is expected to fail on this fixture.
    Error,
    /// The executable is expected to succeed on this fixture.
    Success,
}

impl Expectation {
    /// Returns whether the observed outcome is the one this expectation asks for.
    pub const fn is_met_by(self, outcome: RunOutcome) -> bool {
        matches!(
            (self, outcome),
            (Self::Error, RunOutcome::Failed) | (Self::Success, RunOutcome::Succeeded)
        )
    }
}

impl Display for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "an error"),
            Self::Success => write!(f, "success"),
        }
    }
}

/// Classifies fixtures by looking for the error marker on their first line.
#[derive(Clone, Debug)]
pub struct ExpectationParser {
    marker: Regex,
}

impl ExpectationParser {
    /// Creates a parser looking for the given marker.
    ///
    /// Unless `is_regex` is set, the marker is literal, case-sensitive text that may
    /// appear anywhere on the first line.
    pub fn new(marker: &str, is_regex: bool) -> Result<Self, HarnessError> {
        let marker = if is_regex {
            Regex::new(marker)?
        } else {
            Regex::new(&regex::escape(marker))?
        };

        Ok(Self { marker })
    }

    /// Classifies fixture text. Only the first line is inspected.
    pub fn parse(&self, contents: &str) -> Expectation {
        let first_line = contents.lines().next().unwrap_or_default();

        if self.marker.is_match(first_line) {
            Expectation::Error
        } else {
            Expectation::Success
        }
    }

    /// Reads the first line of the fixture at `path` and classifies it.
    ///
    /// An empty file simply expects success; only I/O failures are errors.
    pub async fn read(&self, path: &Path) -> Result<Expectation, HarnessError> {
        let malformed = |source| HarnessError::MalformedFixture {
            path: path.to_owned(),
            source,
        };

        let file = tokio::fs::File::open(path).await.map_err(malformed)?;
        let mut reader = tokio::io::BufReader::new(file).take(MAX_FIRST_LINE_BYTES);

        let mut first_line = vec![];
        reader
            .read_until(b'\n', &mut first_line)
            .await
            .map_err(malformed)?;

        let expectation = self.parse(&String::from_utf8_lossy(&first_line));
        tracing::debug!(target: "expectation", "{}: expects {expectation}", path.display());

        Ok(expectation)
    }
}

/// Lists the fixtures directly inside `dir` whose file names end with `extension`.
///
/// Subdirectories and special files are skipped. Entries whose metadata cannot be
/// read (such as dangling symlinks) are kept, so that reading them later fails that
/// fixture. The result is sorted by path so that output is stable from run to run.
pub fn discover_fixtures(dir: &Path, extension: &str) -> Result<Vec<Fixture>, HarnessError> {
    let discovery_error = |source| HarnessError::Discovery {
        dir: dir.to_owned(),
        source,
    };

    let mut fixtures = vec![];
    for entry in std::fs::read_dir(dir).map_err(discovery_error)? {
        let entry = entry.map_err(discovery_error)?;
        let path = entry.path();

        if !entry.file_name().to_string_lossy().ends_with(extension) {
            continue;
        }

        // Follows symlinks.
        match std::fs::metadata(&path) {
            Ok(metadata) if metadata.is_dir() => {
                tracing::debug!(target: "discovery", "skipping directory {}", path.display());
                continue;
            }
            Ok(metadata) if !metadata.is_file() => {
                tracing::debug!(target: "discovery", "skipping special file {}", path.display());
                continue;
            }
            Ok(_) => (),
            Err(err) => {
                tracing::debug!(target: "discovery", "cannot stat {}: {err}", path.display());
            }
        }

        fixtures.push(Fixture::new(path));
    }

    fixtures.sort_by(|a, b| a.path.cmp(&b.path));

    tracing::debug!(
        target: "discovery",
        "found {} fixture(s) in {}",
        fixtures.len(),
        dir.display()
    );

    Ok(fixtures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use assert_fs::prelude::*;

    fn default_parser() -> Result<ExpectationParser> {
        Ok(ExpectationParser::new(DEFAULT_ERROR_MARKER, false)?)
    }

    #[test]
    fn marker_on_first_line_expects_error() -> Result<()> {
        let parser = default_parser()?;
        assert_eq!(parser.parse("Expect error\nlet x = 1"), Expectation::Error);
        assert_eq!(
            parser.parse("# Expect error: unbound name\nx"),
            Expectation::Error
        );
        Ok(())
    }

    #[test]
    fn marker_elsewhere_is_ignored() -> Result<()> {
        let parser = default_parser()?;
        assert_eq!(parser.parse("normal code\nExpect error"), Expectation::Success);
        assert_eq!(parser.parse(""), Expectation::Success);
        assert_eq!(parser.parse("\nExpect error"), Expectation::Success);
        Ok(())
    }

    #[test]
    fn marker_is_case_sensitive() -> Result<()> {
        let parser = default_parser()?;
        assert_eq!(parser.parse("expect error"), Expectation::Success);
        assert_eq!(parser.parse("EXPECT ERROR"), Expectation::Success);
        Ok(())
    }

    #[test]
    fn literal_marker_escapes_metacharacters() -> Result<()> {
        let parser = ExpectationParser::new("(fails)", false)?;
        assert_eq!(parser.parse("-- (fails)"), Expectation::Error);
        assert_eq!(parser.parse("-- fails"), Expectation::Success);
        Ok(())
    }

    #[test]
    fn regex_marker() -> Result<()> {
        let parser = ExpectationParser::new(r"^-- expect (error|failure)$", true)?;
        assert_eq!(parser.parse("-- expect failure\n"), Expectation::Error);
        assert_eq!(parser.parse("-- expect failure!"), Expectation::Success);
        Ok(())
    }

    #[test]
    fn invalid_regex_marker_is_rejected() {
        assert!(matches!(
            ExpectationParser::new("(unclosed", true),
            Err(HarnessError::InvalidMarker(_))
        ));
    }

    #[test]
    fn expectation_is_met_by_matching_outcome() {
        assert!(Expectation::Error.is_met_by(RunOutcome::Failed));
        assert!(!Expectation::Error.is_met_by(RunOutcome::Succeeded));
        assert!(Expectation::Success.is_met_by(RunOutcome::Succeeded));
        assert!(!Expectation::Success.is_met_by(RunOutcome::Failed));
    }

    #[tokio::test]
    async fn read_inspects_only_first_line() -> Result<()> {
        let temp_dir = assert_fs::TempDir::new()?;
        let crlf = temp_dir.child("crlf.gaya");
        crlf.write_str("Expect error\r\nlet x = 1\r\n")?;
        let late = temp_dir.child("late.gaya");
        late.write_str("let x = 1\nExpect error\n")?;
        let empty = temp_dir.child("empty.gaya");
        empty.touch()?;

        let parser = default_parser()?;
        assert_eq!(parser.read(crlf.path()).await?, Expectation::Error);
        assert_eq!(parser.read(late.path()).await?, Expectation::Success);
        assert_eq!(parser.read(empty.path()).await?, Expectation::Success);

        Ok(())
    }

    #[tokio::test]
    async fn read_tolerates_invalid_utf8() -> Result<()> {
        let temp_dir = assert_fs::TempDir::new()?;
        let fixture = temp_dir.child("binary.gaya");
        fixture.write_binary(b"\xff\xfe Expect error\n")?;

        let parser = default_parser()?;
        assert_eq!(parser.read(fixture.path()).await?, Expectation::Error);

        Ok(())
    }

    #[tokio::test]
    async fn read_stops_at_the_size_cap() -> Result<()> {
        let temp_dir = assert_fs::TempDir::new()?;
        let padding = "x".repeat(200 * 1024);

        let early = temp_dir.child("early.gaya");
        early.write_str(&format!("Expect error {padding}"))?;
        let beyond = temp_dir.child("beyond.gaya");
        beyond.write_str(&format!("{padding} Expect error"))?;

        let parser = default_parser()?;
        assert_eq!(parser.read(early.path()).await?, Expectation::Error);
        assert_eq!(parser.read(beyond.path()).await?, Expectation::Success);

        Ok(())
    }

    #[tokio::test]
    async fn read_of_missing_fixture_is_malformed() -> Result<()> {
        let temp_dir = assert_fs::TempDir::new()?;
        let parser = default_parser()?;

        let result = parser.read(&temp_dir.path().join("missing.gaya")).await;
        assert!(matches!(result, Err(HarnessError::MalformedFixture { .. })));

        Ok(())
    }

    #[test]
    fn discovery_filters_by_extension() -> Result<()> {
        let temp_dir = assert_fs::TempDir::new()?;
        temp_dir.child("b.gaya").write_str("normal code\n")?;
        temp_dir.child("a.gaya").write_str("Expect error\n")?;
        temp_dir.child("notes.txt").write_str("not a fixture\n")?;
        temp_dir.child("a.gaya.bak").write_str("stale\n")?;
        temp_dir.child("nested.gaya").create_dir_all()?;
        temp_dir.child("nested.gaya/c.gaya").write_str("hidden\n")?;

        let fixtures = discover_fixtures(temp_dir.path(), ".gaya")?;
        let names: Vec<_> = fixtures.iter().map(Fixture::name).collect();
        assert_eq!(names, ["a.gaya", "b.gaya"]);
        assert!(fixtures.iter().all(|f| f.path().starts_with(temp_dir.path())));

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn discovery_keeps_dangling_symlinks() -> Result<()> {
        let temp_dir = assert_fs::TempDir::new()?;
        temp_dir.child("a.gaya").write_str("normal code\n")?;
        std::os::unix::fs::symlink(
            temp_dir.path().join("gone.gaya.src"),
            temp_dir.path().join("broken.gaya"),
        )?;

        let fixtures = discover_fixtures(temp_dir.path(), ".gaya")?;
        let names: Vec<_> = fixtures.iter().map(Fixture::name).collect();
        assert_eq!(names, ["a.gaya", "broken.gaya"]);

        Ok(())
    }

    #[test]
    fn discovery_of_empty_dir_yields_nothing() -> Result<()> {
        let temp_dir = assert_fs::TempDir::new()?;
        assert!(discover_fixtures(temp_dir.path(), ".gaya")?.is_empty());
        Ok(())
    }

    #[test]
    fn discovery_of_missing_dir_fails() -> Result<()> {
        let temp_dir = assert_fs::TempDir::new()?;
        let result = discover_fixtures(&temp_dir.path().join("missing"), ".gaya");
        assert!(matches!(result, Err(HarnessError::Discovery { .. })));
        Ok(())
    }

    #[test]
    fn fixture_displays_its_path() {
        let fixture = Fixture::new("tests/while.gaya");
        assert_eq!(fixture.name(), "while.gaya");
        assert_eq!(fixture.to_string(), "tests/while.gaya");
    }
}
