//! Shared behavioural-test state for build-context scenarios.

use std::sync::Arc;

use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;
use tempfile::TempDir;

/// Step result type for build-context BDD tests.
pub type StepResult<T> = Result<T, String>;

/// Temporary context directory used by a scenario.
#[derive(Clone)]
pub struct ContextDir {
    /// Keeps the temporary directory alive for the full scenario.
    pub(crate) _temp_dir: Arc<TempDir>,

    /// UTF-8 path to the context root.
    pub(crate) path: Utf8PathBuf,
}

impl ContextDir {
    /// Create a new empty context directory.
    pub(crate) fn new() -> StepResult<Self> {
        let temp_dir = tempfile::tempdir()
            .map_err(|error| format!("failed to create temporary context directory: {error}"))?;

        let utf8_path = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf())
            .map_err(|_| String::from("temporary context path should be valid UTF-8"))?;

        Ok(Self {
            _temp_dir: Arc::new(temp_dir),
            path: utf8_path,
        })
    }
}

/// Categorised archiving failures for assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The Dockerfile could not be found.
    DockerfileNotFound,
    /// An ignore pattern was malformed.
    InvalidIgnorePattern,
    /// Any other failure.
    Other,
}

/// Outcome of archiving a context.
#[derive(Clone)]
pub enum ArchiveOutcome {
    /// The archive was produced.
    Archived {
        /// Entry names in archive order.
        entries: Vec<String>,
        /// Canonical Dockerfile name inside the archive.
        dockerfile: String,
    },

    /// Archiving failed.
    Failed {
        /// The failure category.
        kind: FailureKind,
        /// Human-readable error message.
        message: String,
    },
}

/// Shared scenario state for build-context behavioural tests.
#[derive(Default, ScenarioState)]
pub struct BuildContextState {
    /// Scenario-scoped context directory.
    pub(crate) context_dir: Slot<ContextDir>,

    /// Lines written to `.dockerignore`, in order.
    pub(crate) ignore_lines: Slot<Vec<String>>,

    /// Outcome of the most recent archiving attempt.
    pub(crate) outcome: Slot<ArchiveOutcome>,
}

/// Fixture providing fresh state for each build-context scenario.
#[fixture]
pub fn build_context_state() -> BuildContextState {
    let state = BuildContextState::default();
    state.ignore_lines.set(Vec::new());
    state
}
