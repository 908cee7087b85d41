//! Shared behavioural-test state for image-operation scenarios.

use std::sync::Arc;

use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;
use tempfile::TempDir;

/// Step result type for image-operation BDD tests.
pub type StepResult<T> = Result<T, String>;

/// Temporary build context used by a scenario.
#[derive(Clone)]
pub struct ContextDir {
    /// Keeps the temporary directory alive for the full scenario.
    pub(crate) _temp_dir: Arc<TempDir>,

    /// UTF-8 path to the context root.
    pub(crate) path: Utf8PathBuf,
}

/// What the mocked engine observed for one request.
#[derive(Debug, Clone, Default)]
pub struct EngineCall {
    /// Repository (push), `fromImage` (pull), or `None` for builds.
    pub(crate) repository: Option<String>,
    /// Tag query parameter, or the build's `t` parameter.
    pub(crate) tag: Option<String>,
    /// User name from the credentials sent, if any.
    pub(crate) username: Option<String>,
    /// Size of the build context body in bytes.
    pub(crate) context_len: usize,
}

/// Outcome of the most recent operation.
#[derive(Clone)]
pub enum OperationOutcome {
    /// The operation completed.
    Succeeded,

    /// The operation failed.
    Failed {
        /// Name of the `ImageError` variant, or `Other`.
        kind: String,
        /// Human-readable error message.
        message: String,
    },
}

/// Shared scenario state for image-operation behavioural tests.
#[derive(Default, ScenarioState)]
pub struct ImageOperationsState {
    /// Registry user name to configure.
    pub(crate) username: Slot<String>,

    /// Registry address to configure.
    pub(crate) registry_address: Slot<String>,

    /// Error the engine embeds in its progress stream.
    pub(crate) reported_error: Slot<String>,

    /// Scenario-scoped build context.
    pub(crate) context_dir: Slot<ContextDir>,

    /// Requests observed by the mocked engine.
    pub(crate) engine_calls: Slot<Vec<EngineCall>>,

    /// Outcome of the most recent operation.
    pub(crate) outcome: Slot<OperationOutcome>,
}

/// Fixture providing fresh state for each image-operation scenario.
#[fixture]
pub fn image_operations_state() -> ImageOperationsState {
    let state = ImageOperationsState::default();
    state.engine_calls.set(Vec::new());
    state
}
