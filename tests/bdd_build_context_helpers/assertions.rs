//! Then-step assertions for build-context behavioural scenarios.

use rstest_bdd_macros::then;

use super::state::{ArchiveOutcome, BuildContextState, FailureKind, StepResult};

#[then("archiving succeeds")]
fn archiving_succeeds(build_context_state: &BuildContextState) -> StepResult<()> {
    archived(build_context_state).map(|_| ())
}

#[then("the archive contains {path}")]
fn the_archive_contains(build_context_state: &BuildContextState, path: String) -> StepResult<()> {
    let (entries, _) = archived(build_context_state)?;
    if entries.contains(&path) {
        return Ok(());
    }
    Err(format!("expected archive entry {path}, got {entries:?}"))
}

#[then("the archive does not contain {path}")]
fn the_archive_does_not_contain(
    build_context_state: &BuildContextState,
    path: String,
) -> StepResult<()> {
    let (entries, _) = archived(build_context_state)?;
    if entries.contains(&path) {
        return Err(format!("archive unexpectedly contains {path}: {entries:?}"));
    }
    Ok(())
}

#[then("the archive Dockerfile is {dockerfile}")]
fn the_archive_dockerfile_is(
    build_context_state: &BuildContextState,
    dockerfile: String,
) -> StepResult<()> {
    let (entries, observed) = archived(build_context_state)?;
    if observed != dockerfile {
        return Err(format!("expected Dockerfile {dockerfile}, got {observed}"));
    }
    if !entries.contains(&dockerfile) {
        return Err(format!("Dockerfile {dockerfile} missing from {entries:?}"));
    }
    Ok(())
}

#[then("archiving fails because the Dockerfile cannot be located")]
fn archiving_fails_because_the_dockerfile_cannot_be_located(
    build_context_state: &BuildContextState,
) -> StepResult<()> {
    assert_failure(build_context_state, FailureKind::DockerfileNotFound)
}

#[then("archiving fails because of an invalid ignore pattern")]
fn archiving_fails_because_of_an_invalid_ignore_pattern(
    build_context_state: &BuildContextState,
) -> StepResult<()> {
    assert_failure(build_context_state, FailureKind::InvalidIgnorePattern)
}

fn archived(state: &BuildContextState) -> StepResult<(Vec<String>, String)> {
    match outcome(state)? {
        ArchiveOutcome::Archived {
            entries,
            dockerfile,
        } => Ok((entries, dockerfile)),
        ArchiveOutcome::Failed { message, .. } => {
            Err(format!("expected archiving to succeed, got: {message}"))
        }
    }
}

fn assert_failure(state: &BuildContextState, expected: FailureKind) -> StepResult<()> {
    match outcome(state)? {
        ArchiveOutcome::Archived { entries, .. } => Err(format!(
            "expected {expected:?}, archiving succeeded with {entries:?}"
        )),
        ArchiveOutcome::Failed { kind, .. } if kind == expected => Ok(()),
        ArchiveOutcome::Failed { kind, message } => Err(format!(
            "expected failure kind {expected:?}, got {kind:?}: {message}"
        )),
    }
}

fn outcome(state: &BuildContextState) -> StepResult<ArchiveOutcome> {
    state
        .outcome
        .get()
        .ok_or_else(|| String::from("archiving outcome should be set"))
}
