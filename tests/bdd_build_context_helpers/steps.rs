//! Given/when step definitions for build-context behavioural scenarios.

use std::io::Read;

use dockhand::context::BuildContext;
use dockhand::error::{BuildContextError, DockhandError};
use rstest_bdd_macros::{given, when};

use super::state::{ArchiveOutcome, BuildContextState, ContextDir, FailureKind, StepResult};

const DOCKERFILE_CONTENT: &str = "FROM busybox\nCOPY . /srv\n";

#[given("an empty build context")]
fn an_empty_build_context(build_context_state: &BuildContextState) -> StepResult<()> {
    ensure_context_dir(build_context_state).map(|_| ())
}

#[given("a build context with a Dockerfile")]
fn a_build_context_with_a_dockerfile(build_context_state: &BuildContextState) -> StepResult<()> {
    write_context_file(build_context_state, "Dockerfile", DOCKERFILE_CONTENT)
}

#[given("a build context with a Dockerfile at {path}")]
fn a_build_context_with_a_dockerfile_at(
    build_context_state: &BuildContextState,
    path: String,
) -> StepResult<()> {
    write_context_file(build_context_state, &path, DOCKERFILE_CONTENT)
}

#[given("the context contains file {path}")]
fn the_context_contains_file(
    build_context_state: &BuildContextState,
    path: String,
) -> StepResult<()> {
    write_context_file(build_context_state, &path, &format!("contents of {path}\n"))
}

#[given("the ignore file contains line {pattern}")]
fn the_ignore_file_contains_line(
    build_context_state: &BuildContextState,
    pattern: String,
) -> StepResult<()> {
    let mut lines = build_context_state.ignore_lines.get().unwrap_or_default();
    lines.push(pattern);
    let contents = lines.iter().map(|line| format!("{line}\n")).collect::<String>();
    build_context_state.ignore_lines.set(lines);
    write_context_file(build_context_state, ".dockerignore", &contents)
}

#[when("the build context is archived")]
fn the_build_context_is_archived(build_context_state: &BuildContextState) -> StepResult<()> {
    archive(build_context_state, None)
}

#[when("the build context is archived with Dockerfile {dockerfile}")]
fn the_build_context_is_archived_with_dockerfile(
    build_context_state: &BuildContextState,
    dockerfile: String,
) -> StepResult<()> {
    archive(build_context_state, Some(&dockerfile))
}

fn archive(state: &BuildContextState, dockerfile: Option<&str>) -> StepResult<()> {
    let context_dir = ensure_context_dir(state)?;

    let outcome = match BuildContext::from_directory(&context_dir.path, dockerfile) {
        Ok(context) => ArchiveOutcome::Archived {
            entries: archive_entries(context.archive_bytes())?,
            dockerfile: String::from(context.dockerfile()),
        },
        Err(error) => ArchiveOutcome::Failed {
            kind: classify_failure(&error),
            message: error.to_string(),
        },
    };

    state.outcome.set(outcome);
    Ok(())
}

fn archive_entries(bytes: &[u8]) -> StepResult<Vec<String>> {
    let mut archive = tar::Archive::new(bytes);
    let entries = archive
        .entries()
        .map_err(|error| format!("failed to read archive: {error}"))?;

    entries
        .map(|entry| {
            let mut file = entry.map_err(|error| format!("failed to read entry: {error}"))?;
            let path = file
                .path()
                .map_err(|error| format!("entry path should decode: {error}"))?
                .to_string_lossy()
                .into_owned();
            let mut sink = Vec::new();
            file.read_to_end(&mut sink)
                .map_err(|error| format!("failed to read entry '{path}': {error}"))?;
            Ok(path)
        })
        .collect()
}

fn classify_failure(error: &DockhandError) -> FailureKind {
    match error {
        DockhandError::BuildContext(BuildContextError::DockerfileNotFound { .. }) => {
            FailureKind::DockerfileNotFound
        }
        DockhandError::BuildContext(BuildContextError::InvalidIgnorePattern { .. }) => {
            FailureKind::InvalidIgnorePattern
        }
        _ => FailureKind::Other,
    }
}

fn ensure_context_dir(state: &BuildContextState) -> StepResult<ContextDir> {
    if let Some(context_dir) = state.context_dir.get() {
        return Ok(context_dir);
    }

    let context_dir = ContextDir::new()?;
    state.context_dir.set(context_dir.clone());
    Ok(context_dir)
}

fn write_context_file(
    state: &BuildContextState,
    relative_path: &str,
    contents: &str,
) -> StepResult<()> {
    let context_dir = ensure_context_dir(state)?;
    let file_path = context_dir.path.join(relative_path);

    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent.as_std_path())
            .map_err(|error| format!("failed to create directory '{parent}': {error}"))?;
    }

    std::fs::write(file_path.as_std_path(), contents)
        .map_err(|error| format!("failed to write context file '{file_path}': {error}"))
}
