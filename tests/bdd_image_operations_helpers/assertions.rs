//! Then-step assertions for image-operation behavioural scenarios.

use rstest_bdd_macros::then;

use super::state::{EngineCall, ImageOperationsState, OperationOutcome, StepResult};

#[then("the operation succeeds")]
fn the_operation_succeeds(image_operations_state: &ImageOperationsState) -> StepResult<()> {
    match outcome(image_operations_state)? {
        OperationOutcome::Succeeded => Ok(()),
        OperationOutcome::Failed { message, .. } => {
            Err(format!("expected the operation to succeed, got: {message}"))
        }
    }
}

#[then("the operation fails with {kind} mentioning {text}")]
fn the_operation_fails_with_mentioning(
    image_operations_state: &ImageOperationsState,
    kind: String,
    text: String,
) -> StepResult<()> {
    match outcome(image_operations_state)? {
        OperationOutcome::Succeeded => Err(format!("expected {kind} failure, got success")),
        OperationOutcome::Failed {
            kind: observed,
            message,
        } => {
            if observed != kind {
                return Err(format!("expected failure kind {kind}, got {observed}: {message}"));
            }
            if !message.contains(&text) {
                return Err(format!("expected message mentioning '{text}', got: {message}"));
            }
            Ok(())
        }
    }
}

#[then("the engine received repository {repository}")]
fn the_engine_received_repository(
    image_operations_state: &ImageOperationsState,
    repository: String,
) -> StepResult<()> {
    let call = single_call(image_operations_state)?;
    if call.repository.as_deref() == Some(repository.as_str()) {
        return Ok(());
    }
    Err(format!(
        "expected repository {repository}, got {:?}",
        call.repository
    ))
}

#[then("the engine received tag {tag}")]
fn the_engine_received_tag(
    image_operations_state: &ImageOperationsState,
    tag: String,
) -> StepResult<()> {
    let call = single_call(image_operations_state)?;
    if call.tag.as_deref() == Some(tag.as_str()) {
        return Ok(());
    }
    Err(format!("expected tag {tag}, got {:?}", call.tag))
}

#[then("the engine received credentials for {username}")]
fn the_engine_received_credentials_for(
    image_operations_state: &ImageOperationsState,
    username: String,
) -> StepResult<()> {
    let call = single_call(image_operations_state)?;
    if call.username.as_deref() == Some(username.as_str()) {
        return Ok(());
    }
    Err(format!(
        "expected credentials for {username}, got {:?}",
        call.username
    ))
}

#[then("the engine received no credentials")]
fn the_engine_received_no_credentials(
    image_operations_state: &ImageOperationsState,
) -> StepResult<()> {
    let call = single_call(image_operations_state)?;
    match call.username {
        None => Ok(()),
        Some(username) => Err(format!("expected no credentials, got user {username}")),
    }
}

#[then("the engine received a build context archive")]
fn the_engine_received_a_build_context_archive(
    image_operations_state: &ImageOperationsState,
) -> StepResult<()> {
    let call = single_call(image_operations_state)?;
    // A tar archive is at least one 512-byte header plus the end marker.
    if call.context_len >= 1536 {
        return Ok(());
    }
    Err(format!(
        "expected a tar archive body, got {} bytes",
        call.context_len
    ))
}

#[then("the engine was not contacted")]
fn the_engine_was_not_contacted(image_operations_state: &ImageOperationsState) -> StepResult<()> {
    let calls = image_operations_state.engine_calls.get().unwrap_or_default();
    if calls.is_empty() {
        return Ok(());
    }
    Err(format!("expected no engine calls, got {calls:?}"))
}

fn single_call(state: &ImageOperationsState) -> StepResult<EngineCall> {
    let calls = state.engine_calls.get().unwrap_or_default();
    match calls.as_slice() {
        [call] => Ok(call.clone()),
        other => Err(format!("expected exactly one engine call, got {other:?}")),
    }
}

fn outcome(state: &ImageOperationsState) -> StepResult<OperationOutcome> {
    state
        .outcome
        .get()
        .ok_or_else(|| String::from("operation outcome should be set"))
}
