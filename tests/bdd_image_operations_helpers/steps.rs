//! Given/when step definitions for image-operation behavioural scenarios.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use bollard::auth::DockerCredentials;
use bollard::query_parameters::{
    BuildImageOptions, CreateImageOptions, PushImageOptions, TagImageOptions,
};
use camino::Utf8PathBuf;
use dockhand::client::ImageClient;
use dockhand::config::{AppConfig, RegistryConfig};
use dockhand::engine::{
    ImageBuilder, ImagePuller, ImagePusher, ImageTagger, ProgressMessage, ProgressStream,
    TagImageFuture,
};
use dockhand::error::{DockhandError, ImageError};
use futures_util::{StreamExt, stream};
use mockall::mock;
use rstest_bdd_macros::{given, when};

use super::state::{
    ContextDir, EngineCall, ImageOperationsState, OperationOutcome, StepResult,
};

mock! {
    #[derive(Debug)]
    Engine {}

    impl ImageBuilder for Engine {
        fn build_image(
            &self,
            options: BuildImageOptions,
            credentials: Option<HashMap<String, DockerCredentials>>,
            context: Vec<u8>,
        ) -> ProgressStream<'_>;
    }

    impl ImagePuller for Engine {
        fn create_image(
            &self,
            options: CreateImageOptions,
            credentials: Option<DockerCredentials>,
        ) -> ProgressStream<'_>;
    }

    impl ImagePusher for Engine {
        fn push_image(
            &self,
            repository: &str,
            options: PushImageOptions,
            credentials: Option<DockerCredentials>,
        ) -> ProgressStream<'_>;
    }

    impl ImageTagger for Engine {
        fn tag_image(&self, source: &str, options: TagImageOptions) -> TagImageFuture<'_>;
    }
}

type CallLog = Arc<Mutex<Vec<EngineCall>>>;

/// One operation a scenario can request.
enum Operation {
    Build(String),
    Pull(String),
    Push(String),
    Tag { source: String, target: String },
}

#[given("registry credentials for user {username} at {address}")]
fn registry_credentials_for_user_at(
    image_operations_state: &ImageOperationsState,
    username: String,
    address: String,
) {
    image_operations_state.username.set(username);
    image_operations_state.registry_address.set(address);
}

#[given("the engine reports the error {message}")]
fn the_engine_reports_the_error(image_operations_state: &ImageOperationsState, message: String) {
    image_operations_state.reported_error.set(message);
}

#[given("a build context with a Dockerfile")]
fn a_build_context_with_a_dockerfile(
    image_operations_state: &ImageOperationsState,
) -> StepResult<()> {
    let temp_dir = tempfile::tempdir()
        .map_err(|error| format!("failed to create temporary context directory: {error}"))?;
    let path = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf())
        .map_err(|_| String::from("temporary context path should be valid UTF-8"))?;

    let dockerfile = path.join("Dockerfile");
    std::fs::write(dockerfile.as_std_path(), "FROM busybox\nRUN true\n")
        .map_err(|error| format!("failed to write '{dockerfile}': {error}"))?;

    image_operations_state.context_dir.set(ContextDir {
        _temp_dir: Arc::new(temp_dir),
        path,
    });
    Ok(())
}

#[when("image {image} is pushed")]
fn image_is_pushed(image_operations_state: &ImageOperationsState, image: String) -> StepResult<()> {
    perform(image_operations_state, Operation::Push(image))
}

#[when("image {image} is pulled")]
fn image_is_pulled(image_operations_state: &ImageOperationsState, image: String) -> StepResult<()> {
    perform(image_operations_state, Operation::Pull(image))
}

#[when("image {source} is tagged as {target}")]
fn image_is_tagged_as(
    image_operations_state: &ImageOperationsState,
    source: String,
    target: String,
) -> StepResult<()> {
    perform(image_operations_state, Operation::Tag { source, target })
}

#[when("the context is built as {image}")]
fn the_context_is_built_as(
    image_operations_state: &ImageOperationsState,
    image: String,
) -> StepResult<()> {
    perform(image_operations_state, Operation::Build(image))
}

fn perform(state: &ImageOperationsState, operation: Operation) -> StepResult<()> {
    let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
    let engine = mock_engine(state.reported_error.get(), &calls);
    let client = ImageClient::from_config(engine, &scenario_config(state));

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|error| format!("failed to create tokio runtime for scenario: {error}"))?;
    let result = match operation {
        Operation::Build(image) => {
            let context_dir = state
                .context_dir
                .get()
                .ok_or_else(|| String::from("build context should be prepared"))?;
            runtime.block_on(client.build(context_dir.path, &image, BTreeMap::new()))
        }
        Operation::Pull(image) => runtime.block_on(client.pull(&image)),
        Operation::Push(image) => runtime.block_on(client.push(&image)),
        Operation::Tag { source, target } => runtime.block_on(client.tag(&source, &target)),
    };

    let observed = calls
        .lock()
        .map_err(|_| String::from("engine call log mutex is poisoned"))?
        .clone();
    state.engine_calls.set(observed);
    state.outcome.set(match result {
        Ok(()) => OperationOutcome::Succeeded,
        Err(error) => OperationOutcome::Failed {
            kind: failure_kind(&error),
            message: error.to_string(),
        },
    });
    Ok(())
}

fn scenario_config(state: &ImageOperationsState) -> AppConfig {
    AppConfig {
        registry: RegistryConfig {
            address: state.registry_address.get(),
            username: state.username.get(),
            password: state.username.get().map(|_| String::from("s3cret")),
        },
        ..AppConfig::default()
    }
}

fn progress<'a>(reported_error: Option<String>) -> ProgressStream<'a> {
    let mut items = vec![Ok(ProgressMessage::from_status("Preparing"))];
    items.extend(reported_error.map(|message| Ok(ProgressMessage::from_error(message))));
    stream::iter(items).boxed()
}

fn record(calls: &CallLog, call: EngineCall) {
    if let Ok(mut locked) = calls.lock() {
        locked.push(call);
    }
}

fn mock_engine(reported_error: Option<String>, calls: &CallLog) -> MockEngine {
    let mut engine = MockEngine::new();

    let build_calls = Arc::clone(calls);
    let build_error = reported_error.clone();
    engine
        .expect_build_image()
        .returning(move |options, credentials, context| {
            record(
                &build_calls,
                EngineCall {
                    repository: None,
                    tag: options.t,
                    username: credentials
                        .and_then(|map| map.into_values().next())
                        .and_then(|sent| sent.username),
                    context_len: context.len(),
                },
            );
            progress(build_error.clone())
        });

    let pull_calls = Arc::clone(calls);
    let pull_error = reported_error.clone();
    engine
        .expect_create_image()
        .returning(move |options, credentials| {
            record(
                &pull_calls,
                EngineCall {
                    repository: options.from_image,
                    tag: options.tag,
                    username: credentials.and_then(|sent| sent.username),
                    context_len: 0,
                },
            );
            progress(pull_error.clone())
        });

    let push_calls = Arc::clone(calls);
    engine
        .expect_push_image()
        .returning(move |repository, options, credentials| {
            record(
                &push_calls,
                EngineCall {
                    repository: Some(String::from(repository)),
                    tag: options.tag,
                    username: credentials.and_then(|sent| sent.username),
                    context_len: 0,
                },
            );
            progress(reported_error.clone())
        });

    let tag_calls = Arc::clone(calls);
    engine.expect_tag_image().returning(move |_source, options| {
        record(
            &tag_calls,
            EngineCall {
                repository: options.repo,
                tag: options.tag,
                ..EngineCall::default()
            },
        );
        Box::pin(async { Ok(()) })
    });

    engine
}

fn failure_kind(error: &DockhandError) -> String {
    let kind = match error {
        DockhandError::Image(ImageError::BuildFailed { .. }) => "BuildFailed",
        DockhandError::Image(ImageError::PullFailed { .. }) => "PullFailed",
        DockhandError::Image(ImageError::PushFailed { .. }) => "PushFailed",
        DockhandError::Image(ImageError::TagFailed { .. }) => "TagFailed",
        DockhandError::Image(ImageError::InvalidReference { .. }) => "InvalidReference",
        _ => "Other",
    };
    String::from(kind)
}
