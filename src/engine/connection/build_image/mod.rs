//! Image builds from a local build context.
//!
//! The context directory is archived (honouring `.dockerignore`), sent to the
//! engine's build endpoint, and the returned progress stream is drained for an
//! embedded error.

use std::collections::{BTreeMap, HashMap};

use bollard::auth::DockerCredentials;
use bollard::query_parameters::BuildImageOptions;
use bollard::{Docker, body_full};
use camino::{Utf8Path, Utf8PathBuf};
use futures_util::StreamExt;
use tracing::{debug, info};

use super::EngineConnector;
use crate::context::BuildContext;
use crate::engine::credentials::RegistryCredentials;
use crate::engine::progress::{ProgressMessage, ProgressStream, drain_progress};
use crate::error::{ConfigError, DockhandError, ImageError};

/// Behaviour required to submit a build to an engine.
///
/// This abstraction keeps build logic testable without a running daemon.
pub trait ImageBuilder {
    /// Start a build of the tar `context` with the given options.
    fn build_image(
        &self,
        options: BuildImageOptions,
        credentials: Option<HashMap<String, DockerCredentials>>,
        context: Vec<u8>,
    ) -> ProgressStream<'_>;
}

impl ImageBuilder for Docker {
    fn build_image(
        &self,
        options: BuildImageOptions,
        credentials: Option<HashMap<String, DockerCredentials>>,
        context: Vec<u8>,
    ) -> ProgressStream<'_> {
        Self::build_image(self, options, credentials, Some(body_full(context.into())))
            .map(|item| item.map(ProgressMessage::from))
            .boxed()
    }
}

/// Image-build request parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildImageRequest {
    context_dir: Utf8PathBuf,
    image: String,
    dockerfile: Option<String>,
    build_args: BTreeMap<String, Option<String>>,
    no_cache: bool,
    force_rm: bool,
    pull_parent: bool,
    credentials: Option<RegistryCredentials>,
}

impl BuildImageRequest {
    /// Create a request building `context_dir` into `image`.
    ///
    /// Caching is disabled, intermediate containers are always removed, and
    /// parent images are always pulled unless overridden.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` when `image` is empty or
    /// whitespace-only.
    pub fn new(
        context_dir: impl Into<Utf8PathBuf>,
        image: impl Into<String>,
    ) -> Result<Self, DockhandError> {
        let image_value = image.into();
        let trimmed = image_value.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: String::from("image"),
            }
            .into());
        }

        Ok(Self {
            context_dir: context_dir.into(),
            image: String::from(trimmed),
            dockerfile: None,
            build_args: BTreeMap::new(),
            no_cache: true,
            force_rm: true,
            pull_parent: true,
            credentials: None,
        })
    }

    /// Use a Dockerfile other than `Dockerfile`, relative to the context.
    #[must_use]
    pub fn with_dockerfile(mut self, dockerfile: Option<String>) -> Self {
        self.dockerfile = dockerfile.filter(|value| !value.trim().is_empty());
        self
    }

    /// Attach build arguments. `None` values are not sent.
    #[must_use]
    pub fn with_build_args(mut self, build_args: BTreeMap<String, Option<String>>) -> Self {
        self.build_args = build_args;
        self
    }

    /// Set whether the engine's build cache is bypassed.
    #[must_use]
    pub const fn with_no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    /// Set whether intermediate containers are removed even on failure.
    #[must_use]
    pub const fn with_force_rm(mut self, force_rm: bool) -> Self {
        self.force_rm = force_rm;
        self
    }

    /// Set whether newer parent images are always pulled.
    #[must_use]
    pub const fn with_pull_parent(mut self, pull_parent: bool) -> Self {
        self.pull_parent = pull_parent;
        self
    }

    /// Attach registry credentials for base-image pulls.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Option<RegistryCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Return the build context directory.
    #[must_use]
    pub fn context_dir(&self) -> &Utf8Path {
        &self.context_dir
    }

    /// Return the tag applied to the built image.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Return the requested Dockerfile, if not the default.
    #[must_use]
    pub fn dockerfile(&self) -> Option<&str> {
        self.dockerfile.as_deref()
    }

    /// Return the build arguments.
    #[must_use]
    pub const fn build_args(&self) -> &BTreeMap<String, Option<String>> {
        &self.build_args
    }
}

impl EngineConnector {
    /// Build an image using a provided client abstraction (async version).
    ///
    /// # Errors
    ///
    /// Returns `BuildContextError` or `FilesystemError` when the context
    /// cannot be archived, and `ImageError::BuildFailed` when the engine
    /// rejects the build or reports an error while building.
    pub async fn build_image_async<B: ImageBuilder>(
        builder: &B,
        request: &BuildImageRequest,
    ) -> Result<(), DockhandError> {
        let context = BuildContext::from_directory(request.context_dir(), request.dockerfile())?;
        let options = build_image_options(request, context.dockerfile());
        let credentials = request
            .credentials
            .as_ref()
            .map(RegistryCredentials::to_build_credentials);

        info!(
            image = request.image(),
            context = %request.context_dir(),
            dockerfile = context.dockerfile(),
            entries = context.entry_count(),
            "building image"
        );

        let stream = builder.build_image(options, credentials, context.into_archive_bytes());
        let messages = drain_progress("build", stream).await.map_err(|failure| {
            ImageError::BuildFailed {
                image: String::from(request.image()),
                message: failure.into_message(),
            }
        })?;

        info!(image = request.image(), messages, "built image");
        Ok(())
    }

    /// Build an image using a provided client abstraction.
    ///
    /// This synchronous helper blocks on [`Self::build_image_async`] using an
    /// existing Tokio runtime handle supplied by the caller.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::build_image_async`].
    pub fn build_image<B: ImageBuilder>(
        runtime: &tokio::runtime::Handle,
        builder: &B,
        request: &BuildImageRequest,
    ) -> Result<(), DockhandError> {
        runtime.block_on(Self::build_image_async(builder, request))
    }
}

fn build_image_options(request: &BuildImageRequest, dockerfile: &str) -> BuildImageOptions {
    let buildargs: HashMap<String, String> = request
        .build_args()
        .iter()
        .filter_map(|(key, value)| {
            if value.is_none() {
                debug!(key = %key, "omitting build argument without a value");
            }
            value.as_ref().map(|present| (key.clone(), present.clone()))
        })
        .collect();

    BuildImageOptions {
        t: Some(String::from(request.image())),
        dockerfile: String::from(dockerfile),
        nocache: request.no_cache,
        rm: true,
        forcerm: request.force_rm,
        pull: request.pull_parent.then(|| String::from("true")),
        buildargs: (!buildargs.is_empty()).then_some(buildargs),
        ..BuildImageOptions::default()
    }
}
