//! High-level image client bound to one engine and one configuration.
//!
//! [`ImageClient`] carries the engine handle together with the registry
//! credentials and build settings taken from [`AppConfig`], so callers only
//! name images and contexts. Every call is delegated to the matching
//! [`EngineConnector`] operation.

use std::collections::BTreeMap;

use bollard::Docker;
use camino::Utf8PathBuf;
use tracing::debug;

use crate::config::{AppConfig, BuildConfig};
use crate::engine::{
    BuildImageRequest, EngineConnector, ImageBuilder, ImageLister, ImagePuller, ImagePusher,
    ImageRemover, ImageSummary, ImageTagger, RegistryCredentials, RemovedImage, SocketResolver,
};
use crate::error::DockhandError;

/// Image operations against a single container engine.
///
/// The engine type defaults to `bollard::Docker`; tests substitute mocks
/// implementing the operation traits.
#[derive(Debug, Clone)]
pub struct ImageClient<E = Docker> {
    engine: E,
    credentials: Option<RegistryCredentials>,
    build: BuildConfig,
}

impl ImageClient<Docker> {
    /// Resolve the engine socket and connect.
    ///
    /// The socket comes from `engine_socket` in `config`, then `DOCKER_HOST`,
    /// `CONTAINER_HOST`, and `PODMAN_HOST`, then the platform default. No
    /// request is sent until the first operation.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` when the client cannot be created for the
    /// resolved endpoint.
    pub fn connect(config: &AppConfig) -> Result<Self, DockhandError> {
        let env = mockable::DefaultEnv::new();
        let resolver = SocketResolver::new(&env);
        let socket = EngineConnector::resolve_socket(config.engine_socket.as_deref(), &resolver);
        debug!(socket = %socket, "connecting to container engine");

        let docker = EngineConnector::connect(socket)?;
        Ok(Self::from_config(docker, config))
    }

    /// Verify the engine responds to a ping.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::HealthCheckFailed` or
    /// `EngineError::HealthCheckTimeout`.
    pub async fn ping(&self) -> Result<(), DockhandError> {
        EngineConnector::health_check_async(&self.engine).await
    }
}

impl<E> ImageClient<E> {
    /// Wrap an existing engine handle with the settings from `config`.
    #[must_use]
    pub fn from_config(engine: E, config: &AppConfig) -> Self {
        Self {
            engine,
            credentials: RegistryCredentials::from_config(&config.registry),
            build: config.build.clone(),
        }
    }

    /// The wrapped engine handle.
    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// Registry credentials sent with build, pull, and push, if configured.
    #[must_use]
    pub const fn credentials(&self) -> Option<&RegistryCredentials> {
        self.credentials.as_ref()
    }

    /// Build settings applied to every build.
    #[must_use]
    pub const fn build_settings(&self) -> &BuildConfig {
        &self.build
    }

    /// Assemble the build request this client would send.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` when `image` is blank.
    pub fn build_request(
        &self,
        context_dir: impl Into<Utf8PathBuf>,
        image: &str,
        build_args: BTreeMap<String, Option<String>>,
    ) -> Result<BuildImageRequest, DockhandError> {
        Ok(BuildImageRequest::new(context_dir, image)?
            .with_dockerfile(self.build.dockerfile.clone())
            .with_build_args(build_args)
            .with_no_cache(self.build.no_cache)
            .with_force_rm(self.build.force_rm)
            .with_pull_parent(self.build.pull_parent)
            .with_credentials(self.credentials.clone()))
    }
}

impl<E: ImageBuilder> ImageClient<E> {
    /// Build `context_dir` and tag the result as `image`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`EngineConnector::build_image_async`].
    pub async fn build(
        &self,
        context_dir: impl Into<Utf8PathBuf>,
        image: &str,
        build_args: BTreeMap<String, Option<String>>,
    ) -> Result<(), DockhandError> {
        let request = self.build_request(context_dir, image, build_args)?;
        EngineConnector::build_image_async(&self.engine, &request).await
    }
}

impl<E: ImagePuller> ImageClient<E> {
    /// Pull `image` from its registry.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`EngineConnector::pull_image_async`].
    pub async fn pull(&self, image: &str) -> Result<(), DockhandError> {
        EngineConnector::pull_image_async(&self.engine, image, self.credentials.as_ref()).await
    }
}

impl<E: ImagePusher> ImageClient<E> {
    /// Push `image` to its registry.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`EngineConnector::push_image_async`].
    pub async fn push(&self, image: &str) -> Result<(), DockhandError> {
        EngineConnector::push_image_async(&self.engine, image, self.credentials.as_ref()).await
    }
}

impl<E: ImageLister> ImageClient<E> {
    /// List local images matching `filters`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`EngineConnector::list_images_async`].
    pub async fn list(
        &self,
        filters: &BTreeMap<String, String>,
    ) -> Result<Vec<ImageSummary>, DockhandError> {
        EngineConnector::list_images_async(&self.engine, filters).await
    }
}

impl<E: ImageTagger> ImageClient<E> {
    /// Tag the local image `source` as `target`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`EngineConnector::tag_image_async`].
    pub async fn tag(&self, source: &str, target: &str) -> Result<(), DockhandError> {
        EngineConnector::tag_image_async(&self.engine, source, target).await
    }
}

impl<E: ImageRemover> ImageClient<E> {
    /// Remove the local image `image`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`EngineConnector::remove_image_async`].
    pub async fn remove(&self, image: &str) -> Result<Vec<RemovedImage>, DockhandError> {
        EngineConnector::remove_image_async(&self.engine, image).await
    }
}
