//! Image pulls from a registry.

use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::query_parameters::{CreateImageOptions, CreateImageOptionsBuilder};
use futures_util::StreamExt;
use tracing::info;

use super::EngineConnector;
use crate::engine::credentials::RegistryCredentials;
use crate::engine::progress::{ProgressMessage, ProgressStream, drain_progress};
use crate::engine::reference::ImageReference;
use crate::error::{DockhandError, ImageError};

/// Behaviour required to pull an image through an engine.
pub trait ImagePuller {
    /// Start pulling the image described by `options`.
    fn create_image(
        &self,
        options: CreateImageOptions,
        credentials: Option<DockerCredentials>,
    ) -> ProgressStream<'_>;
}

impl ImagePuller for Docker {
    fn create_image(
        &self,
        options: CreateImageOptions,
        credentials: Option<DockerCredentials>,
    ) -> ProgressStream<'_> {
        Self::create_image(self, Some(options), None, credentials)
            .map(|item| item.map(ProgressMessage::from))
            .boxed()
    }
}

impl EngineConnector {
    /// Pull `image` from its registry (async version).
    ///
    /// A reference without a tag pulls `latest`. A digest is kept so the
    /// engine pulls the pinned content.
    ///
    /// # Errors
    ///
    /// Returns `ImageError::InvalidReference` for a malformed reference and
    /// `ImageError::PullFailed` when the engine fails or reports an error.
    pub async fn pull_image_async<P: ImagePuller>(
        puller: &P,
        image: &str,
        credentials: Option<&RegistryCredentials>,
    ) -> Result<(), DockhandError> {
        let reference = ImageReference::parse(image)?;
        let from_image = reference.pull_source();
        let options = CreateImageOptionsBuilder::default()
            .from_image(&from_image)
            .tag(reference.tag_or_default())
            .build();

        info!(image, "pulling image");

        let stream = puller.create_image(
            options,
            credentials.map(RegistryCredentials::to_docker_credentials),
        );
        drain_progress("pull", stream)
            .await
            .map_err(|failure| ImageError::PullFailed {
                image: String::from(image),
                message: failure.into_message(),
            })?;

        info!(image, "pulled image");
        Ok(())
    }

    /// Pull `image` using an existing Tokio runtime handle.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::pull_image_async`].
    pub fn pull_image<P: ImagePuller>(
        runtime: &tokio::runtime::Handle,
        puller: &P,
        image: &str,
        credentials: Option<&RegistryCredentials>,
    ) -> Result<(), DockhandError> {
        runtime.block_on(Self::pull_image_async(puller, image, credentials))
    }
}
