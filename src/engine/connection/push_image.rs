//! Image pushes to a registry.

use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::query_parameters::{PushImageOptions, PushImageOptionsBuilder};
use futures_util::StreamExt;
use tracing::info;

use super::EngineConnector;
use crate::engine::credentials::RegistryCredentials;
use crate::engine::progress::{ProgressMessage, ProgressStream, drain_progress};
use crate::engine::reference::ImageReference;
use crate::error::{DockhandError, ImageError};

/// Behaviour required to push an image through an engine.
pub trait ImagePusher {
    /// Start pushing `repository` with the tag carried in `options`.
    fn push_image(
        &self,
        repository: &str,
        options: PushImageOptions,
        credentials: Option<DockerCredentials>,
    ) -> ProgressStream<'_>;
}

impl ImagePusher for Docker {
    fn push_image(
        &self,
        repository: &str,
        options: PushImageOptions,
        credentials: Option<DockerCredentials>,
    ) -> ProgressStream<'_> {
        Self::push_image(self, repository, Some(options), credentials)
            .map(|item| item.map(ProgressMessage::from))
            .boxed()
    }
}

impl EngineConnector {
    /// Push `image` to its registry (async version).
    ///
    /// A reference without a tag pushes `latest`. Digest references are
    /// rejected before the engine is contacted.
    ///
    /// # Errors
    ///
    /// Returns `ImageError::InvalidReference` for a malformed reference and
    /// `ImageError::PushFailed` for a digest reference or when the engine
    /// fails or reports an error.
    pub async fn push_image_async<P: ImagePusher>(
        pusher: &P,
        image: &str,
        credentials: Option<&RegistryCredentials>,
    ) -> Result<(), DockhandError> {
        let reference = ImageReference::parse(image)?;
        if reference.digest().is_some() {
            return Err(ImageError::PushFailed {
                image: String::from(image),
                message: String::from("cannot push a digest reference"),
            }
            .into());
        }

        let options = PushImageOptionsBuilder::default()
            .tag(reference.tag_or_default())
            .build();

        info!(image, "pushing image");

        let stream = pusher.push_image(
            reference.repository(),
            options,
            credentials.map(RegistryCredentials::to_docker_credentials),
        );
        drain_progress("push", stream)
            .await
            .map_err(|failure| ImageError::PushFailed {
                image: String::from(image),
                message: failure.into_message(),
            })?;

        info!(image, "pushed image");
        Ok(())
    }

    /// Push `image` using an existing Tokio runtime handle.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::push_image_async`].
    pub fn push_image<P: ImagePusher>(
        runtime: &tokio::runtime::Handle,
        pusher: &P,
        image: &str,
        credentials: Option<&RegistryCredentials>,
    ) -> Result<(), DockhandError> {
        runtime.block_on(Self::push_image_async(pusher, image, credentials))
    }
}
