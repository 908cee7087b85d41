//! Removal of local images.

use std::future::Future;
use std::pin::Pin;

use bollard::Docker;
use bollard::models::ImageDeleteResponseItem;
use bollard::query_parameters::RemoveImageOptions;
use tracing::{debug, info};

use super::EngineConnector;
use crate::error::{DockhandError, ImageError};

/// Boxed future type returned by [`ImageRemover`] implementors.
pub type RemoveImageFuture<'a> = Pin<
    Box<
        dyn Future<Output = Result<Vec<ImageDeleteResponseItem>, bollard::errors::Error>>
            + Send
            + 'a,
    >,
>;

/// Behaviour required to remove an image from an engine.
pub trait ImageRemover {
    /// Remove `image` with the given options.
    fn remove_image(&self, image: &str, options: RemoveImageOptions) -> RemoveImageFuture<'_>;
}

impl ImageRemover for Docker {
    fn remove_image(&self, image: &str, options: RemoveImageOptions) -> RemoveImageFuture<'_> {
        let image_owned = String::from(image);

        Box::pin(async move { Self::remove_image(self, &image_owned, Some(options), None).await })
    }
}

/// One effect of an image removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovedImage {
    /// A tag was removed from an image.
    Untagged(String),
    /// An image layer was deleted.
    Deleted(String),
}

impl EngineConnector {
    /// Remove `image` with the engine's default options (async version).
    ///
    /// # Errors
    ///
    /// Returns `ImageError::RemoveFailed` when the engine rejects the request.
    pub async fn remove_image_async<R: ImageRemover>(
        remover: &R,
        image: &str,
    ) -> Result<Vec<RemovedImage>, DockhandError> {
        let items = remover
            .remove_image(image, RemoveImageOptions::default())
            .await
            .map_err(|error| {
                DockhandError::from(ImageError::RemoveFailed {
                    image: String::from(image),
                    message: error.to_string(),
                })
            })?;

        let removed: Vec<RemovedImage> = items.into_iter().flat_map(removed_entries).collect();
        for entry in &removed {
            match entry {
                RemovedImage::Untagged(reference) => debug!(image, untagged = %reference, "untagged"),
                RemovedImage::Deleted(id) => debug!(image, deleted = %id, "deleted"),
            }
        }

        info!(image, effects = removed.len(), "removed image");
        Ok(removed)
    }

    /// Remove an image using an existing Tokio runtime handle.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::remove_image_async`].
    pub fn remove_image<R: ImageRemover>(
        runtime: &tokio::runtime::Handle,
        remover: &R,
        image: &str,
    ) -> Result<Vec<RemovedImage>, DockhandError> {
        runtime.block_on(Self::remove_image_async(remover, image))
    }
}

fn removed_entries(item: ImageDeleteResponseItem) -> impl Iterator<Item = RemovedImage> {
    item.untagged
        .map(RemovedImage::Untagged)
        .into_iter()
        .chain(item.deleted.map(RemovedImage::Deleted))
}
