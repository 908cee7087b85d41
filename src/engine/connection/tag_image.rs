//! Tagging of local images.

use std::future::Future;
use std::pin::Pin;

use bollard::Docker;
use bollard::query_parameters::{TagImageOptions, TagImageOptionsBuilder};
use tracing::info;

use super::EngineConnector;
use crate::engine::reference::ImageReference;
use crate::error::{DockhandError, ImageError};

/// Boxed future type returned by [`ImageTagger`] implementors.
pub type TagImageFuture<'a> =
    Pin<Box<dyn Future<Output = Result<(), bollard::errors::Error>> + Send + 'a>>;

/// Behaviour required to tag an image held by an engine.
pub trait ImageTagger {
    /// Add the repository and tag in `options` to `source`.
    fn tag_image(&self, source: &str, options: TagImageOptions) -> TagImageFuture<'_>;
}

impl ImageTagger for Docker {
    fn tag_image(&self, source: &str, options: TagImageOptions) -> TagImageFuture<'_> {
        let source_owned = String::from(source);

        Box::pin(async move { Self::tag_image(self, &source_owned, Some(options)).await })
    }
}

impl EngineConnector {
    /// Tag the local image `source` as `target` (async version).
    ///
    /// `target` is split into repository and tag; a missing tag means
    /// `latest`.
    ///
    /// # Errors
    ///
    /// Returns `ImageError::TagFailed` when `target` is malformed, names a
    /// digest, or the engine rejects the request.
    pub async fn tag_image_async<T: ImageTagger>(
        tagger: &T,
        source: &str,
        target: &str,
    ) -> Result<(), DockhandError> {
        let tag_failed = |message: String| {
            DockhandError::from(ImageError::TagFailed {
                source_image: String::from(source),
                target: String::from(target),
                message,
            })
        };

        let reference = ImageReference::parse(target).map_err(|error| tag_failed(error.to_string()))?;
        if reference.digest().is_some() {
            return Err(tag_failed(String::from("target cannot include a digest")));
        }

        let options = TagImageOptionsBuilder::default()
            .repo(reference.repository())
            .tag(reference.tag_or_default())
            .build();

        tagger
            .tag_image(source, options)
            .await
            .map_err(|error| tag_failed(error.to_string()))?;

        info!(source, target, "tagged image");
        Ok(())
    }

    /// Tag an image using an existing Tokio runtime handle.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::tag_image_async`].
    pub fn tag_image<T: ImageTagger>(
        runtime: &tokio::runtime::Handle,
        tagger: &T,
        source: &str,
        target: &str,
    ) -> Result<(), DockhandError> {
        runtime.block_on(Self::tag_image_async(tagger, source, target))
    }
}
