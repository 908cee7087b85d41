//! Listing of local images.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;

use bollard::Docker;
use bollard::query_parameters::ListImagesOptions;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::EngineConnector;
use crate::error::{DockhandError, ImageError};

/// Boxed future type returned by [`ImageLister`] implementors.
pub type ListImagesFuture<'a> = Pin<
    Box<
        dyn Future<Output = Result<Vec<bollard::models::ImageSummary>, bollard::errors::Error>>
            + Send
            + 'a,
    >,
>;

/// Behaviour required to list images held by an engine.
pub trait ImageLister {
    /// List images matching `options`.
    fn list_images(&self, options: ListImagesOptions) -> ListImagesFuture<'_>;
}

impl ImageLister for Docker {
    fn list_images(&self, options: ListImagesOptions) -> ListImagesFuture<'_> {
        Box::pin(async move { Self::list_images(self, Some(options)).await })
    }
}

/// Metadata describing one local image, copied from the engine's response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageSummary {
    /// Image identifier (`sha256:...`).
    pub id: String,
    /// Identifier of the parent image, empty when there is none.
    pub parent_id: String,
    /// Repository tags referring to the image.
    pub repo_tags: Vec<String>,
    /// Content-addressable digests of the image.
    pub repo_digests: Vec<String>,
    /// Creation time as seconds since the Unix epoch.
    pub created: i64,
    /// Total size of the image in bytes.
    pub size: i64,
    /// Size shared with other images, or `-1` when not computed.
    pub shared_size: i64,
    /// Labels set on the image.
    pub labels: BTreeMap<String, String>,
    /// Number of containers using the image, or `-1` when not computed.
    pub containers: i64,
}

impl From<bollard::models::ImageSummary> for ImageSummary {
    fn from(summary: bollard::models::ImageSummary) -> Self {
        let bollard::models::ImageSummary {
            id,
            parent_id,
            repo_tags,
            repo_digests,
            created,
            size,
            shared_size,
            labels,
            containers,
            ..
        } = summary;

        Self {
            id,
            parent_id,
            repo_tags,
            repo_digests,
            created,
            size,
            shared_size,
            labels: labels.into_iter().collect(),
            containers,
        }
    }
}

impl EngineConnector {
    /// List local images (async version).
    ///
    /// Each filter `key=value` pair is sent as the engine filter
    /// `key -> [value]`.
    ///
    /// # Errors
    ///
    /// Returns `ImageError::ListFailed` when the engine request fails.
    pub async fn list_images_async<L: ImageLister>(
        lister: &L,
        filters: &BTreeMap<String, String>,
    ) -> Result<Vec<ImageSummary>, DockhandError> {
        let options = ListImagesOptions {
            filters: (!filters.is_empty()).then(|| engine_filters(filters)),
            ..ListImagesOptions::default()
        };

        let summaries = lister.list_images(options).await.map_err(|error| {
            DockhandError::from(ImageError::ListFailed {
                message: error.to_string(),
            })
        })?;

        info!(count = summaries.len(), "listed images");
        Ok(summaries.into_iter().map(ImageSummary::from).collect())
    }

    /// List local images using an existing Tokio runtime handle.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::list_images_async`].
    pub fn list_images<L: ImageLister>(
        runtime: &tokio::runtime::Handle,
        lister: &L,
        filters: &BTreeMap<String, String>,
    ) -> Result<Vec<ImageSummary>, DockhandError> {
        runtime.block_on(Self::list_images_async(lister, filters))
    }
}

fn engine_filters(filters: &BTreeMap<String, String>) -> HashMap<String, Vec<String>> {
    filters
        .iter()
        .map(|(key, value)| (key.clone(), vec![value.clone()]))
        .collect()
}
