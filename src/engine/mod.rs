//! Container engine connection and image operations.
//!
//! The socket endpoint is resolved through a priority-based fallback chain:
//!
//! 1. CLI argument (`--engine-socket`)
//! 2. `DOCKHAND_ENGINE_SOCKET` environment variable
//! 3. Config file (`engine_socket` in TOML)
//! 4. `DOCKER_HOST` environment variable
//! 5. `CONTAINER_HOST` environment variable
//! 6. `PODMAN_HOST` environment variable
//! 7. Platform default (`/var/run/docker.sock` on Unix)
//!
//! Each image operation is expressed as a narrow trait implemented for
//! `bollard::Docker`, with async and blocking entry points on
//! [`EngineConnector`].

mod connection;
mod credentials;
mod progress;
mod reference;

pub use connection::{
    BuildImageRequest, EngineConnector, ImageBuilder, ImageLister, ImagePuller, ImagePusher,
    ImageRemover, ImageSummary, ImageTagger, ListImagesFuture, RemoveImageFuture, RemovedImage,
    SocketResolver, TagImageFuture,
};
pub use credentials::{DOCKER_HUB_INDEX, RegistryCredentials};
pub use progress::{ProgressErrorDetail, ProgressMessage, ProgressStream};
pub use reference::{DEFAULT_TAG, ImageReference};
