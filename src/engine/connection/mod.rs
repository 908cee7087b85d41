//! Socket resolution and container engine connection.
//!
//! This module resolves the engine endpoint from configuration, environment
//! variables, and platform defaults, opens a `Bollard` client for it, and
//! hosts the image operations performed through that client.

use bollard::{API_DEFAULT_VERSION, Docker};
use tracing::debug;

mod build_image;
mod error_classification;
mod health_check;
mod list_images;
mod pull_image;
mod push_image;
mod remove_image;
mod tag_image;

pub use build_image::{BuildImageRequest, ImageBuilder};
pub use list_images::{ImageLister, ImageSummary, ListImagesFuture};
pub use pull_image::ImagePuller;
pub use push_image::ImagePusher;
pub use remove_image::{ImageRemover, RemoveImageFuture, RemovedImage};
pub use tag_image::{ImageTagger, TagImageFuture};

use crate::error::DockhandError;
use error_classification::classify_connection_error;

/// Environment variable names checked in fallback order after configuration sources.
const FALLBACK_ENV_VARS: &[&str] = &["DOCKER_HOST", "CONTAINER_HOST", "PODMAN_HOST"];

/// Connection timeout in seconds for Docker/Podman API connections.
const CONNECTION_TIMEOUT_SECS: u64 = 120;

/// Timeout in seconds for health check operations.
const HEALTH_CHECK_TIMEOUT_SECS: u64 = 10;

/// Default socket path for Unix platforms.
#[cfg(unix)]
const DEFAULT_SOCKET: &str = "unix:///var/run/docker.sock";

/// Default socket path for Windows platforms.
#[cfg(windows)]
const DEFAULT_SOCKET: &str = "npipe:////./pipe/docker_engine";

/// Resolves container engine socket endpoints from environment variables.
///
/// # Type Parameters
///
/// * `E` - An environment provider implementing the `mockable::Env` trait,
///   allowing for testable environment variable access.
///
/// # Example
///
/// ```ignore
/// use mockable::DefaultEnv;
/// use dockhand::engine::SocketResolver;
///
/// let env = DefaultEnv::new();
/// let resolver = SocketResolver::new(&env);
///
/// if let Some(socket) = resolver.resolve_from_env() {
///     println!("Found socket: {}", socket);
/// }
/// ```
pub struct SocketResolver<'a, E: mockable::Env> {
    env: &'a E,
}

impl<'a, E: mockable::Env> SocketResolver<'a, E> {
    /// Creates a new socket resolver with the given environment provider.
    #[must_use]
    pub const fn new(env: &'a E) -> Self {
        Self { env }
    }

    /// Resolves the socket endpoint from fallback environment variables.
    ///
    /// Checks `DOCKER_HOST`, `CONTAINER_HOST`, then `PODMAN_HOST`, returning
    /// the first non-empty value.
    #[must_use]
    pub fn resolve_from_env(&self) -> Option<String> {
        FALLBACK_ENV_VARS
            .iter()
            .filter_map(|var_name| self.env.string(var_name))
            .find(|value| !value.is_empty())
    }

    /// Returns the platform default socket path.
    #[must_use]
    pub const fn default_socket() -> &'static str {
        DEFAULT_SOCKET
    }
}

/// Transport used to reach an engine endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    /// Unix domain socket or Windows named pipe.
    Socket,
    /// Plain or TLS HTTP.
    Http,
}

/// Rewrite `endpoint` into a URI `bollard` accepts, with its transport.
///
/// `tcp://` becomes `http://`. Bare paths starting with `\\` or `//` are
/// named pipes and every other bare path is a Unix socket; detection looks
/// at syntax only.
fn normalise_endpoint(endpoint: &str) -> (String, Transport) {
    match endpoint.split_once("://") {
        Some(("tcp", rest)) => (format!("http://{rest}"), Transport::Http),
        Some(("http" | "https", _)) => (String::from(endpoint), Transport::Http),
        Some(("unix" | "npipe", _)) => (String::from(endpoint), Transport::Socket),
        _ if endpoint.starts_with("\\\\") || endpoint.starts_with("//") => {
            (format!("npipe://{endpoint}"), Transport::Socket)
        }
        _ => (format!("unix://{endpoint}"), Transport::Socket),
    }
}

/// Provides methods to connect to Docker or Podman container engines and to
/// drive image operations through them.
pub struct EngineConnector;

impl EngineConnector {
    /// Connect to the container engine at the specified socket path.
    ///
    /// Supports the following endpoint formats:
    /// - Unix sockets: `unix:///path/to/socket`
    /// - Windows named pipes: `npipe:////./pipe/name`
    /// - TCP: `tcp://host:port` (treated as HTTP connection)
    /// - HTTP: `http://host:port`
    /// - HTTPS: `https://host:port`
    /// - Bare paths: paths starting with `\\` or `//` are treated as Windows
    ///   named pipes, all others as Unix sockets. Detection is syntax-based,
    ///   not platform-based.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::SocketNotFound` when the socket does not exist,
    /// `EngineError::PermissionDenied` when it cannot be opened, and
    /// `EngineError::ConnectionFailed` otherwise.
    pub fn connect(socket: impl AsRef<str>) -> Result<Docker, DockhandError> {
        let (uri, transport) = normalise_endpoint(socket.as_ref());
        debug!(endpoint = %uri, ?transport, "opening engine client");

        let client = match transport {
            Transport::Http => {
                Docker::connect_with_http(&uri, CONNECTION_TIMEOUT_SECS, API_DEFAULT_VERSION)
            }
            Transport::Socket => {
                Docker::connect_with_socket(&uri, CONNECTION_TIMEOUT_SECS, API_DEFAULT_VERSION)
            }
        };

        client.map_err(|error| DockhandError::from(classify_connection_error(&error, &uri)))
    }

    /// Connect using the resolved socket from configuration and environment.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::connect`].
    pub fn connect_with_fallback<S: AsRef<str> + ?Sized, E: mockable::Env>(
        config_socket: Option<&S>,
        resolver: &SocketResolver<'_, E>,
    ) -> Result<Docker, DockhandError> {
        let socket = Self::resolve_socket(config_socket, resolver);
        Self::connect(socket)
    }

    /// Resolves the socket endpoint without establishing a connection.
    ///
    /// Resolution order:
    /// 1. `config_socket` (from CLI, `DOCKHAND_ENGINE_SOCKET`, or config file)
    /// 2. `DOCKER_HOST`, `CONTAINER_HOST`, `PODMAN_HOST` (via resolver)
    /// 3. Platform default socket
    #[must_use]
    pub fn resolve_socket<S: AsRef<str> + ?Sized, E: mockable::Env>(
        config_socket: Option<&S>,
        resolver: &SocketResolver<'_, E>,
    ) -> String {
        config_socket
            .map(AsRef::as_ref)
            .filter(|socket| !socket.is_empty())
            .map(String::from)
            .or_else(|| resolver.resolve_from_env())
            .unwrap_or_else(|| String::from(SocketResolver::<E>::default_socket()))
    }
}
