//! Semantic error types for the dockhand library.
//!
//! This module defines the error hierarchy for dockhand, following the principle
//! of using semantic error enums (via `thiserror`) for conditions the caller might
//! inspect or report, while reserving opaque errors (`eyre::Report`) for the
//! application boundary.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be parsed.
    #[error("failed to parse configuration file: {message}")]
    ParseError {
        /// A description of the parse error.
        message: String,
    },

    /// A required configuration value is missing.
    #[error("missing required configuration: {field}")]
    MissingRequired {
        /// The name of the missing field.
        field: String,
    },

    /// A configuration value failed validation.
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// The reason the value is invalid.
        reason: String,
    },

    /// The `OrthoConfig` library returned an error during configuration loading.
    #[error("configuration loading failed: {0}")]
    OrthoConfig(Arc<ortho_config::OrthoError>),
}

/// Errors that can occur while connecting to the container engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Failed to connect to the container engine socket.
    #[error("failed to connect to container engine: {message}")]
    ConnectionFailed {
        /// A description of the connection failure.
        message: String,
    },

    /// The container engine socket was not found.
    #[error("container engine socket not found: {path}")]
    SocketNotFound {
        /// The path where the socket was expected.
        path: PathBuf,
    },

    /// Permission denied when accessing the container engine socket.
    #[error("permission denied accessing container socket: {path}")]
    PermissionDenied {
        /// The path to the socket.
        path: PathBuf,
    },

    /// Failed to create the Tokio runtime used by synchronous helpers.
    #[error("failed to create async runtime: {message}")]
    RuntimeCreationFailed {
        /// A description of the runtime failure.
        message: String,
    },

    /// Health check failed - engine did not respond correctly.
    #[error("container engine health check failed: {message}")]
    HealthCheckFailed {
        /// A description of the health check failure.
        message: String,
    },

    /// Health check timed out.
    #[error("container engine health check timed out after {seconds} seconds")]
    HealthCheckTimeout {
        /// The timeout duration in seconds.
        seconds: u64,
    },
}

/// Errors that can occur during image operations.
///
/// Engine-reported failures found in a progress stream surface through the
/// same variant as transport failures for the operation that produced them.
#[derive(Debug, Error)]
pub enum ImageError {
    /// An image reference could not be parsed.
    #[error("invalid image reference '{reference}': {reason}")]
    InvalidReference {
        /// The reference as supplied.
        reference: String,
        /// Why the reference was rejected.
        reason: String,
    },

    /// Building an image failed.
    #[error("failed to build image '{image}': {message}")]
    BuildFailed {
        /// The tag requested for the built image.
        image: String,
        /// A description of the build failure.
        message: String,
    },

    /// Pulling an image failed.
    #[error("failed to pull image '{image}': {message}")]
    PullFailed {
        /// The image reference being pulled.
        image: String,
        /// A description of the pull failure.
        message: String,
    },

    /// Pushing an image failed.
    #[error("failed to push image '{image}': {message}")]
    PushFailed {
        /// The image reference being pushed.
        image: String,
        /// A description of the push failure.
        message: String,
    },

    /// Listing local images failed.
    #[error("failed to list images: {message}")]
    ListFailed {
        /// A description of the listing failure.
        message: String,
    },

    /// Tagging an image failed.
    #[error("failed to tag image '{source_image}' as '{target}': {message}")]
    TagFailed {
        /// The existing image reference.
        source_image: String,
        /// The requested new reference.
        target: String,
        /// A description of the tag failure.
        message: String,
    },

    /// Removing an image failed.
    #[error("failed to remove image '{image}': {message}")]
    RemoveFailed {
        /// The image reference being removed.
        image: String,
        /// A description of the removal failure.
        message: String,
    },
}

/// Errors that can occur while assembling a build context archive.
#[derive(Debug, Error)]
pub enum BuildContextError {
    /// The Dockerfile could not be found in the build context.
    #[error("cannot locate Dockerfile: {dockerfile}")]
    DockerfileNotFound {
        /// The Dockerfile name as requested.
        dockerfile: String,
    },

    /// The Dockerfile path cannot be expressed inside the build context.
    #[error("invalid Dockerfile path '{dockerfile}': {reason}")]
    InvalidDockerfilePath {
        /// The Dockerfile name as requested.
        dockerfile: String,
        /// Why the path was rejected.
        reason: String,
    },

    /// A `.dockerignore` pattern is malformed.
    #[error("invalid ignore pattern '{pattern}': {reason}")]
    InvalidIgnorePattern {
        /// The offending pattern.
        pattern: String,
        /// Why the pattern was rejected.
        reason: String,
    },

    /// An entry in the build context could not be read.
    #[error(
        "error checking context is accessible: '{path}': {message}; \
         please check permissions and try again"
    )]
    ContextInaccessible {
        /// The context-relative path of the unreadable entry.
        path: String,
        /// A description of the I/O failure.
        message: String,
    },
}

/// Errors that can occur during filesystem operations.
#[derive(Debug, Error)]
pub enum FilesystemError {
    /// A file or directory was not found.
    #[error("path not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// Permission denied when accessing a path.
    #[error("permission denied: {path}")]
    PermissionDenied {
        /// The path that could not be accessed.
        path: PathBuf,
    },

    /// An I/O error occurred.
    #[error("I/O error at '{path}': {message}")]
    IoError {
        /// The path where the error occurred.
        path: PathBuf,
        /// A description of the I/O error.
        message: String,
    },
}

impl FilesystemError {
    /// Classify an I/O error observed at `path`.
    #[must_use]
    pub fn from_io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path_buf = path.into();
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path: path_buf },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path: path_buf },
            _ => Self::IoError {
                path: path_buf,
                message: error.to_string(),
            },
        }
    }
}

/// Top-level error type for dockhand.
///
/// This enum aggregates all domain-specific errors into a single type that can
/// be used throughout the crate. At the application boundary (main.rs), these
/// errors are converted to `eyre::Report` for human-readable reporting.
#[derive(Debug, Error)]
pub enum DockhandError {
    /// An error occurred during configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred while talking to the engine.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// An image operation failed.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// The build context could not be assembled.
    #[error(transparent)]
    BuildContext(#[from] BuildContextError),

    /// An error occurred during filesystem operations.
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// A specialised `Result` type for dockhand operations.
pub type Result<T> = std::result::Result<T, DockhandError>;
