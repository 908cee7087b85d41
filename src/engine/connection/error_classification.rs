//! Error classification helpers for container engine connection failures.
//!
//! Low-level `Bollard` errors are mapped onto `EngineError` variants naming the
//! socket path where one can be recovered.

use std::io::ErrorKind;
use std::path::Path;

use crate::error::EngineError;

/// Extract the filesystem path from a socket URI.
///
/// Strips the scheme prefix (`unix://`, `npipe://`) to get the raw path.
/// For HTTP endpoints or bare paths, returns `None` as they either do not have
/// filesystem paths or lack the scheme prefix needed for reliable extraction.
pub(super) fn extract_socket_path(socket_uri: &str) -> Option<&Path> {
    socket_uri
        .strip_prefix("unix://")
        .or_else(|| socket_uri.strip_prefix("npipe://"))
        .map(Path::new)
}

fn classify_io_error_kind(
    kind: ErrorKind,
    socket_path: Option<&Path>,
    message: String,
) -> EngineError {
    match (kind, socket_path) {
        (ErrorKind::PermissionDenied, Some(path)) => EngineError::PermissionDenied {
            path: path.to_path_buf(),
        },
        (ErrorKind::NotFound, Some(path)) => EngineError::SocketNotFound {
            path: path.to_path_buf(),
        },
        _ => EngineError::ConnectionFailed { message },
    }
}

/// Classify a `Bollard` connection error into a semantic `EngineError`.
///
/// Only endpoints with a filesystem path can produce `SocketNotFound` or
/// `PermissionDenied`; everything else is `ConnectionFailed`.
pub(super) fn classify_connection_error(
    bollard_error: &bollard::errors::Error,
    socket_uri: &str,
) -> EngineError {
    let socket_path = extract_socket_path(socket_uri);
    let message = bollard_error.to_string();

    let io_kind = match bollard_error {
        bollard::errors::Error::SocketNotFoundError(_) => Some(ErrorKind::NotFound),
        bollard::errors::Error::IOError { err } => {
            Some(io_error_kind_in_chain(err).unwrap_or_else(|| err.kind()))
        }
        other => io_error_kind_in_chain(other),
    };

    match io_kind {
        Some(kind) => classify_io_error_kind(kind, socket_path, message),
        None => EngineError::ConnectionFailed { message },
    }
}

/// Walk the error source chain looking for an `io::Error` kind.
fn io_error_kind_in_chain(error: &dyn std::error::Error) -> Option<ErrorKind> {
    std::iter::successors(error.source(), |cause| cause.source())
        .find_map(|cause| cause.downcast_ref::<std::io::Error>())
        .map(std::io::Error::kind)
}
