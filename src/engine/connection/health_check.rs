//! Engine health checks and connect-and-verify helpers.

use std::time::Duration;

use bollard::Docker;
use tracing::debug;

use super::{EngineConnector, HEALTH_CHECK_TIMEOUT_SECS, SocketResolver};
use crate::error::{DockhandError, EngineError};

impl EngineConnector {
    /// Ping the engine, failing after the health-check timeout.
    pub(super) async fn ping_with_timeout(docker: &Docker) -> Result<(), DockhandError> {
        let timeout = Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS);

        let response = tokio::time::timeout(timeout, docker.ping())
            .await
            .map_err(|_| EngineError::HealthCheckTimeout {
                seconds: HEALTH_CHECK_TIMEOUT_SECS,
            })?
            .map_err(|error| EngineError::HealthCheckFailed {
                message: error.to_string(),
            })?;

        debug!(response = %response, "engine answered ping");
        Ok(())
    }

    /// Verify the container engine is responsive (async version).
    ///
    /// # Errors
    ///
    /// Returns `EngineError::HealthCheckFailed` if the engine does not
    /// respond correctly, or `EngineError::HealthCheckTimeout` if it does not
    /// answer within ten seconds.
    pub async fn health_check_async(docker: &Docker) -> Result<(), DockhandError> {
        Self::ping_with_timeout(docker).await
    }

    /// Verify the container engine is responsive.
    ///
    /// Creates a dedicated Tokio runtime; prefer
    /// [`Self::health_check_async`] inside async code.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::RuntimeCreationFailed` if the runtime cannot be
    /// created, plus the errors of [`Self::health_check_async`].
    pub fn health_check(docker: &Docker) -> Result<(), DockhandError> {
        Self::create_runtime()?.block_on(Self::health_check_async(docker))
    }

    /// Create a Tokio runtime for synchronous helpers.
    pub(super) fn create_runtime() -> Result<tokio::runtime::Runtime, DockhandError> {
        tokio::runtime::Runtime::new().map_err(|error| {
            DockhandError::from(EngineError::RuntimeCreationFailed {
                message: error.to_string(),
            })
        })
    }

    async fn connect_then_verify<F>(connect_fn: F) -> Result<Docker, DockhandError>
    where
        F: FnOnce() -> Result<Docker, DockhandError>,
    {
        let docker = connect_fn()?;
        Self::ping_with_timeout(&docker).await?;
        Ok(docker)
    }

    /// Connect to the engine and verify it responds (async version).
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::connect`] and
    /// [`Self::health_check_async`].
    pub async fn connect_and_verify_async(
        socket: impl AsRef<str>,
    ) -> Result<Docker, DockhandError> {
        let socket_str = socket.as_ref();
        Self::connect_then_verify(|| Self::connect(socket_str)).await
    }

    /// Connect to the engine and verify it responds.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::RuntimeCreationFailed` if the runtime cannot be
    /// created, plus the errors of [`Self::connect_and_verify_async`].
    pub fn connect_and_verify(socket: impl AsRef<str>) -> Result<Docker, DockhandError> {
        Self::create_runtime()?.block_on(Self::connect_and_verify_async(socket))
    }

    /// Resolve the socket, connect, and verify the engine responds.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::connect`] and
    /// [`Self::health_check_async`].
    pub async fn connect_with_fallback_and_verify_async<
        S: AsRef<str> + ?Sized,
        E: mockable::Env,
    >(
        config_socket: Option<&S>,
        resolver: &SocketResolver<'_, E>,
    ) -> Result<Docker, DockhandError> {
        Self::connect_then_verify(|| Self::connect_with_fallback(config_socket, resolver)).await
    }
}
