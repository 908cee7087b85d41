//! Registry credentials sent with build, pull, and push requests.

use std::collections::HashMap;

use bollard::auth::DockerCredentials;

use crate::config::RegistryConfig;

/// Index address used as the credentials key when no registry is configured.
pub const DOCKER_HUB_INDEX: &str = "https://index.docker.io/v1/";

/// Username, password, and server address for one registry.
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryCredentials {
    username: String,
    password: Option<String>,
    server_address: Option<String>,
}

impl std::fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("server_address", &self.server_address)
            .finish()
    }
}

impl RegistryCredentials {
    /// Create credentials for `username`.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: None,
            server_address: None,
        }
    }

    /// Attach a password.
    #[must_use]
    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }

    /// Attach the registry server address.
    #[must_use]
    pub fn with_server_address(mut self, server_address: Option<String>) -> Self {
        self.server_address = server_address.filter(|address| !address.trim().is_empty());
        self
    }

    /// Build credentials from the `[registry]` configuration section.
    ///
    /// Returns `None` unless a non-empty username is configured.
    #[must_use]
    pub fn from_config(registry: &RegistryConfig) -> Option<Self> {
        registry
            .username
            .as_deref()
            .filter(|username| !username.trim().is_empty())
            .map(|username| {
                Self::new(username)
                    .with_password(registry.password.clone())
                    .with_server_address(registry.address.clone())
            })
    }

    /// Return the configured username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Return the configured server address, if any.
    #[must_use]
    pub fn server_address(&self) -> Option<&str> {
        self.server_address.as_deref()
    }

    /// Return the key used in the build credentials map.
    #[must_use]
    pub fn registry_key(&self) -> &str {
        self.server_address().unwrap_or(DOCKER_HUB_INDEX)
    }

    /// Convert into the engine client's credential type.
    #[must_use]
    pub fn to_docker_credentials(&self) -> DockerCredentials {
        DockerCredentials {
            username: Some(self.username.clone()),
            password: self.password.clone(),
            serveraddress: self.server_address.clone(),
            ..DockerCredentials::default()
        }
    }

    /// Return the registry-keyed map sent with build requests.
    #[must_use]
    pub fn to_build_credentials(&self) -> HashMap<String, DockerCredentials> {
        HashMap::from([(String::from(self.registry_key()), self.to_docker_credentials())])
    }
}
