//! Configuration data types for dockhand.

use std::fmt;

use ortho_config::{OrthoConfig, OrthoResult, PostMergeContext, PostMergeHook};
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Registry credentials configuration.
///
/// Credentials are only sent to the engine when `username` is set.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegistryConfig {
    /// Registry server address (for example `registry.example.com`).
    ///
    /// When unset, credentials are keyed by the Docker Hub index address.
    pub address: Option<String>,

    /// Registry user name.
    pub username: Option<String>,

    /// Registry password or access token.
    pub password: Option<String>,
}

impl RegistryConfig {
    /// Returns whether enough is configured to authenticate.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.username
            .as_deref()
            .is_some_and(|username| !username.trim().is_empty())
    }
}

impl fmt::Debug for RegistryConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RegistryConfig")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Settings applied to every image build.
#[derive(Debug, Clone, PartialEq, Eq, SmartDefault, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Dockerfile name relative to the build context.
    pub dockerfile: Option<String>,

    /// Build without the layer cache.
    #[default = true]
    pub no_cache: bool,

    /// Always remove intermediate containers, even after a failed build.
    #[default = true]
    pub force_rm: bool,

    /// Attempt to pull newer versions of base images.
    #[default = true]
    pub pull_parent: bool,
}

/// Root application configuration.
///
/// This structure is loaded from configuration files, environment variables,
/// and command-line arguments with layered precedence. The precedence order
/// (lowest to highest) is: defaults, configuration file, environment variables,
/// command-line arguments.
///
/// Configuration files are discovered in this order:
/// 1. Path specified via `DOCKHAND_CONFIG_PATH` environment variable
/// 2. `.dockhand.toml` in the current working directory
/// 3. `.dockhand.toml` in the home directory
/// 4. `~/.config/dockhand/config.toml` (XDG default)
#[derive(Debug, Clone, Default, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(
    prefix = "DOCKHAND",
    post_merge_hook,
    discovery(
        app_name = "dockhand",
        env_var = "DOCKHAND_CONFIG_PATH",
        config_file_name = "config.toml",
        dotfile_name = ".dockhand.toml",
        config_cli_long = "config",
        config_cli_visible = true,
    )
)]
pub struct AppConfig {
    /// The container engine socket path or URL.
    pub engine_socket: Option<String>,

    /// Registry credentials.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub registry: RegistryConfig,

    /// Image build settings.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub build: BuildConfig,
}

impl AppConfig {
    /// Treat blank strings from any layer as unset values.
    pub fn clear_blank_values(&mut self) {
        for value in [
            &mut self.engine_socket,
            &mut self.registry.address,
            &mut self.registry.username,
            &mut self.build.dockerfile,
        ] {
            if value.as_deref().is_some_and(|text| text.trim().is_empty()) {
                *value = None;
            }
        }
    }
}

impl PostMergeHook for AppConfig {
    fn post_merge(&mut self, _ctx: &PostMergeContext) -> OrthoResult<()> {
        self.clear_blank_values();
        Ok(())
    }
}
