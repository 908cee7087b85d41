//! Configuration system for dockhand.
//!
//! This module provides the configuration structures, CLI definitions, and the
//! layered loader. Precedence: CLI flags override environment variables, which
//! override configuration files, which override defaults.
//!
//! The configuration file is expected at `~/.config/dockhand/config.toml` by
//! default.
//!
//! # Example Configuration
//!
//! ```toml
//! engine_socket = "unix:///run/user/1000/podman/podman.sock"
//!
//! [registry]
//! address = "registry.example.com"
//! username = "builder"
//! password = "s3cret"
//!
//! [build]
//! dockerfile = "Dockerfile"
//! no_cache = true
//! force_rm = true
//! pull_parent = true
//! ```

mod cli;
mod loader;
mod types;


pub use cli::{BuildArgs, Cli, Commands, ImageArgs, ImagesArgs, TagArgs};
pub use loader::{env_var_names, load_config, load_config_with_env};
pub use types::{AppConfig, BuildConfig, RegistryConfig};
