//! Configuration loading with layered precedence.
//!
//! This module loads configuration with the precedence order (lowest to
//! highest): application defaults, configuration file, environment variables,
//! command-line arguments.
//!
//! The layers are composed manually with `MergeComposer` rather than through
//! the derived `OrthoConfig::load()`, because the `Cli` struct owns subcommand
//! dispatch and the environment layer needs fail-fast validation of typed
//! values.
//!
//! # Environment Variable Handling
//!
//! Environment variables with unparseable values (e.g.,
//! `DOCKHAND_BUILD_NO_CACHE=maybe` instead of `true`/`false`) return an error
//! immediately rather than silently falling back to defaults. String fields
//! (e.g., `DOCKHAND_ENGINE_SOCKET`) are always accepted.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use mockable::Env;
use ortho_config::discovery::ConfigDiscovery;
use ortho_config::serde_json::{self, Map, Value};
use ortho_config::{MergeComposer, toml};
use tracing::debug;

use crate::config::{AppConfig, Cli};
use crate::error::{ConfigError, Result};

/// The type of value expected from an environment variable.
#[derive(Clone, Copy)]
enum EnvVarType {
    /// String value (always accepted).
    String,
    /// Boolean value (`true`/`false`). Invalid values return an error.
    Bool,
}

/// Specification for a single environment variable mapping.
struct EnvVarSpec {
    /// The environment variable name (e.g., `DOCKHAND_ENGINE_SOCKET`).
    env_var: &'static str,
    /// The JSON path segments (e.g., `["build", "no_cache"]`).
    path: &'static [&'static str],
    /// The expected value type.
    var_type: EnvVarType,
}

/// Table of all environment variables and their JSON paths.
const ENV_VAR_SPECS: &[EnvVarSpec] = &[
    EnvVarSpec {
        env_var: "DOCKHAND_ENGINE_SOCKET",
        path: &["engine_socket"],
        var_type: EnvVarType::String,
    },
    // Registry fields
    EnvVarSpec {
        env_var: "DOCKHAND_REGISTRY_ADDRESS",
        path: &["registry", "address"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "DOCKHAND_REGISTRY_USERNAME",
        path: &["registry", "username"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "DOCKHAND_REGISTRY_PASSWORD",
        path: &["registry", "password"],
        var_type: EnvVarType::String,
    },
    // Build fields
    EnvVarSpec {
        env_var: "DOCKHAND_BUILD_DOCKERFILE",
        path: &["build", "dockerfile"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "DOCKHAND_BUILD_NO_CACHE",
        path: &["build", "no_cache"],
        var_type: EnvVarType::Bool,
    },
    EnvVarSpec {
        env_var: "DOCKHAND_BUILD_FORCE_RM",
        path: &["build", "force_rm"],
        var_type: EnvVarType::Bool,
    },
    EnvVarSpec {
        env_var: "DOCKHAND_BUILD_PULL_PARENT",
        path: &["build", "pull_parent"],
        var_type: EnvVarType::Bool,
    },
];

/// Returns the list of environment variable names recognised by the config loader.
///
/// Tests use this to clear every `DOCKHAND_*` variable without keeping a
/// second hard-coded list in sync.
#[must_use]
pub fn env_var_names() -> Vec<&'static str> {
    ENV_VAR_SPECS.iter().map(|spec| spec.env_var).collect()
}

/// Load a configuration file and push it to the composer.
///
/// The parent directory is opened with `cap_std::fs_utf8` and the file is
/// read relative to it.
fn load_config_file(path: &Utf8Path, composer: &mut MergeComposer) -> Result<()> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().unwrap_or(path.as_str());

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|e| {
        ConfigError::ParseError {
            message: format!("failed to open directory {parent}: {e}"),
        }
    })?;

    let content = dir
        .read_to_string(file_name)
        .map_err(|e| ConfigError::ParseError {
            message: format!("failed to read {path}: {e}"),
        })?;

    let value =
        toml::from_str::<serde_json::Value>(&content).map_err(|e| ConfigError::ParseError {
            message: format!("failed to parse {path}: {e}"),
        })?;

    debug!(path = %path, "loaded configuration file");
    composer.push_file(value, Some(path.to_path_buf()));
    Ok(())
}

/// Find the configuration file to load, if any.
///
/// An explicit `--config` path wins when it exists; otherwise the standard
/// discovery locations are searched.
fn discover_config_path(cli: &Cli) -> Option<Utf8PathBuf> {
    cli.config.clone().filter(|p| p.exists()).or_else(|| {
        let discovery = ConfigDiscovery::builder("dockhand")
            .env_var("DOCKHAND_CONFIG_PATH")
            .config_file_name("config.toml")
            .dotfile_name(".dockhand.toml")
            .build();
        discovery
            .candidates()
            .into_iter()
            .filter(|p| p.exists())
            .find_map(|p| Utf8PathBuf::try_from(p).ok())
    })
}

/// Load configuration with full layer precedence from the process environment.
///
/// Sources, later overriding earlier:
/// 1. Application defaults defined in the struct
/// 2. Configuration file (discovered via XDG paths or `DOCKHAND_CONFIG_PATH`)
/// 3. Environment variables prefixed with `DOCKHAND_`
/// 4. Command-line arguments (from the provided `Cli`)
///
/// # Errors
///
/// Returns `ConfigError` if configuration loading fails due to:
/// - Malformed configuration files
/// - Invalid typed environment variable values (e.g., non-boolean for
///   `DOCKHAND_BUILD_NO_CACHE`)
pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    load_config_with_env(cli, &mockable::DefaultEnv::new())
}

/// Load configuration reading `DOCKHAND_*` variables through `env`.
///
/// # Errors
///
/// Returns the same errors as [`load_config`].
pub fn load_config_with_env<E: Env>(cli: &Cli, env: &E) -> Result<AppConfig> {
    let mut composer = MergeComposer::new();

    let defaults =
        serde_json::to_value(AppConfig::default()).map_err(|e| ConfigError::ParseError {
            message: format!("failed to serialise defaults: {e}"),
        })?;
    composer.push_defaults(defaults);

    if let Some(path) = discover_config_path(cli) {
        load_config_file(&path, &mut composer)?;
    }

    let env_values = collect_env_vars(env)?;
    if !env_values.is_null() {
        composer.push_environment(env_values);
    }

    let cli_overrides = build_cli_overrides(cli);
    if !cli_overrides.is_null() {
        composer.push_cli(cli_overrides);
    }

    let mut config =
        AppConfig::merge_from_layers(composer.layers()).map_err(ConfigError::OrthoConfig)?;
    config.clear_blank_values();

    Ok(config)
}

/// Collect `DOCKHAND_*` environment variables into a JSON value.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` if a typed environment variable has
/// an unparseable value.
fn collect_env_vars<E: Env>(env: &E) -> Result<Value> {
    let mut root = Map::new();

    for spec in ENV_VAR_SPECS {
        let Some(raw_value) = env.string(spec.env_var) else {
            continue;
        };

        let json_value = match spec.var_type {
            EnvVarType::String => Value::String(raw_value),
            EnvVarType::Bool => Value::Bool(parse_bool(spec.env_var, &raw_value)?),
        };

        insert_at_path(&mut root, spec.path, json_value);
    }

    if root.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(Value::Object(root))
    }
}

fn parse_bool(env_var: &str, raw_value: &str) -> Result<bool> {
    raw_value.trim().parse::<bool>().map_err(|_| {
        ConfigError::InvalidValue {
            field: String::from(env_var),
            reason: format!("expected bool (true/false), got '{raw_value}'"),
        }
        .into()
    })
}

/// Insert a value at a nested path in a JSON map, creating intermediate
/// objects as needed.
fn insert_at_path(root: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((&field, parents)) = path.split_last() else {
        return;
    };

    let mut current = root;
    for &segment in parents {
        let entry = current
            .entry(String::from(segment))
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(obj) = entry.as_object_mut() else {
            return;
        };
        current = obj;
    }

    current.insert(String::from(field), value);
}

/// Build a JSON value containing CLI overrides.
fn build_cli_overrides(cli: &Cli) -> Value {
    let mut overrides = Map::new();

    if let Some(ref socket) = cli.engine_socket {
        overrides.insert(String::from("engine_socket"), Value::String(socket.clone()));
    }

    if let Some(ref registry) = cli.registry {
        insert_at_path(
            &mut overrides,
            &["registry", "address"],
            Value::String(registry.clone()),
        );
    }

    if overrides.is_empty() {
        Value::Null
    } else {
        Value::Object(overrides)
    }
}
