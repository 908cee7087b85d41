//! Command-line argument definitions for dockhand.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Command-line interface for dockhand.
#[derive(Debug, Parser)]
#[command(name = "dockhand")]
#[command(
    author,
    version,
    about = "Build, push, and manage container images through a Docker or Podman engine"
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file.
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Container engine socket path or URL.
    #[arg(long, global = true)]
    pub engine_socket: Option<String>,

    /// Registry server address used for credentials.
    #[arg(long, global = true)]
    pub registry: Option<String>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build an image from a context directory.
    Build(BuildArgs),

    /// Pull an image from its registry.
    Pull(ImageArgs),

    /// Push an image to its registry.
    Push(ImageArgs),

    /// List local images.
    Images(ImagesArgs),

    /// Tag a local image with a new reference.
    Tag(TagArgs),

    /// Remove a local image.
    Rmi(ImageArgs),

    /// Check that the container engine responds.
    Ping,
}

/// Arguments for the `build` subcommand.
#[derive(Debug, Parser)]
pub struct BuildArgs {
    /// Build context directory.
    #[arg(required = true)]
    pub context: Utf8PathBuf,

    /// Reference to tag the built image with.
    #[arg(long, short = 't', required = true)]
    pub tag: String,

    /// Dockerfile name relative to the context.
    #[arg(long, short = 'f')]
    pub file: Option<String>,

    /// Build argument as `KEY=VALUE`, or `KEY` to leave it unset.
    #[arg(long = "build-arg", value_parser = parse_build_arg)]
    pub build_args: Vec<(String, Option<String>)>,
}

/// Arguments naming a single image.
#[derive(Debug, Parser)]
pub struct ImageArgs {
    /// Image reference.
    #[arg(required = true)]
    pub image: String,
}

/// Arguments for the `images` subcommand.
#[derive(Debug, Parser)]
pub struct ImagesArgs {
    /// Engine filter as `KEY=VALUE` (for example `dangling=true`).
    #[arg(long = "filter", value_parser = parse_filter)]
    pub filters: Vec<(String, String)>,
}

/// Arguments for the `tag` subcommand.
#[derive(Debug, Parser)]
pub struct TagArgs {
    /// Existing image reference.
    #[arg(required = true)]
    pub source: String,

    /// New reference to add.
    #[arg(required = true)]
    pub target: String,
}

fn parse_build_arg(raw: &str) -> Result<(String, Option<String>), String> {
    let (key, value) = match raw.split_once('=') {
        Some((key, value)) => (key, Some(String::from(value))),
        None => (raw, None),
    };
    if key.is_empty() {
        return Err(format!("build argument '{raw}' has an empty name"));
    }
    Ok((String::from(key), value))
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((String::from(key), String::from(value))),
        _ => Err(format!("filter '{raw}' must be KEY=VALUE")),
    }
}
