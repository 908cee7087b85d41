//! `dockhand` application entry point.
//!
//! This binary builds, moves, and manages container images through a Docker
//! or Podman engine. It uses `eyre` for opaque error handling at the
//! application boundary, converting domain-specific errors into
//! human-readable reports.
//!
//! Configuration is loaded with layered precedence via `OrthoConfig`:
//! 1. Application defaults
//! 2. Configuration file (`~/.config/dockhand/config.toml` or path from `DOCKHAND_CONFIG_PATH`)
//! 3. Environment variables (`DOCKHAND_*`)
//! 4. Command-line arguments

use std::collections::BTreeMap;

use clap::Parser;
use dockhand::client::ImageClient;
use dockhand::config::{
    AppConfig, BuildArgs, Cli, Commands, ImageArgs, ImagesArgs, TagArgs, load_config,
};
use dockhand::engine::{EngineConnector, ImageSummary, RemovedImage};
use dockhand::error::{DockhandError, EngineError, Result as DockhandResult};
use eyre::{Report, Result as EyreResult};
use tracing_subscriber::EnvFilter;

/// Log filter applied when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "dockhand=info";

/// Application entry point.
///
/// Installs logging, loads configuration with layered precedence, then
/// dispatches to the subcommand handler on a Tokio runtime.
fn main() -> EyreResult<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli).map_err(Report::from)?;

    let runtime = tokio::runtime::Runtime::new().map_err(|error| {
        Report::from(DockhandError::from(EngineError::RuntimeCreationFailed {
            message: error.to_string(),
        }))
    })?;

    runtime.block_on(run(&cli, &config)).map_err(Report::from)
}

/// Send structured logs to stderr, filtered by `RUST_LOG`.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Execute the CLI command, returning domain-specific errors.
///
/// Keeps semantic errors inside the run loop so the CLI boundary owns
/// conversion to `eyre::Report`.
async fn run(cli: &Cli, config: &AppConfig) -> DockhandResult<()> {
    let client = ImageClient::connect(config)?;

    match &cli.command {
        Commands::Build(args) => build(&client, args).await,
        Commands::Pull(ImageArgs { image }) => client.pull(image).await,
        Commands::Push(ImageArgs { image }) => client.push(image).await,
        Commands::Images(args) => list(&client, args).await,
        Commands::Tag(TagArgs { source, target }) => client.tag(source, target).await,
        Commands::Rmi(ImageArgs { image }) => remove(&client, image).await,
        Commands::Ping => ping(&client).await,
    }
}

/// Build an image, letting `--file` override the configured Dockerfile.
async fn build(client: &ImageClient, args: &BuildArgs) -> DockhandResult<()> {
    let build_args: BTreeMap<String, Option<String>> = args.build_args.iter().cloned().collect();
    let configured = client.build_request(args.context.clone(), &args.tag, build_args)?;
    let request = match &args.file {
        Some(file) => configured.with_dockerfile(Some(file.clone())),
        None => configured,
    };
    EngineConnector::build_image_async(client.engine(), &request).await
}

/// List local images, one line per image.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
async fn list(client: &ImageClient, args: &ImagesArgs) -> DockhandResult<()> {
    let filters: BTreeMap<String, String> = args.filters.iter().cloned().collect();
    let images = client.list(&filters).await?;

    println!("{:<40} {:<20} {:>12}", "REPOSITORY:TAG", "IMAGE ID", "SIZE");
    for image in &images {
        println!("{}", summary_line(image));
    }
    Ok(())
}

fn summary_line(image: &ImageSummary) -> String {
    let short_id = image
        .id
        .strip_prefix("sha256:")
        .unwrap_or(&image.id)
        .chars()
        .take(12)
        .collect::<String>();
    let reference = image
        .repo_tags
        .first()
        .map_or("<none>:<none>", String::as_str);
    format!("{reference:<40} {short_id:<20} {:>12}", image.size)
}

/// Remove an image, reporting each effect.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
async fn remove(client: &ImageClient, image: &str) -> DockhandResult<()> {
    for effect in client.remove(image).await? {
        match effect {
            RemovedImage::Untagged(reference) => println!("Untagged: {reference}"),
            RemovedImage::Deleted(id) => println!("Deleted: {id}"),
        }
    }
    Ok(())
}

/// Report whether the engine answers.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
async fn ping(client: &ImageClient) -> DockhandResult<()> {
    client.ping().await?;
    println!("Container engine is responding.");
    Ok(())
}
