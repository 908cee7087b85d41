//! Minimal client for building and managing container images.
//!
//! `dockhand` drives a Docker or Podman engine through its remote API: it
//! builds images from a local context, pulls and pushes them to registries,
//! and lists, tags, and removes local images. The only work done locally is
//! assembling the build-context archive (honouring `.dockerignore`) and
//! scanning the engine's progress stream for reported errors.
//!
//! # Modules
//!
//! - [`client`]: [`client::ImageClient`], the configured façade over one engine
//! - [`config`]: Configuration system with layered precedence (CLI > env > file > defaults)
//! - [`context`]: Build-context archiving and ignore-file matching
//! - [`engine`]: Engine connection and the individual image operations
//! - [`error`]: Semantic error types for the library

pub mod client;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
