//! Build-context archiving.
//!
//! A build context is the directory tree sent to the engine for an image
//! build. This module resolves the Dockerfile inside it, applies the
//! `.dockerignore` rules found at its root, and produces the uncompressed tar
//! stream the engine expects.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use tracing::debug;

mod archive;
mod ignore;

pub use ignore::{IgnorePattern, PatternMatcher, clean_path, parse_ignore_file};

use crate::error::{BuildContextError, DockhandError, FilesystemError};
use archive::build_context_archive;

/// Dockerfile name used when none is requested.
pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";

/// Name of the ignore file read from the context root.
pub const IGNORE_FILE: &str = ".dockerignore";

const LOWERCASE_DOCKERFILE: &str = "dockerfile";

/// A build context archived and ready to send to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    archive_bytes: Vec<u8>,
    dockerfile: String,
    entry_count: usize,
}

impl BuildContext {
    /// Archive `context_dir`, honouring its `.dockerignore`.
    ///
    /// `dockerfile` is relative to the context root. `None` selects
    /// `Dockerfile`, falling back to a lowercase `dockerfile` when only that
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns `FilesystemError` when the context directory cannot be opened,
    /// `BuildContextError::DockerfileNotFound` or
    /// `BuildContextError::InvalidDockerfilePath` for an unusable Dockerfile,
    /// `BuildContextError::InvalidIgnorePattern` for a malformed
    /// `.dockerignore`, and `BuildContextError::ContextInaccessible` when an
    /// entry cannot be read.
    pub fn from_directory(
        context_dir: &Utf8Path,
        dockerfile: Option<&str>,
    ) -> Result<Self, DockhandError> {
        let root = Dir::open_ambient_dir(context_dir, ambient_authority())
            .map_err(|error| FilesystemError::from_io(context_dir.as_std_path(), &error))?;

        let dockerfile = resolve_dockerfile(&root, dockerfile)?;
        let patterns = read_ignore_patterns(&root)?;
        let matcher = PatternMatcher::new(&patterns)?;

        let forced_includes = forced_includes(&matcher, &dockerfile);
        let archive = build_context_archive(&root, &matcher, &forced_includes)?;

        debug!(
            context = %context_dir,
            dockerfile = %dockerfile,
            entries = archive.entry_count,
            bytes = archive.bytes.len(),
            "archived build context"
        );

        Ok(Self {
            archive_bytes: archive.bytes,
            dockerfile,
            entry_count: archive.entry_count,
        })
    }

    /// Return the uncompressed tar stream.
    #[must_use]
    pub fn archive_bytes(&self) -> &[u8] {
        &self.archive_bytes
    }

    /// Consume the context, returning the tar stream.
    #[must_use]
    pub fn into_archive_bytes(self) -> Vec<u8> {
        self.archive_bytes
    }

    /// Return the Dockerfile's path inside the archive.
    #[must_use]
    pub fn dockerfile(&self) -> &str {
        &self.dockerfile
    }

    /// Return the number of entries archived.
    #[must_use]
    pub const fn entry_count(&self) -> usize {
        self.entry_count
    }
}

fn resolve_dockerfile(root: &Dir, requested: Option<&str>) -> Result<String, DockhandError> {
    let requested_name = requested
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(DEFAULT_DOCKERFILE);
    let relative = normalize_dockerfile_path(requested_name)?;

    if is_regular_file(root, &relative)? {
        return Ok(relative);
    }

    if requested.is_none() && is_regular_file(root, LOWERCASE_DOCKERFILE)? {
        return Ok(String::from(LOWERCASE_DOCKERFILE));
    }

    Err(BuildContextError::DockerfileNotFound {
        dockerfile: String::from(requested_name),
    }
    .into())
}

fn normalize_dockerfile_path(name: &str) -> Result<String, BuildContextError> {
    let cleaned = clean_path(name);
    let relative = cleaned.trim_start_matches('/');

    if relative.is_empty() || relative == "." {
        return Err(BuildContextError::InvalidDockerfilePath {
            dockerfile: String::from(name),
            reason: String::from("path does not name a file"),
        });
    }

    if relative == ".." || relative.starts_with("../") {
        return Err(BuildContextError::InvalidDockerfilePath {
            dockerfile: String::from(name),
            reason: String::from("path escapes the build context"),
        });
    }

    Ok(String::from(relative))
}

fn is_regular_file(root: &Dir, relative: &str) -> Result<bool, DockhandError> {
    match root.metadata(relative) {
        Ok(metadata) => Ok(metadata.is_file()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(error) => Err(FilesystemError::from_io(Utf8PathBuf::from(relative), &error).into()),
    }
}

fn read_ignore_patterns(root: &Dir) -> Result<Vec<String>, DockhandError> {
    match root.read_to_string(IGNORE_FILE) {
        Ok(contents) => Ok(parse_ignore_file(&contents)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(vec![]),
        Err(error) => Err(BuildContextError::ContextInaccessible {
            path: String::from(IGNORE_FILE),
            message: error.to_string(),
        }
        .into()),
    }
}

/// The ignore file and the Dockerfile are always sent when either is
/// ignored; the engine strips them itself.
fn forced_includes(matcher: &PatternMatcher, dockerfile: &str) -> Vec<String> {
    if matcher.matches(IGNORE_FILE) || matcher.matches(dockerfile) {
        vec![String::from(IGNORE_FILE), String::from(dockerfile)]
    } else {
        vec![]
    }
}
