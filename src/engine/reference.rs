//! Image reference parsing.
//!
//! References take the form `[registry/]path[:tag][@digest]`. Only the
//! structure needed to drive the engine's pull, push, and tag endpoints is
//! recovered; validation of individual components is left to the engine.

use std::fmt;

use crate::error::ImageError;

/// Tag assumed when a reference does not name one.
pub const DEFAULT_TAG: &str = "latest";

/// A parsed image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    repository: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageReference {
    /// Parse `reference` into repository, tag, and digest.
    ///
    /// The tag separator is the last `:` after the last `/`, so registry
    /// ports (`localhost:5000/app`) are not mistaken for tags.
    ///
    /// # Errors
    ///
    /// Returns `ImageError::InvalidReference` for empty references, empty
    /// components, or references containing whitespace.
    pub fn parse(reference: &str) -> Result<Self, ImageError> {
        let invalid = |reason: &str| ImageError::InvalidReference {
            reference: String::from(reference),
            reason: String::from(reason),
        };

        if reference.is_empty() {
            return Err(invalid("reference is empty"));
        }
        if reference.chars().any(char::is_whitespace) {
            return Err(invalid("reference contains whitespace"));
        }

        let (name, digest) = match reference.split_once('@') {
            Some((_, "")) => return Err(invalid("digest is empty")),
            Some((name, digest)) => (name, Some(String::from(digest))),
            None => (reference, None),
        };

        let (repository, tag) = name
            .rsplit_once(':')
            .filter(|(_, tag)| !tag.contains('/'))
            .map_or((name, None), |(repository, tag)| (repository, Some(tag)));

        if repository.is_empty() {
            return Err(invalid("repository is empty"));
        }
        if repository.split('/').any(str::is_empty) {
            return Err(invalid("repository contains an empty path component"));
        }
        if tag.is_some_and(str::is_empty) {
            return Err(invalid("tag is empty"));
        }

        Ok(Self {
            repository: String::from(repository),
            tag: tag.map(String::from),
            digest,
        })
    }

    /// Return the repository, including any registry host.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Return the explicit tag, if one was given.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Return the tag, defaulting to `latest`.
    #[must_use]
    pub fn tag_or_default(&self) -> &str {
        self.tag().unwrap_or(DEFAULT_TAG)
    }

    /// Return the digest, if one was given.
    #[must_use]
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Return the value for the engine's `fromImage` pull parameter.
    ///
    /// A digest stays attached to the repository so the engine pulls the
    /// pinned content.
    #[must_use]
    pub fn pull_source(&self) -> String {
        self.digest.as_ref().map_or_else(
            || self.repository.clone(),
            |digest| format!("{}@{digest}", self.repository),
        )
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}
