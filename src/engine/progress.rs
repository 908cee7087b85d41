//! Decoding and scanning of streamed engine progress messages.
//!
//! Build, pull, and push responses arrive as a stream of JSON messages. The
//! engine reports failures inside that stream rather than through the HTTP
//! status, so every stream is drained and inspected for an embedded error.
//! Typed `bollard` responses are mapped field by field onto [`ProgressMessage`].

use bollard::models::{BuildInfo, CreateImageInfo, ErrorDetail, PushImageInfo};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Boxed stream of progress messages returned by the streaming engine seams.
pub type ProgressStream<'a> = BoxStream<'a, Result<ProgressMessage, bollard::errors::Error>>;

/// Structured error attached to a progress message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressErrorDetail {
    /// Engine-specific error code, when provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Human-readable error text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One message from an engine progress stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressMessage {
    /// Layer or object identifier the message refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Status line, e.g. `Pulling fs layer`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Raw build output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
    /// Rendered progress bar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    /// Legacy error string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Structured error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<ProgressErrorDetail>,
}

impl ProgressMessage {
    /// Create a message carrying only a status line.
    #[must_use]
    pub fn from_status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }

    /// Create a message carrying an embedded error.
    #[must_use]
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            error_detail: Some(ProgressErrorDetail {
                code: None,
                message: Some(message.into()),
            }),
            ..Self::default()
        }
    }

    /// Return the embedded error, if any.
    ///
    /// `errorDetail.message` takes precedence over the legacy `error` field.
    /// Empty strings are not treated as errors.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_detail
            .as_ref()
            .and_then(|detail| detail.message.as_deref())
            .filter(|message| !message.is_empty())
            .or_else(|| self.error.as_deref().filter(|message| !message.is_empty()))
    }
}

impl From<ErrorDetail> for ProgressErrorDetail {
    fn from(detail: ErrorDetail) -> Self {
        Self {
            code: detail.code,
            message: detail.message,
        }
    }
}

impl From<BuildInfo> for ProgressMessage {
    fn from(info: BuildInfo) -> Self {
        Self {
            id: info.id,
            status: info.status,
            stream: info.stream,
            error_detail: info.error_detail.map(ProgressErrorDetail::from),
            ..Self::default()
        }
    }
}

impl From<CreateImageInfo> for ProgressMessage {
    fn from(info: CreateImageInfo) -> Self {
        Self {
            id: info.id,
            status: info.status,
            error_detail: info.error_detail.map(ProgressErrorDetail::from),
            ..Self::default()
        }
    }
}

impl From<PushImageInfo> for ProgressMessage {
    fn from(info: PushImageInfo) -> Self {
        Self {
            status: info.status,
            error_detail: info.error_detail.map(ProgressErrorDetail::from),
            ..Self::default()
        }
    }
}

/// Failure observed while draining a progress stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProgressFailure {
    /// The engine reported an error inside the stream.
    Embedded(String),
    /// The stream itself failed.
    Transport(String),
}

impl ProgressFailure {
    pub(crate) fn into_message(self) -> String {
        match self {
            Self::Embedded(message) | Self::Transport(message) => message,
        }
    }
}

/// Consume `stream` to the end, stopping at the first error.
///
/// Returns the number of messages seen on success.
pub(crate) async fn drain_progress(
    operation: &'static str,
    mut stream: ProgressStream<'_>,
) -> Result<usize, ProgressFailure> {
    let mut seen = 0_usize;

    while let Some(item) = stream.next().await {
        match item {
            Ok(message) => {
                seen += 1;
                if let Some(error) = message.error_message() {
                    warn!(operation, error, "engine reported an error");
                    return Err(ProgressFailure::Embedded(String::from(error)));
                }
                debug!(
                    operation,
                    id = message.id.as_deref().unwrap_or_default(),
                    status = message.status.as_deref().unwrap_or_default(),
                    stream = message.stream.as_deref().map(str::trim_end).unwrap_or_default(),
                    progress = message.progress.as_deref().unwrap_or_default(),
                    "progress"
                );
            }
            Err(bollard::errors::Error::DockerStreamError { error }) => {
                warn!(operation, error = %error, "engine reported an error");
                return Err(ProgressFailure::Embedded(error));
            }
            Err(error) => {
                warn!(operation, error = %error, "progress stream failed");
                return Err(ProgressFailure::Transport(error.to_string()));
            }
        }
    }

    Ok(seen)
}
