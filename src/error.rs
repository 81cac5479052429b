use std::{fmt, time::Duration};
use thiserror::Error as ThisError;

/// The pipeline stage an error aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    List,
    Detail,
    Tags,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Stage::List => "list",
            Stage::Detail => "detail",
            Stage::Tags => "tags",
        };
        f.write_str(stage)
    }
}

#[allow(clippy::enum_variant_names)]
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("not found delivery stream: {0}")]
    NotFound(String),
    #[error("aws-sdk error: {0}")]
    SdkError(Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("operation cancelled")]
    Cancelled,
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("disconnected channel: {0}")]
    Disconnected(String),
    #[error("invalid schema: {0}")]
    Schema(String),
    #[error("failed to write rows: {0}")]
    Write(String),
    #[error("failed to list delivery streams: {0}")]
    List(#[source] Box<Error>),
    #[error("failed to describe delivery stream {name}: {source}")]
    Detail {
        name: String,
        #[source]
        source: Box<Error>,
    },
    #[error("failed to list tags of delivery stream {name}: {source}")]
    Tags {
        name: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn list(err: Error) -> Self {
        Error::List(Box::new(err))
    }

    pub(crate) fn detail(name: impl Into<String>, err: Error) -> Self {
        Error::Detail {
            name: name.into(),
            source: Box::new(err),
        }
    }

    pub(crate) fn tags(name: impl Into<String>, err: Error) -> Self {
        Error::Tags {
            name: name.into(),
            source: Box::new(err),
        }
    }

    /// The stage this error was raised at, if it has been wrapped by one.
    ///
    /// Cancellation requested through a [`CancelHandle`](crate::cancel::CancelHandle) is not
    /// tied to a stage and returns `None`.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::List(_) => Some(Stage::List),
            Error::Detail { .. } => Some(Stage::Detail),
            Error::Tags { .. } => Some(Stage::Tags),
            _ => None,
        }
    }

    /// Return true if the error, or the error it wraps, is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::List(source) => source.is_cancelled(),
            Error::Detail { source, .. } | Error::Tags { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}
