use std::{error::Error as StdError, time::Duration};

use {chainball_protocol::FrameError, serde::Serialize};

/// Coarse failure class, for callers that only need to pick a status to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request could not be sent or the reply could not be received.
    Transport,
    /// No reply arrived before the deadline; the server is likely offline.
    Timeout,
    /// The reply (or the requested call) does not match the wire contract.
    Protocol,
    /// The server answered with a non-ok status.
    Remote,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid call type: {0}")]
    UnknownCall(String),

    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("connection timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("received malformed response: {0}")]
    Protocol(#[from] FrameError),

    #[error("scoreboard server reported an error")]
    Remote { data: Option<serde_json::Value> },
}

impl Error {
    #[must_use]
    pub fn transport<E>(context: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self::Transport {
            context: context.into(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(FrameError::shape(msg))
    }

    /// A `null` payload carries no diagnostic and is stored as `None`.
    #[must_use]
    pub fn remote(payload: serde_json::Value) -> Self {
        Self::Remote {
            data: (!payload.is_null()).then_some(payload),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownCall(_) | Self::Protocol(_) => ErrorKind::Protocol,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Remote { .. } => ErrorKind::Remote,
        }
    }

    /// Diagnostic payload attached by the server to a rejected call.
    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Remote { data } => data.as_ref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
