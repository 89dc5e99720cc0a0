//! Errors raised while talking to the remote archive.

use thiserror::Error;

use grid_codec::CodecError;

pub type ArchiveResult<T> = Result<T, ArchiveError>;

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Connection, TLS or body read failure.
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// The per-call time budget ran out.
    #[error("Request to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// The archive answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// The archive listing could not be obtained or parsed.
    #[error("Archive unavailable: {0}")]
    Unavailable(String),

    /// The step index has no entry for a parameter.
    #[error("Parameter {code}/{levtype} not found in index {url}")]
    MissingEntry {
        url: String,
        code: String,
        levtype: String,
    },

    /// The step index could not be parsed.
    #[error("Malformed index {url}: {message}")]
    MalformedIndex { url: String, message: String },

    #[error(transparent)]
    Decode(#[from] CodecError),
}

impl ArchiveError {
    /// Map a reqwest error onto the transport taxonomy.
    pub fn from_reqwest(url: &str, secs: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
                secs,
            }
        } else if let Some(status) = err.status() {
            Self::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}
