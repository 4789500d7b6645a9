use crate::payload::PayloadError;
use thiserror::Error;

/// Fatal launcher errors.
///
/// None of these are recoverable: the launcher prints the error and exits.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("no payload embedded for {env_var}={tier}")]
    MissingPayload { env_var: &'static str, tier: String },

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("creating memfd: {0}")]
    MemfdCreate(#[source] std::io::Error),

    #[error("writing to memfd: {0}")]
    MemfdWrite(#[source] std::io::Error),

    #[error("short write to memfd: wrote {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("{what} contains an interior NUL byte")]
    InteriorNul { what: &'static str },

    #[error("execveat: {0}")]
    Exec(#[source] std::io::Error),

    #[error("writing payload to stdout: {0}")]
    Extract(#[source] std::io::Error),

    #[error("in-memory process replacement is only supported on Linux")]
    Unsupported,
}
