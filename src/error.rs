//! Top-level error types for the packaging tool.
//!
//! Every failure maps onto the tool's exit-code contract through
//! [`BundlerError::exit_code`].

use thiserror::Error;

/// Result type alias for packaging tool operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Exit code for a rejected Go target environment.
pub const EXIT_UNSUPPORTED_TARGET: i32 = 1;

/// Exit code for every build or toolchain failure.
pub const EXIT_FAILURE: i32 = 2;

/// Main error type for the packaging tool
#[derive(Error, Debug)]
pub enum BundlerError {
    /// CLI argument errors
    #[error("{0}")]
    Cli(#[from] CliError),

    /// Packaging errors
    #[error(transparent)]
    Bundler(#[from] crate::bundler::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Missing value after a flag
    #[error("missing value for {flag}")]
    MissingValue {
        /// The flag as given
        flag: String,
    },
}

impl BundlerError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Bundler(err) if err.is_unsupported_target() => EXIT_UNSUPPORTED_TARGET,
            _ => EXIT_FAILURE,
        }
    }
}
