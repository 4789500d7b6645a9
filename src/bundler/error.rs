//! Packaging error type and helpers.

use crate::bundler::builder::Stage;
use crate::payload::PayloadError;
use std::{
    fmt::Display,
    io,
    path::{Path, PathBuf},
    process::ExitStatus,
};
use thiserror::Error;

/// Result type alias for packaging operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while packaging a launcher.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("{0}")]
    GenericError(String),

    #[error("{context} {}: {error}", path.display())]
    Fs {
        context: &'static str,
        path: PathBuf,
        #[source]
        error: io::Error,
    },

    #[error("failed to run {command}: {error}")]
    CommandFailed {
        command: String,
        #[source]
        error: io::Error,
    },

    #[error("{command} failed with {status}")]
    CommandStatus { command: String, status: ExitStatus },

    #[error("{0}")]
    UnsupportedTarget(String),

    #[error("{0}")]
    Toolchain(String),

    #[error("building variant {env_var}={tier}: {reason}")]
    VariantBuild {
        env_var: &'static str,
        tier: String,
        reason: String,
    },

    #[error("variant {}: {reason}", path.display())]
    InvalidVariant { path: PathBuf, reason: String },

    #[error("parsing ELF: {0}")]
    Elf(#[from] goblin::error::Error),

    #[error("launcher template: {0}")]
    TemplateRegistration(#[from] handlebars::TemplateError),

    #[error("launcher template: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("{stage}: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Pipeline stage the error was raised in, if known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether the Go target environment was rejected.
    pub fn is_unsupported_target(&self) -> bool {
        match self {
            Self::UnsupportedTarget(_) => true,
            Self::Stage { source, .. } => source.is_unsupported_target(),
            _ => false,
        }
    }
}

/// Attaches an operation and a path to I/O errors.
pub trait ErrorExt<T> {
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, io::Error> {
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.as_ref().to_path_buf(),
            error,
        })
    }
}

/// Turns `None` into an [`Error::GenericError`].
pub trait Context<T> {
    fn context<C: Display>(self, context: C) -> Result<T>;
}

impl<T> Context<T> for Option<T> {
    fn context<C: Display>(self, context: C) -> Result<T> {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }
}

/// Returns early with an [`Error::GenericError`] built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_context_names_the_path() {
        let result: io::Result<()> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = result
            .fs_context("reading variant", Path::new("/tmp/work/app.v3"))
            .unwrap_err();
        assert_eq!(err.to_string(), "reading variant /tmp/work/app.v3: gone");
    }

    #[test]
    fn option_context() {
        let err = None::<u8>.context("output path is required").unwrap_err();
        assert_eq!(err.to_string(), "output path is required");
    }

    fn bails(flag: bool) -> Result<u8> {
        if flag {
            crate::bail!("tier {} has no blob", "v2");
        }
        Ok(1)
    }

    #[test]
    fn bail_formats() {
        assert_eq!(bails(true).unwrap_err().to_string(), "tier v2 has no blob");
        assert_eq!(bails(false).unwrap(), 1);
    }
}
