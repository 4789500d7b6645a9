//! Self-selecting microarchitecture launchers for Go programs.
//!
//! A launcher embeds one build of a program per CPU tier (`GOAMD64=v1..v4`). At
//! start-up it detects the host's tier, decodes the matching payload into an
//! anonymous memory file and replaces itself with it via `execveat`.
//!
//! The crate has two halves:
//! - run time ([`tier`], [`payload`], [`runtime`]), linked into every launcher;
//! - packaging time (`bundler`, `cli`, `error`), behind the `bundler` feature.

pub mod payload;
pub mod runtime;
pub mod tier;

#[cfg(feature = "bundler")]
pub mod bundler;
#[cfg(feature = "bundler")]
pub mod cli;
#[cfg(feature = "bundler")]
pub mod error;

// Re-export commonly used types
#[cfg(feature = "bundler")]
pub use error::{BundlerError, CliError, Result};
