//! Packaging time: building, encoding and embedding tier variants.
//!
//! Only compiled with the `bundler` feature. Generated launchers depend on this
//! crate without it and never link any of this.
//!
//! # Module Organization
//!
//! - [`builder`] - the packaging pipeline and its [`Packager`]
//! - [`error`] - [`Error`], [`ErrorExt`](error::ErrorExt) and the `bail!` macro
//! - [`launcher`] - launcher crate generation and compilation
//! - [`settings`] - [`Settings`] and Go target checks
//! - [`utils`] - file system helpers

pub mod builder;
pub mod error;
pub mod launcher;
pub mod settings;
pub mod utils;

pub use builder::{PackagedLauncher, Packager, Stage};
pub use error::{Error, Result};
pub use settings::{Settings, SettingsBuilder, check_target};
