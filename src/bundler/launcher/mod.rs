//! Launcher crate generation and compilation.
//!
//! The final artifact is a small Rust program that embeds every tier's payload
//! and links the run-time half of this crate.
//!
//! # Module Organization
//!
//! - `template` - `Cargo.toml` and `main.rs` templates
//! - `generate` - renders and writes the crate sources
//! - `runtime` - embedded run-time crate the launcher links against
//! - `build` - `cargo build --release` execution

mod build;
mod generate;
mod runtime;
mod template;

pub use build::run_cargo_build;
pub use generate::{
    LAUNCHER_BIN, LAUNCHER_PACKAGE, LauncherSources, RUNTIME_CRATE, RUNTIME_VERSION,
    render_sources, write_sources,
};
pub use runtime::{RUNTIME_SOURCES, render_runtime_manifest, write_runtime_crate};

use crate::bundler::builder::PayloadBlob;
use crate::bundler::error::Result;
use crate::tier::Tier;
use std::path::{Path, PathBuf};

/// Generates the launcher crate in `crate_dir` and builds it.
///
/// # Process
///
/// 1. Render `Cargo.toml` and `src/main.rs` for `blobs`, depending on the
///    run-time crate at `runtime_path`
/// 2. Write them next to the `payloads/` directory
/// 3. Run `cargo build --release` with its target directory in `target_dir`
///
/// # Returns
///
/// Path to the compiled launcher binary
pub async fn build_launcher<T: Tier>(
    cargo: &Path,
    crate_dir: &Path,
    target_dir: &Path,
    blobs: &[PayloadBlob<T>],
    runtime_path: &Path,
) -> Result<PathBuf> {
    let sources = render_sources(blobs, runtime_path)?;
    let manifest = write_sources(crate_dir, &sources).await?;
    log::debug!("Generated launcher crate at {}", crate_dir.display());

    run_cargo_build(cargo, &manifest, target_dir).await
}
