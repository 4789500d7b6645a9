//! Launcher build execution.
//!
//! Compiles the generated crate with `cargo build --release`.

use super::generate::LAUNCHER_BIN;
use crate::bundler::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Runs cargo on the generated manifest.
///
/// Cargo's own output goes straight to the terminal.
///
/// # Arguments
/// - `cargo` - Path to the cargo binary
/// - `manifest` - Generated `Cargo.toml`
/// - `target_dir` - Cargo target directory, kept inside the work directory
///
/// # Returns
/// Path to the built launcher binary
pub async fn run_cargo_build(cargo: &Path, manifest: &Path, target_dir: &Path) -> Result<PathBuf> {
    log::info!("Running cargo build for the launcher...");

    let status = tokio::process::Command::new(cargo)
        .arg("build")
        .arg("--release")
        .arg("--manifest-path")
        .arg(manifest)
        .arg("--target-dir")
        .arg(target_dir)
        // Settings meant for the caller's own build must not leak in.
        .env_remove("CARGO_TARGET_DIR")
        .env_remove("CARGO_BUILD_TARGET")
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|error| Error::CommandFailed {
            command: "cargo build".to_string(),
            error,
        })?;

    if !status.success() {
        return Err(Error::CommandStatus {
            command: "cargo build".to_string(),
            status,
        });
    }

    let binary = target_dir.join("release").join(LAUNCHER_BIN);
    if !tokio::fs::try_exists(&binary).await.unwrap_or(false) {
        return Err(Error::GenericError(format!(
            "cargo build succeeded but {} is missing",
            binary.display()
        )));
    }

    Ok(binary)
}
