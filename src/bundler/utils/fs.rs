//! File system utilities for packaging.
//!
//! Provides file operations with automatic directory creation and an atomic
//! install step for the final artifact.

use crate::bail;
use crate::bundler::error::{ErrorExt, Result};
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::fs;

/// Copies a regular file from one path to another, creating any parent
/// directories of the destination path as necessary.
///
/// Fails if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        bail!("{from:?} does not exist");
    }
    if !from.is_file() {
        bail!("{from:?} is not a file");
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir)
            .await
            .fs_context("creating directory", dest_dir)?;
    }
    fs::copy(from, to).await.fs_context("copying to", to)?;
    Ok(())
}

/// Removes a file, treating a missing file as success.
pub async fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()), // Idempotent
        Err(e) => Err::<(), _>(e).fs_context("removing", path),
    }
}

/// Installs an executable at `to` without ever exposing a partial file there.
///
/// The file is copied to `<to>.tmp`, made executable (0755) and renamed into
/// place. On failure the temporary file is removed and `to` is untouched.
pub async fn install_executable(from: &Path, to: &Path) -> Result<()> {
    let staging = staging_path(to);
    let result = stage_and_rename(from, &staging, to).await;
    if result.is_err() {
        if let Err(e) = remove_file_if_exists(&staging).await {
            log::warn!("failed to clean up {}: {}", staging.display(), e);
        }
    }
    result
}

async fn stage_and_rename(from: &Path, staging: &Path, to: &Path) -> Result<()> {
    copy_file(from, staging).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(staging, std::fs::Permissions::from_mode(0o755))
            .await
            .fs_context("setting permissions on", staging)?;
    }

    fs::rename(staging, to).await.fs_context("renaming into", to)
}

fn staging_path(to: &Path) -> PathBuf {
    let mut name = to.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
