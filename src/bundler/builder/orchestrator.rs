//! Main packaging orchestration.
//!
//! This module provides the [`Packager`] that runs every stage of turning a Go
//! package into one self-selecting launcher binary.

use super::{
    checksum::calculate_sha256,
    encode::encode_variants,
    tool_detection::{Toolchain, detect_toolchain},
    variants::build_variants,
};
use crate::{
    bundler::{
        Error, Result, Settings,
        error::ErrorExt,
        launcher::{build_launcher, write_runtime_crate},
        utils::fs::install_executable,
    },
    payload::CompressionKind,
    tier::Tier,
};
use std::{fmt, path::PathBuf};

/// Packaging pipeline stages, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    CheckingToolchain,
    PreparingWorkDir,
    BuildingVariants,
    EncodingPayloads,
    BuildingLauncher,
    Installing,
}

impl Stage {
    /// Returns a closure tagging an error with this stage.
    fn wrap(self) -> impl FnOnce(Error) -> Error {
        move |source| Error::Stage {
            stage: self,
            source: Box::new(source),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CheckingToolchain => "checking toolchain",
            Self::PreparingWorkDir => "preparing work directory",
            Self::BuildingVariants => "building variants",
            Self::EncodingPayloads => "encoding payloads",
            Self::BuildingLauncher => "building launcher",
            Self::Installing => "installing launcher",
        })
    }
}

/// Per-tier summary of an embedded payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayloadReport {
    pub key: String,
    pub compression: CompressionKind,
    pub size: u64,
    pub stored_size: u64,
}

/// The installed launcher artifact.
#[derive(Clone, Debug)]
pub struct PackagedLauncher {
    pub path: PathBuf,
    pub size: u64,
    /// Hex SHA-256 of the launcher file
    pub checksum: String,
    pub payloads: Vec<PayloadReport>,
}

/// Main packaging orchestrator.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_microarch::bundler::{Packager, SettingsBuilder};
/// use kodegen_bundler_microarch::tier::Amd64Tier;
///
/// # async fn example() -> kodegen_bundler_microarch::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .output("server")
///     .go_args(vec!["./cmd/server".into()])
///     .build()?;
///
/// let launcher = Packager::new(settings).package::<Amd64Tier>().await?;
/// println!("Created: {} ({} bytes)", launcher.path.display(), launcher.size);
/// println!("SHA256: {}", launcher.checksum);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Packager {
    settings: Settings,
}

impl Packager {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Returns a reference to the packaging settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Locates the toolchains, then runs [`Packager::package_with`].
    pub async fn package<T: Tier>(&self) -> Result<PackagedLauncher> {
        let toolchain = detect_toolchain(&self.settings)
            .await
            .map_err(Stage::CheckingToolchain.wrap())?;
        self.package_with::<T>(&toolchain).await
    }

    /// Runs the pipeline with already located toolchains.
    ///
    /// All intermediate files live in a temporary work directory that is
    /// removed when this returns, successfully or not. The output path is only
    /// ever replaced by a complete launcher.
    pub async fn package_with<T: Tier>(&self, toolchain: &Toolchain) -> Result<PackagedLauncher> {
        let settings = &self.settings;

        let work_dir = tempfile::Builder::new()
            .prefix("microarch")
            .tempdir()
            .fs_context("creating work directory in", std::env::temp_dir())
            .map_err(Stage::PreparingWorkDir.wrap())?;
        let work = work_dir.path();
        log::debug!("Work directory: {}", work.display());

        let variants = build_variants::<T>(
            &toolchain.go,
            settings.go_args(),
            settings.jobs(),
            &settings.output_name(),
            &work.join("variants"),
        )
        .await
        .map_err(Stage::BuildingVariants.wrap())?;

        let crate_dir = work.join("launcher");
        let blobs = encode_variants(&variants, settings.compression(), &crate_dir.join("payloads"))
            .await
            .map_err(Stage::EncodingPayloads.wrap())?;

        let runtime_path = match settings.runtime_path() {
            Some(path) => path.to_path_buf(),
            None => write_runtime_crate(&work.join("runtime"))
                .await
                .map_err(Stage::BuildingLauncher.wrap())?,
        };
        let binary = build_launcher(
            &toolchain.cargo,
            &crate_dir,
            &work.join("target"),
            &blobs,
            &runtime_path,
        )
        .await
        .map_err(Stage::BuildingLauncher.wrap())?;

        install_executable(&binary, settings.output())
            .await
            .map_err(Stage::Installing.wrap())?;

        let size = tokio::fs::metadata(settings.output())
            .await
            .fs_context("reading launcher metadata", settings.output())
            .map_err(Stage::Installing.wrap())?
            .len();
        let checksum = calculate_sha256(settings.output())
            .await
            .map_err(Stage::Installing.wrap())?;

        log::info!(
            "✓ Created launcher: {} ({} bytes, sha256 {})",
            settings.output().display(),
            size,
            checksum
        );

        Ok(PackagedLauncher {
            path: settings.output().to_path_buf(),
            size,
            checksum,
            payloads: blobs
                .iter()
                .map(|blob| PayloadReport {
                    key: blob.tier.key(),
                    compression: blob.compression,
                    size: blob.size,
                    stored_size: blob.stored_size,
                })
                .collect(),
        })
    }
}
