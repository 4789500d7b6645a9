//! Core Settings struct.

use crate::payload::CompressionKind;
use std::path::{Path, PathBuf};

/// Settings for one packaging run, constructed via [`SettingsBuilder`].
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_microarch::bundler::SettingsBuilder;
/// use kodegen_bundler_microarch::payload::CompressionKind;
///
/// # fn example() -> kodegen_bundler_microarch::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .output("dist/server")
///     .go_args(vec!["-trimpath".into(), "./cmd/server".into()])
///     .compression(CompressionKind::ZstdDict)
///     .build()?;
/// assert!(settings.output().is_absolute());
/// # Ok(())
/// # }
/// ```
///
/// [`SettingsBuilder`]: super::SettingsBuilder
#[derive(Clone, Debug)]
pub struct Settings {
    /// Absolute path of the launcher artifact.
    output: PathBuf,

    /// Arguments forwarded verbatim to every `go build`.
    go_args: Vec<String>,

    /// Maximum number of concurrent variant builds.
    jobs: usize,

    compression: CompressionKind,

    /// Explicit `go` binary; `None` searches `PATH`.
    go: Option<PathBuf>,

    /// Explicit `cargo` binary; `None` searches `PATH`.
    cargo: Option<PathBuf>,

    /// Local checkout of this crate for the generated launcher's dependency.
    ///
    /// `None` pins the published version instead.
    runtime_path: Option<PathBuf>,
}

impl Settings {
    /// Returns the absolute output path.
    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn go_args(&self) -> &[String] {
        &self.go_args
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    pub fn compression(&self) -> CompressionKind {
        self.compression
    }

    pub fn go(&self) -> Option<&Path> {
        self.go.as_deref()
    }

    pub fn cargo(&self) -> Option<&Path> {
        self.cargo.as_deref()
    }

    pub fn runtime_path(&self) -> Option<&Path> {
        self.runtime_path.as_deref()
    }

    /// Base name of the output, used to name variant binaries.
    pub fn output_name(&self) -> String {
        self.output
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "launcher".to_string())
    }

    /// Creates a new Settings instance (used by SettingsBuilder).
    pub(super) fn new(
        output: PathBuf,
        go_args: Vec<String>,
        jobs: usize,
        compression: CompressionKind,
        go: Option<PathBuf>,
        cargo: Option<PathBuf>,
        runtime_path: Option<PathBuf>,
    ) -> Self {
        Self {
            output,
            go_args,
            jobs,
            compression,
            go,
            cargo,
            runtime_path,
        }
    }
}
