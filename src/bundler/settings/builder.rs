//! Builder for constructing Settings.

use super::Settings;
use crate::bundler::error::{Context, ErrorExt, Result};
use crate::payload::CompressionKind;
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};

/// Builder for constructing [`Settings`].
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    output: Option<PathBuf>,
    go_args: Vec<String>,
    jobs: Option<usize>,
    compression: Option<CompressionKind>,
    go: Option<PathBuf>,
    cargo: Option<PathBuf>,
    runtime_path: Option<PathBuf>,
    current_dir: Option<PathBuf>,
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the launcher output path.
    ///
    /// Relative paths are resolved against the current directory. Default: the
    /// base name of the current directory.
    pub fn output<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the arguments forwarded to `go build`.
    pub fn go_args(mut self, args: Vec<String>) -> Self {
        self.go_args = args;
        self
    }

    /// Sets the build concurrency cap.
    ///
    /// Default: the number of CPUs. Zero also means the default.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Default: [`CompressionKind::ZstdDict`]
    pub fn compression(mut self, compression: CompressionKind) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn go<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.go = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn cargo<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.cargo = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn runtime_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.runtime_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Overrides the directory relative paths are resolved against.
    pub fn current_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.current_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Fails if the current directory cannot be determined or has no base name
    /// to default the output to.
    pub fn build(self) -> Result<Settings> {
        let current_dir = match self.current_dir {
            Some(dir) => dir,
            None => std::env::current_dir().fs_context("getting", ".")?,
        };

        let output = match self.output {
            Some(output) => output,
            None => current_dir
                .file_name()
                .map(PathBuf::from)
                .context("cannot derive an output name from the current directory")?,
        };
        let output = output
            .absolutize_from(&current_dir)
            .fs_context("resolving output path", &output)?
            .into_owned();

        let runtime_path = match self.runtime_path {
            Some(path) => Some(
                path.absolutize_from(&current_dir)
                    .fs_context("resolving runtime path", &path)?
                    .into_owned(),
            ),
            None => None,
        };

        let jobs = match self.jobs {
            Some(jobs) if jobs > 0 => jobs,
            _ => num_cpus::get(),
        };

        Ok(Settings::new(
            output,
            self.go_args,
            jobs,
            self.compression.unwrap_or(CompressionKind::ZstdDict),
            self.go,
            self.cargo,
            runtime_path,
        ))
    }
}
