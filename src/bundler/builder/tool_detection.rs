//! External tool detection and version checking.
//!
//! The packager drives two toolchains: `go` builds the tier variants and `cargo`
//! builds the launcher that embeds them.

use crate::bundler::{
    Settings,
    error::{Error, Result},
};
use regex::Regex;
use semver::Version;
use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

/// First Go release that understands `GOAMD64`.
pub const MIN_GO_VERSION: Version = Version::new(1, 18, 0);

static GO_VERSION_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^go version go([0-9]+)\.([0-9]+)(?:\.([0-9]+))?").ok());

/// Located toolchains.
#[derive(Clone, Debug)]
pub struct Toolchain {
    pub go: PathBuf,
    pub go_version: Version,
    pub cargo: PathBuf,
}

/// Finds `go` and `cargo` and checks the Go version.
///
/// # Errors
///
/// [`Error::Toolchain`] if a tool is missing, `go version` fails or prints
/// something unexpected, or Go is older than [`MIN_GO_VERSION`].
pub async fn detect_toolchain(settings: &Settings) -> Result<Toolchain> {
    let go = locate("go", settings.go())?;
    let go_version = go_version(&go).await?;
    if go_version < MIN_GO_VERSION {
        return Err(Error::Toolchain(format!(
            "installed go version too old: {go_version} (need at least {MIN_GO_VERSION})"
        )));
    }
    log::info!("✓ go {} at {}", go_version, go.display());

    let cargo = locate("cargo", settings.cargo())?;
    log::debug!("Found cargo at: {}", cargo.display());

    Ok(Toolchain {
        go,
        go_version,
        cargo,
    })
}

/// Resolves `name` through `PATH` unless an explicit path is configured.
pub fn locate(name: &str, explicit: Option<&Path>) -> Result<PathBuf> {
    let program = explicit.map_or_else(|| PathBuf::from(name), Path::to_path_buf);
    which::which(&program).map_err(|e| {
        Error::Toolchain(format!("{name} not found ({}): {e}", program.display()))
    })
}

async fn go_version(go: &Path) -> Result<Version> {
    let output = tokio::process::Command::new(go)
        .arg("version")
        .output()
        .await
        .map_err(|error| Error::CommandFailed {
            command: "go version".to_string(),
            error,
        })?;

    if !output.status.success() {
        return Err(Error::Toolchain(format!(
            "fetching go version: go version exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_go_version(&stdout).ok_or_else(|| {
        Error::Toolchain(format!("parsing go version: malformed: {:?}", stdout.trim()))
    })
}

/// Parses `go version` output into a three-part version.
///
/// `go1.21` is read as 1.21.0; pre-release suffixes such as `rc2` are ignored.
pub fn parse_go_version(output: &str) -> Option<Version> {
    let caps = GO_VERSION_RE.as_ref()?.captures(output)?;
    let part = |i: usize| caps.get(i).map_or(Some(0), |m| m.as_str().parse().ok());
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_release_versions() {
        assert_eq!(
            parse_go_version("go version go1.22.3 linux/amd64\n"),
            Some(Version::new(1, 22, 3))
        );
        assert_eq!(
            parse_go_version("go version go1.21 linux/amd64"),
            Some(Version::new(1, 21, 0))
        );
        assert_eq!(
            parse_go_version("go version go1.23rc2 linux/amd64"),
            Some(Version::new(1, 23, 0))
        );
    }

    #[test]
    fn rejects_malformed_output() {
        assert_eq!(parse_go_version("go version devel +abc linux/amd64"), None);
        assert_eq!(parse_go_version("gccgo (GCC) 13.2.0"), None);
        assert_eq!(parse_go_version(""), None);
    }

    #[test]
    fn minimum_version_comparison() {
        assert!(parse_go_version("go version go1.17.13 linux/amd64").unwrap() < MIN_GO_VERSION);
        assert!(parse_go_version("go version go1.18 linux/amd64").unwrap() >= MIN_GO_VERSION);
        assert!(parse_go_version("go version go1.100.0 linux/amd64").unwrap() > MIN_GO_VERSION);
    }

    #[test]
    fn missing_tool_is_a_toolchain_error() {
        let err = locate("go", Some(Path::new("/nonexistent/bin/go"))).unwrap_err();
        assert!(matches!(err, Error::Toolchain(_)));
    }
}
