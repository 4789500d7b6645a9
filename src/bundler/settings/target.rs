//! Go target environment checks.
//!
//! The packager only produces launchers for one OS/architecture pair, and it
//! owns the tier variable itself. Anything else in `GOOS`, `GOARCH` or the tier
//! variable is rejected before a single build starts.

use crate::bundler::error::{Error, Result};
use crate::tier::Tier;

/// The only `GOOS` a launcher can run on (memfd + execveat).
pub const SUPPORTED_GOOS: &str = "linux";

/// Resolved Go target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub goos: String,
    pub goarch: String,
}

/// Validates the Go target for tier family `T`.
///
/// `lookup` reads an environment variable; empty values count as unset.
/// `GOOS` and `GOARCH` default to the host, like the Go toolchain does.
///
/// # Errors
///
/// [`Error::UnsupportedTarget`] naming the offending variable.
pub fn check_target<T, F>(lookup: F) -> Result<Target>
where
    T: Tier,
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|value| !value.is_empty());

    let goos = var("GOOS").unwrap_or_else(|| go_os_name(std::env::consts::OS).to_string());
    if goos != SUPPORTED_GOOS {
        return Err(Error::UnsupportedTarget(format!(
            "GOOS={goos:?} is not supported (only {SUPPORTED_GOOS})"
        )));
    }

    let goarch = var("GOARCH").unwrap_or_else(|| go_arch_name(std::env::consts::ARCH).to_string());
    if goarch != T::GOARCH {
        return Err(Error::UnsupportedTarget(format!(
            "GOARCH={goarch:?} is not supported (only {})",
            T::GOARCH
        )));
    }

    if let Some(value) = var(T::ENV_VAR) {
        return Err(Error::UnsupportedTarget(format!(
            "{} must not be set (currently {value:?})",
            T::ENV_VAR
        )));
    }

    Ok(Target { goos, goarch })
}

/// Maps a Rust `target_os` name to its `GOOS` spelling.
pub fn go_os_name(rust_os: &str) -> &str {
    match rust_os {
        "macos" => "darwin",
        other => other,
    }
}

/// Maps a Rust `target_arch` name to its `GOARCH` spelling.
pub fn go_arch_name(rust_arch: &str) -> &str {
    match rust_arch {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        "loongarch64" => "loong64",
        other => other,
    }
}
