//! Command line argument parsing.
//!
//! Everything that is not a `--microarch-*` option is handed to `go build`,
//! except `-o`, which names the launcher instead of a single variant.

use crate::bundler::{Settings, SettingsBuilder};
use crate::error::{CliError, Result};
use crate::payload::CompressionKind;
use clap::Parser;
use std::path::PathBuf;

/// Builds every GOAMD64 level of a Go program into one self-selecting launcher
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_bundler_microarch",
    version,
    disable_version_flag = true,
    about = "Builds every GOAMD64 level of a Go program into one self-selecting launcher",
    long_about = "Builds every GOAMD64 level of a Go program into one self-selecting launcher.

Arguments are passed to `go build`. `-o <path>` names the launcher.

Usage:
  kodegen_bundler_microarch -o ./server ./cmd/server
  kodegen_bundler_microarch -trimpath -ldflags=-s -o=dist/app .

At run time the launcher picks the best variant for the CPU. Set GOAMD64 to force
one, MICROARCHDEBUG=log to trace the choice, MICROARCHDEBUG=extract to dump it.

Exit code 0 = launcher written, 1 = unsupported GOOS/GOARCH/GOAMD64, 2 = build failure."
)]
pub struct Args {
    /// Maximum number of concurrent variant builds (0 = number of CPUs)
    #[arg(long, env = "MICROARCH_PARALLEL_BUILD", value_name = "N")]
    pub microarch_jobs: Option<usize>,

    /// Payload compression: none, gzip, zstd, zstd-dict
    #[arg(
        long,
        env = "MICROARCH_COMPRESSION",
        value_name = "KIND",
        default_value = "zstd-dict"
    )]
    pub microarch_compression: CompressionKind,

    /// Go toolchain to build with (default: `go` on PATH)
    #[arg(long, env = "MICROARCH_GO", value_name = "PATH")]
    pub microarch_go: Option<PathBuf>,

    /// Cargo used to compile the launcher (default: `cargo` on PATH)
    #[arg(long, env = "CARGO", value_name = "PATH")]
    pub microarch_cargo: Option<PathBuf>,

    /// Local checkout of this crate for the launcher to depend on (default: the
    /// copy embedded in this binary)
    #[arg(long, env = "MICROARCH_RUNTIME_PATH", value_name = "PATH")]
    pub microarch_runtime_path: Option<PathBuf>,

    /// `go build` flags and packages
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "GO_BUILD_ARGS"
    )]
    pub go_args: Vec<String>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Converts the arguments into packaging [`Settings`].
    pub fn into_settings(self) -> Result<Settings> {
        let (output, go_args) = split_output_flag(self.go_args)?;

        let mut builder = SettingsBuilder::new()
            .go_args(go_args)
            .compression(self.microarch_compression);
        if let Some(output) = output {
            builder = builder.output(output);
        }
        if let Some(jobs) = self.microarch_jobs {
            builder = builder.jobs(jobs);
        }
        if let Some(go) = self.microarch_go {
            builder = builder.go(go);
        }
        if let Some(cargo) = self.microarch_cargo {
            builder = builder.cargo(cargo);
        }
        if let Some(path) = self.microarch_runtime_path {
            builder = builder.runtime_path(path);
        }
        Ok(builder.build()?)
    }
}

/// Removes the `-o` flag from `go build` arguments and returns its value.
///
/// Accepts `-o <path>`, `-o=<path>` and the `--o` spellings the Go flag
/// package allows. The last one wins. Scanning stops at `--`.
pub fn split_output_flag(args: Vec<String>) -> Result<(Option<String>, Vec<String>)> {
    let mut output = None;
    let mut rest = Vec::with_capacity(args.len());
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--" {
            rest.push(arg);
            rest.extend(args.by_ref());
            break;
        }
        match arg.strip_prefix("--").or_else(|| arg.strip_prefix('-')) {
            Some("o") => {
                let value = args.next().ok_or(CliError::MissingValue { flag: arg })?;
                output = Some(value);
            }
            Some(flag) if flag.starts_with("o=") => {
                let value = &flag["o=".len()..];
                if value.is_empty() {
                    return Err(CliError::MissingValue { flag: arg }.into());
                }
                output = Some(value.to_string());
            }
            _ => rest.push(arg),
        }
    }

    Ok((output, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn output_flag_with_separate_value() {
        let (output, rest) =
            split_output_flag(strings(&["-trimpath", "-o", "bin/app", "./cmd/app"])).unwrap();
        assert_eq!(output.as_deref(), Some("bin/app"));
        assert_eq!(rest, ["-trimpath", "./cmd/app"]);
    }

    #[test]
    fn output_flag_with_equals() {
        let (output, rest) = split_output_flag(strings(&["-o=app", "-ldflags=-s -w"])).unwrap();
        assert_eq!(output.as_deref(), Some("app"));
        assert_eq!(rest, ["-ldflags=-s -w"]);

        let (output, _) = split_output_flag(strings(&["--o=first", "-o", "second"])).unwrap();
        assert_eq!(output.as_deref(), Some("second"));
    }

    #[test]
    fn no_output_flag() {
        let (output, rest) = split_output_flag(strings(&["-v", "-only", "."])).unwrap();
        assert_eq!(output, None);
        assert_eq!(rest, ["-v", "-only", "."]);
    }

    #[test]
    fn double_dash_ends_flag_scanning() {
        let (output, rest) = split_output_flag(strings(&[".", "--", "-o", "x"])).unwrap();
        assert_eq!(output, None);
        assert_eq!(rest, [".", "--", "-o", "x"]);
    }

    #[test]
    fn output_flag_without_value() {
        let err = split_output_flag(strings(&["-o"])).unwrap_err();
        assert_eq!(err.to_string(), "missing value for -o");

        let err = split_output_flag(strings(&["-o="])).unwrap_err();
        assert_eq!(err.to_string(), "missing value for -o=");
    }

    #[test]
    fn go_flags_are_not_taken_by_clap() {
        let args = Args::try_parse_from([
            "kodegen_bundler_microarch",
            "--microarch-compression",
            "gzip",
            "--microarch-jobs",
            "3",
            "-trimpath",
            "-o",
            "app",
            "./cmd/app",
        ])
        .unwrap();

        assert_eq!(args.microarch_compression, CompressionKind::Gzip);
        assert_eq!(args.microarch_jobs, Some(3));
        assert_eq!(args.go_args, ["-trimpath", "-o", "app", "./cmd/app"]);
    }

    #[test]
    fn unknown_compression_is_rejected() {
        let err = Args::try_parse_from([
            "kodegen_bundler_microarch",
            "--microarch-compression",
            "lz4",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("unknown compression \"lz4\""));
    }
}
