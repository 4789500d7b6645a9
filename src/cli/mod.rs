//! Command line interface of the packaging tool.

mod args;

pub use args::{Args, split_output_flag};

use crate::bundler::{PackagedLauncher, Packager, check_target};
use crate::error::Result;
use crate::tier::{Amd64Tier, Tier};

/// Main CLI entry point
///
/// Returns the process exit code on success. Errors carry their own exit code,
/// see [`BundlerError::exit_code`](crate::error::BundlerError::exit_code).
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();

    let target = check_target::<Amd64Tier, _>(|name| std::env::var(name).ok())?;
    log::debug!("Target: GOOS={} GOARCH={}", target.goos, target.goarch);

    let settings = args.into_settings()?;
    let launcher = Packager::new(settings).package::<Amd64Tier>().await?;
    print_report(&launcher);
    Ok(0)
}

fn print_report(launcher: &PackagedLauncher) {
    println!(
        "Created {} ({} bytes)",
        launcher.path.display(),
        launcher.size
    );
    println!("SHA256: {}", launcher.checksum);
    for payload in &launcher.payloads {
        println!(
            "  {}={:<4} {:<9} {:>10} -> {:>10} bytes",
            Amd64Tier::ENV_VAR,
            payload.key,
            payload.compression.to_string(),
            payload.size,
            payload.stored_size
        );
    }
}
