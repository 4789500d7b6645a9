//! Launcher crate generation.
//!
//! Renders the crate's `Cargo.toml` and `src/main.rs` from the templates with
//! handlebars. The payload blobs are expected in `<crate>/payloads/` already.

use super::template::{CARGO_TOML_TEMPLATE, MAIN_RS_TEMPLATE};
use crate::bundler::builder::PayloadBlob;
use crate::bail;
use crate::bundler::error::{ErrorExt, Result};
use crate::tier::Tier;
use handlebars::Handlebars;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Name of this crate as the generated launcher depends on it.
pub const RUNTIME_CRATE: &str = env!("CARGO_PKG_NAME");

/// Version stamped into generated manifests.
pub const RUNTIME_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const LAUNCHER_PACKAGE: &str = "microarch-launcher";
pub const LAUNCHER_BIN: &str = "launcher";

#[derive(Serialize)]
struct CargoData<'a> {
    generator: &'a str,
    generator_version: &'a str,
    package_name: &'a str,
    bin_name: &'a str,
    runtime_source: String,
}

#[derive(Serialize)]
struct MainData<'a> {
    generator: &'a str,
    generator_version: &'a str,
    payload_count: usize,
    payloads: Vec<PayloadData>,
    tier_type: &'a str,
}

#[derive(Serialize)]
struct PayloadData {
    key: String,
    compression: &'static str,
    size: u64,
    digest: String,
    file_name: String,
}

/// Rendered launcher crate sources.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LauncherSources {
    pub cargo_toml: String,
    pub main_rs: String,
}

/// Renders the launcher crate for `blobs`, linking the run-time crate at
/// `runtime_path`.
///
/// # Errors
///
/// Fails if a tier of `T` has no blob, since the launcher must be able to run
/// whatever tier it selects.
pub fn render_sources<T: Tier>(
    blobs: &[PayloadBlob<T>],
    runtime_path: &Path,
) -> Result<LauncherSources> {
    let missing: Vec<String> = T::all()
        .iter()
        .filter(|tier| !blobs.iter().any(|blob| blob.tier == **tier))
        .map(Tier::key)
        .collect();
    if !missing.is_empty() {
        bail!("no payload for {} tier(s): {}", T::ENV_VAR, missing.join(", "));
    }

    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(true);
    handlebars.register_template_string("Cargo.toml", CARGO_TOML_TEMPLATE)?;
    handlebars.register_template_string("main.rs", MAIN_RS_TEMPLATE)?;

    let runtime_source = format!("path = {}", toml_string(&runtime_path.display().to_string()));
    let cargo_toml = handlebars.render(
        "Cargo.toml",
        &CargoData {
            generator: RUNTIME_CRATE,
            generator_version: RUNTIME_VERSION,
            package_name: LAUNCHER_PACKAGE,
            bin_name: LAUNCHER_BIN,
            runtime_source,
        },
    )?;

    let payloads: Vec<PayloadData> = blobs
        .iter()
        .map(|blob| PayloadData {
            key: blob.tier.key(),
            compression: blob.compression.variant_name(),
            size: blob.size,
            digest: blob.digest.clone(),
            file_name: blob.file_name(),
        })
        .collect();
    let main_rs = handlebars.render(
        "main.rs",
        &MainData {
            generator: RUNTIME_CRATE,
            generator_version: RUNTIME_VERSION,
            payload_count: payloads.len(),
            payloads,
            tier_type: T::TYPE_PATH,
        },
    )?;

    Ok(LauncherSources {
        cargo_toml,
        main_rs,
    })
}

/// Writes the rendered sources into `crate_dir`.
///
/// # Returns
///
/// Path to the generated `Cargo.toml`
pub async fn write_sources(crate_dir: &Path, sources: &LauncherSources) -> Result<PathBuf> {
    let src_dir = crate_dir.join("src");
    tokio::fs::create_dir_all(&src_dir)
        .await
        .fs_context("creating launcher source directory", &src_dir)?;

    let manifest = crate_dir.join("Cargo.toml");
    tokio::fs::write(&manifest, &sources.cargo_toml)
        .await
        .fs_context("writing launcher manifest", &manifest)?;

    let main_rs = src_dir.join("main.rs");
    tokio::fs::write(&main_rs, &sources.main_rs)
        .await
        .fs_context("writing launcher main.rs", &main_rs)?;

    Ok(manifest)
}

/// Quotes `value` as a TOML basic string.
fn toml_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            c if c.is_control() => quoted.push_str(&format!("\\u{:04X}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
