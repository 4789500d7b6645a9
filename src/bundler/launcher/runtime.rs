//! Embedded copy of the run-time half of this crate.
//!
//! Launchers link the run-time modules through a path dependency on a crate
//! written into the work directory, so packaging needs neither a checkout of
//! this repository nor a registry entry for it.

use super::generate::{RUNTIME_CRATE, RUNTIME_VERSION};
use super::template::RUNTIME_CARGO_TOML_TEMPLATE;
use crate::bundler::error::{ErrorExt, Result};
use handlebars::Handlebars;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Source files of the run-time crate, relative to its root.
pub const RUNTIME_SOURCES: &[(&str, &str)] = &[
    ("src/lib.rs", include_str!("../../lib.rs")),
    ("src/tier/mod.rs", include_str!("../../tier/mod.rs")),
    ("src/tier/amd64.rs", include_str!("../../tier/amd64.rs")),
    ("src/tier/arm64.rs", include_str!("../../tier/arm64.rs")),
    ("src/payload/mod.rs", include_str!("../../payload/mod.rs")),
    ("src/payload/decode.rs", include_str!("../../payload/decode.rs")),
    ("src/payload/encode.rs", include_str!("../../payload/encode.rs")),
    ("src/payload/table.rs", include_str!("../../payload/table.rs")),
    ("src/runtime/mod.rs", include_str!("../../runtime/mod.rs")),
    ("src/runtime/detect.rs", include_str!("../../runtime/detect.rs")),
    ("src/runtime/error.rs", include_str!("../../runtime/error.rs")),
    ("src/runtime/launcher.rs", include_str!("../../runtime/launcher.rs")),
    ("src/runtime/replace.rs", include_str!("../../runtime/replace.rs")),
    ("src/runtime/select.rs", include_str!("../../runtime/select.rs")),
];

#[derive(Serialize)]
struct RuntimeData<'a> {
    generator: &'a str,
    generator_version: &'a str,
}

/// Renders the run-time crate's `Cargo.toml`.
pub fn render_runtime_manifest() -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(true);
    handlebars.register_template_string("Cargo.toml", RUNTIME_CARGO_TOML_TEMPLATE)?;

    Ok(handlebars.render(
        "Cargo.toml",
        &RuntimeData {
            generator: RUNTIME_CRATE,
            generator_version: RUNTIME_VERSION,
        },
    )?)
}

/// Writes the run-time crate into `dir`.
///
/// # Returns
///
/// `dir`, ready to be used as a path dependency
pub async fn write_runtime_crate(dir: &Path) -> Result<PathBuf> {
    let manifest = dir.join("Cargo.toml");
    tokio::fs::create_dir_all(dir)
        .await
        .fs_context("creating runtime crate directory", dir)?;
    tokio::fs::write(&manifest, render_runtime_manifest()?)
        .await
        .fs_context("writing runtime manifest", &manifest)?;

    for (relative, contents) in RUNTIME_SOURCES {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .fs_context("creating runtime source directory", parent)?;
        }
        tokio::fs::write(&path, contents)
            .await
            .fs_context("writing runtime source", &path)?;
    }

    log::debug!(
        "Wrote {} runtime sources to {}",
        RUNTIME_SOURCES.len(),
        dir.display()
    );
    Ok(dir.to_path_buf())
}
