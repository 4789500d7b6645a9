//! Launcher crate templates.

/// `Cargo.toml` of the generated launcher crate.
///
/// The empty `[workspace]` table keeps cargo from attaching the crate to any
/// workspace the work directory happens to live in.
pub const CARGO_TOML_TEMPLATE: &str = r#"# Generated by {{generator}} {{generator_version}}. Do not edit.
[package]
name = "{{package_name}}"
version = "0.0.0"
edition = "2024"
publish = false

[[bin]]
name = "{{bin_name}}"
path = "src/main.rs"

[workspace]

[dependencies]
{{generator}} = { {{{runtime_source}}}, default-features = false }

[profile.release]
opt-level = 3
lto = true
codegen-units = 1
panic = "abort"
strip = true
"#;

/// `src/main.rs` of the generated launcher crate.
pub const MAIN_RS_TEMPLATE: &str = r#"// Generated by {{generator}} {{generator_version}}. Do not edit.

use {{generator}}::runtime::{self, CompressionKind, EmbeddedPayloads, StoredPayload};

static PAYLOADS: [StoredPayload<'static>; {{payload_count}}] = [
{{#each payloads}}
    StoredPayload::new(
        "{{key}}",
        CompressionKind::{{compression}},
        {{size}},
        "{{digest}}",
        include_bytes!("../payloads/{{file_name}}"),
    ),
{{/each}}
];

fn main() {
    runtime::launch::<{{tier_type}}>(&EmbeddedPayloads::new(&PAYLOADS))
}
"#;

/// `Cargo.toml` of the run-time crate written next to the launcher.
///
/// Mirrors the non-optional dependencies of this crate. The `bundler` feature
/// exists only so the gated modules in `lib.rs` stay out of the build.
pub const RUNTIME_CARGO_TOML_TEMPLATE: &str = r#"# Generated by {{generator}} {{generator_version}}. Do not edit.
[package]
name = "{{generator}}"
version = "{{generator_version}}"
edition = "2024"
publish = false

[lib]
path = "src/lib.rs"

[workspace]

[features]
default = []
bundler = []

[dependencies]
thiserror = "2"
log = "0.4"
env_logger = "0.11"
flate2 = "1"
zstd = "0.13"
sha2 = "0.10"
hex = "0.4"

[target.'cfg(unix)'.dependencies]
nix = { version = "0.30", features = ["fs", "process"] }
"#;
