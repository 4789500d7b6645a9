//! Packaging pipeline.
//!
//! The [`Packager`] turns a Go package into a single launcher binary:
//!
//! 1. Locates `go` and `cargo` and checks the Go version
//! 2. Builds one variant per tier, in parallel
//! 3. Validates each variant as an ELF executable and encodes it
//! 4. Generates and compiles the launcher crate embedding the payloads
//! 5. Installs the launcher atomically and reports its checksum
//!
//! # Module Organization
//!
//! - [`checksum`] - SHA256 checksum of the installed launcher
//! - [`encode`] - variant validation and payload encoding
//! - [`orchestrator`] - the [`Packager`] and its [`Stage`]s
//! - [`tool_detection`] - toolchain lookup and version checks
//! - [`variants`] - parallel `go build` per tier

pub mod checksum;
pub mod encode;
pub mod orchestrator;
pub mod tool_detection;
pub mod variants;

pub use encode::PayloadBlob;
pub use orchestrator::{PackagedLauncher, Packager, PayloadReport, Stage};
pub use tool_detection::Toolchain;
pub use variants::Variant;
