//! Run-time side of a packaged launcher.
//!
//! A generated launcher calls [`launch`] with its embedded payload table. From
//! there the path is strictly linear and single-threaded:
//!
//! 1. [`detect`] - pick a tier from the override variable or the host CPU
//! 2. [`select`] - find that tier's stored payload
//! 3. [`decode_payload`](crate::payload::decode_payload) - rebuild the exact image
//! 4. [`replace_process`] - exec the image from an anonymous memfd
//!
//! Every step either advances or ends the process. There is no retry and no
//! fallback to another tier.

mod detect;
mod error;
mod launcher;
mod replace;
mod select;

pub use detect::{HostFeatures, Selection, SelectionSource, best_supported, detect};
pub use error::LaunchError;
pub use launcher::{DEBUG_VAR, DebugMode, FATAL_EXIT_CODE, LOG_VAR, Launcher, Prepared, launch};
pub use replace::replace_process;
pub use select::select;

// Re-exported so generated launchers only need this module.
pub use crate::payload::{CompressionKind, EmbeddedPayloads, StoredPayload};
