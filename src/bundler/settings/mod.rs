//! Configuration for a packaging run.
//!
//! [`Settings`] holds everything the pipeline needs and is built through
//! [`SettingsBuilder`]. [`check_target`] validates the Go target environment
//! before any work starts.

mod builder;
mod core;
mod target;

pub use builder::SettingsBuilder;
pub use self::core::Settings;
pub use target::{Target, check_target, go_arch_name, go_os_name};
