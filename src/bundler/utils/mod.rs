//! Shared packaging utilities.

pub mod fs;
