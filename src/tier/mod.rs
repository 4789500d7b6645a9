//! CPU capability tiers.
//!
//! A tier is one microarchitecture level of a CPU family. Each family is its own
//! type with its own closed set of keys and its own canonicalization rule:
//!
//! - [`Amd64Tier`] - the four `GOAMD64` levels (`v1`..`v4`)
//! - [`Arm64Tier`] - the `GOARM64` levels (`v8.0`..`v9.5`) with the optional
//!   `crypto` and `lse` sub-features
//!
//! Both implement [`Tier`], which is all the run-time launcher and the packaging
//! pipeline need to know about a family.

mod amd64;
mod arm64;

pub use amd64::Amd64Tier;
pub use arm64::{Arm64Level, Arm64Tier};

use std::fmt::{Debug, Display};

/// One CPU capability level within a family.
///
/// `Display` renders the canonical key, which is also the value the Go toolchain
/// accepts in [`Tier::ENV_VAR`] and the key under which the payload is embedded.
pub trait Tier: Copy + Eq + Debug + Display + Send + Sync + Sized + 'static {
    /// Environment variable the Go toolchain reads for this family.
    ///
    /// The launcher honors the same variable as a run-time override.
    const ENV_VAR: &'static str;

    /// `GOARCH` value of this family.
    const GOARCH: &'static str;

    /// Rust path of the implementing type, used by the launcher generator.
    const TYPE_PATH: &'static str;

    /// ELF `e_machine` of binaries built for this family.
    const ELF_MACHINE: u16;

    /// The self-contained tier every host supports.
    fn baseline() -> Self;

    /// Every tier of the family in ascending order.
    fn all() -> Vec<Self>;

    /// Parses a key, canonicalizing equivalent spellings.
    ///
    /// Returns `None` for anything outside the family's closed set.
    fn parse(key: &str) -> Option<Self>;

    /// Host features this tier needs, in `std::arch` detection names.
    ///
    /// `None` means the tier cannot be confirmed by probing the hardware and is
    /// only reachable through the override.
    fn requirements(&self) -> Option<Vec<&'static str>>;

    /// Canonical key (same as `to_string()`).
    fn key(&self) -> String {
        self.to_string()
    }

    /// File-name-safe form of the key.
    fn file_stem(&self) -> String {
        self.key().replace(',', "_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn keys_roundtrip<T: Tier>() {
        for tier in T::all() {
            assert_eq!(T::parse(&tier.key()), Some(tier), "{tier}");
        }
    }

    fn keys_unique<T: Tier>() {
        let keys: HashSet<String> = T::all().iter().map(Tier::key).collect();
        assert_eq!(keys.len(), T::all().len());
        let stems: HashSet<String> = T::all().iter().map(Tier::file_stem).collect();
        assert_eq!(stems.len(), T::all().len());
    }

    #[test]
    fn every_key_parses_back_to_its_tier() {
        keys_roundtrip::<Amd64Tier>();
        keys_roundtrip::<Arm64Tier>();
    }

    #[test]
    fn keys_and_file_stems_are_unique() {
        keys_unique::<Amd64Tier>();
        keys_unique::<Arm64Tier>();
    }

    #[test]
    fn baseline_is_first_and_needs_nothing() {
        assert_eq!(Amd64Tier::all()[0], Amd64Tier::baseline());
        assert_eq!(Arm64Tier::all()[0], Arm64Tier::baseline());
        assert_eq!(Amd64Tier::baseline().requirements(), Some(vec![]));
        assert_eq!(Arm64Tier::baseline().requirements(), Some(vec![]));
    }
}
