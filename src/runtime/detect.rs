//! Capability detection.
//!
//! Detection is pure and infallible: a missing or malformed override and an
//! unknown CPU all end at the family's baseline tier.

use crate::tier::Tier;
use std::{collections::BTreeSet, fmt};

/// CPU features reported by the host, in `std::arch` detection names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostFeatures {
    features: BTreeSet<&'static str>,
}

impl HostFeatures {
    /// Probes the running CPU.
    ///
    /// Only the features some tier depends on are probed. On architectures
    /// without a tier family the set is empty.
    pub fn probe() -> Self {
        let features: Self = probe_arch().into_iter().collect();
        log::debug!("host features: {:?}", features.features);
        features
    }

    pub fn has(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }

    /// Whether every feature in `requirements` is present.
    pub fn supports(&self, requirements: &[&str]) -> bool {
        requirements.iter().all(|feature| self.has(feature))
    }
}

impl FromIterator<&'static str> for HostFeatures {
    fn from_iter<I: IntoIterator<Item = &'static str>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

#[cfg(target_arch = "x86_64")]
fn probe_arch() -> Vec<&'static str> {
    let mut found = Vec::new();
    macro_rules! probe {
        ($($feature:tt),* $(,)?) => {
            $(
                if std::arch::is_x86_feature_detected!($feature) {
                    found.push($feature);
                }
            )*
        };
    }
    probe!(
        "cmpxchg16b", "popcnt", "sse3", "ssse3", "sse4.1", "sse4.2", "avx", "avx2", "bmi1",
        "bmi2", "f16c", "fma", "lzcnt", "movbe", "xsave", "avx512f", "avx512bw", "avx512cd",
        "avx512dq", "avx512vl",
    );
    found
}

#[cfg(target_arch = "aarch64")]
fn probe_arch() -> Vec<&'static str> {
    let mut found = Vec::new();
    macro_rules! probe {
        ($($feature:tt),* $(,)?) => {
            $(
                if std::arch::is_aarch64_feature_detected!($feature) {
                    found.push($feature);
                }
            )*
        };
    }
    probe!(
        "crc", "lse", "rdm", "dpb", "rcpc", "jsconv", "fcma", "paca", "pacg", "dit", "flagm",
        "lse2", "rcpc2", "sb", "ssbs", "frintts", "bti", "dpb2", "bf16", "i8mm", "sve2", "aes",
        "sha2",
    );
    found
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn probe_arch() -> Vec<&'static str> {
    Vec::new()
}

/// Where a [`Selection`] came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionSource {
    /// The override variable named a known tier
    Override,
    /// No override; chosen from the host features
    Detected,
    /// The override held an unknown value; baseline was used
    UnrecognizedOverride(String),
}

impl fmt::Display for SelectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Override => f.write_str("override"),
            Self::Detected => f.write_str("detected"),
            Self::UnrecognizedOverride(value) => {
                write!(f, "unrecognized override {value:?}, using baseline")
            }
        }
    }
}

/// A chosen tier and how it was chosen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection<T> {
    pub tier: T,
    pub source: SelectionSource,
}

/// Picks the tier to run.
///
/// A recognized `override_value` wins unconditionally, without checking the
/// hardware. An unrecognized one selects the baseline. An unset or empty one
/// defers to [`best_supported`].
pub fn detect<T: Tier>(override_value: Option<&str>, host: &HostFeatures) -> Selection<T> {
    match override_value.filter(|value| !value.is_empty()) {
        Some(value) => match T::parse(value) {
            Some(tier) => Selection {
                tier,
                source: SelectionSource::Override,
            },
            None => Selection {
                tier: T::baseline(),
                source: SelectionSource::UnrecognizedOverride(value.to_string()),
            },
        },
        None => Selection {
            tier: best_supported(host),
            source: SelectionSource::Detected,
        },
    }
}

/// Highest tier of `T` whose requirements the host meets.
pub fn best_supported<T: Tier>(host: &HostFeatures) -> T {
    T::all()
        .into_iter()
        .filter(|tier| {
            tier.requirements()
                .is_some_and(|requirements| host.supports(&requirements))
        })
        .last()
        .unwrap_or_else(T::baseline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::{Amd64Tier, Arm64Tier};

    fn host_for<T: Tier>(tier: T) -> HostFeatures {
        tier.requirements().unwrap_or_default().into_iter().collect()
    }

    #[test]
    fn detects_each_amd64_level() {
        for tier in Amd64Tier::all() {
            let selection = detect::<Amd64Tier>(None, &host_for(tier));
            assert_eq!(selection.tier, tier);
            assert_eq!(selection.source, SelectionSource::Detected);
        }
    }

    #[test]
    fn missing_one_feature_drops_a_level() {
        let host: HostFeatures = Amd64Tier::V3
            .requirements()
            .unwrap()
            .into_iter()
            .filter(|f| *f != "movbe")
            .collect();
        assert_eq!(best_supported::<Amd64Tier>(&host), Amd64Tier::V2);
    }

    #[test]
    fn unknown_host_is_baseline() {
        let host = HostFeatures::default();
        assert_eq!(best_supported::<Amd64Tier>(&host), Amd64Tier::V1);
        assert_eq!(best_supported::<Arm64Tier>(&host), Arm64Tier::baseline());
    }

    #[test]
    fn override_wins_over_hardware() {
        for host in [HostFeatures::default(), host_for(Amd64Tier::V4)] {
            for tier in Amd64Tier::all() {
                let selection = detect::<Amd64Tier>(Some(tier.key().as_str()), &host);
                assert_eq!(selection.tier, tier);
                assert_eq!(selection.source, SelectionSource::Override);
            }
        }
    }

    #[test]
    fn baseline_override_on_richest_host() {
        let selection = detect::<Amd64Tier>(Some("v1"), &host_for(Amd64Tier::V4));
        assert_eq!(selection.tier, Amd64Tier::V1);
    }

    #[test]
    fn unrecognized_override_is_baseline() {
        let selection = detect::<Amd64Tier>(Some("v9"), &host_for(Amd64Tier::V4));
        assert_eq!(selection.tier, Amd64Tier::V1);
        assert_eq!(
            selection.source,
            SelectionSource::UnrecognizedOverride("v9".to_string())
        );

        let selection = detect::<Arm64Tier>(Some("v8.2,sve"), &HostFeatures::default());
        assert_eq!(selection.tier, Arm64Tier::baseline());
    }

    #[test]
    fn empty_override_means_unset() {
        let selection = detect::<Amd64Tier>(Some(""), &host_for(Amd64Tier::V2));
        assert_eq!(selection.tier, Amd64Tier::V2);
        assert_eq!(selection.source, SelectionSource::Detected);
    }

    #[test]
    fn arm64_override_is_canonicalized() {
        let a = detect::<Arm64Tier>(Some("v8.0,lse,crypto"), &HostFeatures::default());
        let b = detect::<Arm64Tier>(Some("v8.0,crypto,lse"), &HostFeatures::default());
        assert_eq!(a.tier, b.tier);
        assert_eq!(a.tier.key(), "v8.0,crypto,lse");
    }

    #[test]
    fn arm64_detection_prefers_crypto_when_present() {
        let mut features = Arm64Tier::parse("v8.2").unwrap().requirements().unwrap();
        assert_eq!(
            best_supported::<Arm64Tier>(&features.iter().copied().collect()).key(),
            "v8.2"
        );
        features.extend(["aes", "sha2"]);
        assert_eq!(
            best_supported::<Arm64Tier>(&features.into_iter().collect()).key(),
            "v8.2,crypto"
        );
    }

    #[test]
    fn arm64_lse_only_host_is_v8_0_lse() {
        let host: HostFeatures = ["lse"].into_iter().collect();
        assert_eq!(best_supported::<Arm64Tier>(&host).key(), "v8.0,lse");
    }

    #[test]
    fn arm64_sve2_host_reaches_v9() {
        let mut features = Arm64Tier::parse("v8.6").unwrap().requirements().unwrap();
        features.push("sve2");
        let host: HostFeatures = features.into_iter().collect();
        assert_eq!(best_supported::<Arm64Tier>(&host).key(), "v9.1");
    }

    #[test]
    fn probe_never_panics() {
        let host = HostFeatures::probe();
        let tier = best_supported::<Amd64Tier>(&host);
        assert!(Amd64Tier::all().contains(&tier));
    }
}
