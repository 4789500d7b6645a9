//! x86-64 microarchitecture levels (`GOAMD64`).

use super::Tier;
use std::fmt;

const V2_FEATURES: &[&str] = &["cmpxchg16b", "popcnt", "sse3", "ssse3", "sse4.1", "sse4.2"];
const V3_FEATURES: &[&str] = &[
    "avx", "avx2", "bmi1", "bmi2", "f16c", "fma", "lzcnt", "movbe", "xsave",
];
const V4_FEATURES: &[&str] = &["avx512f", "avx512bw", "avx512cd", "avx512dq", "avx512vl"];

/// x86-64 psABI microarchitecture level.
///
/// Ordered from least to most capable, so `V3 > V2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Amd64Tier {
    /// Baseline x86-64 (SSE2)
    V1,
    /// SSE4.2, SSSE3, POPCNT, CMPXCHG16B
    V2,
    /// AVX2, BMI1/2, FMA, MOVBE
    V3,
    /// AVX-512 F/BW/CD/DQ/VL
    V4,
}

impl Tier for Amd64Tier {
    const ENV_VAR: &'static str = "GOAMD64";
    const GOARCH: &'static str = "amd64";
    const TYPE_PATH: &'static str = "kodegen_bundler_microarch::tier::Amd64Tier";
    // EM_X86_64
    const ELF_MACHINE: u16 = 62;

    fn baseline() -> Self {
        Self::V1
    }

    fn all() -> Vec<Self> {
        vec![Self::V1, Self::V2, Self::V3, Self::V4]
    }

    fn parse(key: &str) -> Option<Self> {
        match key {
            "v1" => Some(Self::V1),
            "v2" => Some(Self::V2),
            "v3" => Some(Self::V3),
            "v4" => Some(Self::V4),
            _ => None,
        }
    }

    fn requirements(&self) -> Option<Vec<&'static str>> {
        let levels: &[&[&str]] = match self {
            Self::V1 => &[],
            Self::V2 => &[V2_FEATURES],
            Self::V3 => &[V2_FEATURES, V3_FEATURES],
            Self::V4 => &[V2_FEATURES, V3_FEATURES, V4_FEATURES],
        };
        Some(levels.iter().flat_map(|l| l.iter().copied()).collect())
    }
}

impl fmt::Display for Amd64Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
            Self::V3 => "v3",
            Self::V4 => "v4",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_only_exact_levels() {
        assert_eq!(Amd64Tier::parse("v3"), Some(Amd64Tier::V3));
        assert_eq!(Amd64Tier::parse("V3"), None);
        assert_eq!(Amd64Tier::parse("v5"), None);
        assert_eq!(Amd64Tier::parse(" v2"), None);
        assert_eq!(Amd64Tier::parse(""), None);
    }

    #[test]
    fn requirements_are_cumulative() {
        let v2 = Amd64Tier::V2.requirements().unwrap();
        let v3 = Amd64Tier::V3.requirements().unwrap();
        let v4 = Amd64Tier::V4.requirements().unwrap();
        assert!(v2.iter().all(|f| v3.contains(f)));
        assert!(v3.iter().all(|f| v4.contains(f)));
        assert!(v3.contains(&"avx2"));
        assert!(!v3.contains(&"avx512f"));
    }

    #[test]
    fn tiers_are_ordered() {
        let all = Amd64Tier::all();
        assert!(all.windows(2).all(|w| w[0] < w[1]));
    }
}
