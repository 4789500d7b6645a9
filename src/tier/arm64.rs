//! ARMv8/ARMv9 architecture levels (`GOARM64`).
//!
//! A key is an architecture version optionally followed by sub-features, e.g.
//! `v8.2,crypto` or `v8.0,crypto,lse`. Sub-features come from the closed set
//! `{crypto, lse}` and are always rendered in that order. `lse` is mandatory from
//! ARMv8.1 on, so it only appears in `v8.0` keys: `v8.1,lse` is the same tier as
//! `v8.1`.

use super::Tier;
use std::fmt;

const V8_1: &[&str] = &["crc", "lse", "rdm"];
const V8_2: &[&str] = &["dpb"];
const V8_3: &[&str] = &["rcpc", "jsconv", "fcma", "paca", "pacg"];
const V8_4: &[&str] = &["dit", "flagm", "lse2", "rcpc2"];
const V8_5: &[&str] = &["sb", "ssbs", "frintts", "bti", "dpb2"];
const V8_6: &[&str] = &["bf16", "i8mm"];
const V9: &[&str] = &["sve2"];
const CRYPTO: &[&str] = &["aes", "sha2"];

/// Architecture version component of an [`Arm64Tier`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Arm64Level {
    V8_0,
    V8_1,
    V8_2,
    V8_3,
    V8_4,
    V8_5,
    V8_6,
    V8_7,
    V8_8,
    V8_9,
    V9_0,
    V9_1,
    V9_2,
    V9_3,
    V9_4,
    V9_5,
}

impl Arm64Level {
    const ALL: [Self; 16] = [
        Self::V8_0,
        Self::V8_1,
        Self::V8_2,
        Self::V8_3,
        Self::V8_4,
        Self::V8_5,
        Self::V8_6,
        Self::V8_7,
        Self::V8_8,
        Self::V8_9,
        Self::V9_0,
        Self::V9_1,
        Self::V9_2,
        Self::V9_3,
        Self::V9_4,
        Self::V9_5,
    ];

    /// Version string as used in `GOARM64`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V8_0 => "v8.0",
            Self::V8_1 => "v8.1",
            Self::V8_2 => "v8.2",
            Self::V8_3 => "v8.3",
            Self::V8_4 => "v8.4",
            Self::V8_5 => "v8.5",
            Self::V8_6 => "v8.6",
            Self::V8_7 => "v8.7",
            Self::V8_8 => "v8.8",
            Self::V8_9 => "v8.9",
            Self::V9_0 => "v9.0",
            Self::V9_1 => "v9.1",
            Self::V9_2 => "v9.2",
            Self::V9_3 => "v9.3",
            Self::V9_4 => "v9.4",
            Self::V9_5 => "v9.5",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.as_str() == s)
    }

    /// Features that confirm this level on a running host.
    ///
    /// Levels whose defining features the standard library cannot probe return
    /// `None`.
    fn requirements(&self) -> Option<Vec<&'static str>> {
        let parts: &[&[&str]] = match self {
            Self::V8_0 => &[],
            Self::V8_1 => &[V8_1],
            Self::V8_2 => &[V8_1, V8_2],
            Self::V8_3 => &[V8_1, V8_2, V8_3],
            Self::V8_4 => &[V8_1, V8_2, V8_3, V8_4],
            Self::V8_5 => &[V8_1, V8_2, V8_3, V8_4, V8_5],
            Self::V8_6 => &[V8_1, V8_2, V8_3, V8_4, V8_5, V8_6],
            Self::V9_0 => &[V8_1, V8_2, V8_3, V8_4, V8_5, V9],
            Self::V9_1 => &[V8_1, V8_2, V8_3, V8_4, V8_5, V8_6, V9],
            Self::V8_7
            | Self::V8_8
            | Self::V8_9
            | Self::V9_2
            | Self::V9_3
            | Self::V9_4
            | Self::V9_5 => return None,
        };
        Some(parts.iter().flat_map(|p| p.iter().copied()).collect())
    }
}

/// One `GOARM64` tier: an architecture level plus optional sub-features.
///
/// Field order drives the derived ordering: level first, then `crypto`, then
/// `lse`, which is also the enumeration order of [`Tier::all`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Arm64Tier {
    level: Arm64Level,
    crypto: bool,
    lse: bool,
}

impl Arm64Tier {
    /// Builds a tier, dropping `lse` where the level already implies it.
    pub fn new(level: Arm64Level, crypto: bool, lse: bool) -> Self {
        Self {
            level,
            crypto,
            lse: lse && level == Arm64Level::V8_0,
        }
    }

    pub fn level(&self) -> Arm64Level {
        self.level
    }

    pub fn crypto(&self) -> bool {
        self.crypto
    }

    /// Whether LSE atomics are part of this tier, explicitly or by level.
    pub fn lse(&self) -> bool {
        self.lse || self.level > Arm64Level::V8_0
    }
}

impl Tier for Arm64Tier {
    const ENV_VAR: &'static str = "GOARM64";
    const GOARCH: &'static str = "arm64";
    const TYPE_PATH: &'static str = "kodegen_bundler_microarch::tier::Arm64Tier";
    // EM_AARCH64
    const ELF_MACHINE: u16 = 183;

    fn baseline() -> Self {
        Self::new(Arm64Level::V8_0, false, false)
    }

    fn all() -> Vec<Self> {
        let mut tiers = Vec::new();
        for level in Arm64Level::ALL {
            if level == Arm64Level::V8_0 {
                for (crypto, lse) in [(false, false), (false, true), (true, false), (true, true)] {
                    tiers.push(Self::new(level, crypto, lse));
                }
            } else {
                tiers.push(Self::new(level, false, false));
                tiers.push(Self::new(level, true, false));
            }
        }
        tiers
    }

    fn parse(key: &str) -> Option<Self> {
        let mut parts = key.split(',');
        let level = Arm64Level::parse(parts.next()?)?;

        let (mut crypto, mut lse) = (false, false);
        for option in parts {
            let seen = match option {
                "crypto" => &mut crypto,
                "lse" => &mut lse,
                _ => return None,
            };
            if *seen {
                return None;
            }
            *seen = true;
        }

        Some(Self::new(level, crypto, lse))
    }

    fn requirements(&self) -> Option<Vec<&'static str>> {
        let mut features = self.level.requirements()?;
        if self.crypto {
            features.extend_from_slice(CRYPTO);
        }
        if self.lse && !features.contains(&"lse") {
            features.push("lse");
        }
        Some(features)
    }
}

impl fmt::Display for Arm64Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.level.as_str())?;
        if self.crypto {
            f.write_str(",crypto")?;
        }
        if self.lse {
            f.write_str(",lse")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_feature_order_is_canonical() {
        let a = Arm64Tier::parse("v8.0,lse,crypto").unwrap();
        let b = Arm64Tier::parse("v8.0,crypto,lse").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "v8.0,crypto,lse");
    }

    #[test]
    fn lse_is_implied_from_v8_1() {
        let tier = Arm64Tier::parse("v8.1,lse").unwrap();
        assert_eq!(tier, Arm64Tier::parse("v8.1").unwrap());
        assert_eq!(tier.to_string(), "v8.1");
        assert!(tier.lse());

        let tier = Arm64Tier::parse("v9.2,lse,crypto").unwrap();
        assert_eq!(tier.to_string(), "v9.2,crypto");
    }

    #[test]
    fn unknown_or_repeated_parts_are_rejected() {
        for key in [
            "", "v8", "v8.10", "v10.0", "v8.0,", "v8.0,sve", "v8.0,crypto,crypto", "v8.0,lse,lse",
            "V8.0", "v8.0 ,crypto",
        ] {
            assert_eq!(Arm64Tier::parse(key), None, "{key:?}");
        }
    }

    #[test]
    fn enumeration_matches_the_goarm64_key_set() {
        let all = Arm64Tier::all();
        assert_eq!(all.len(), 34);
        assert!(all.windows(2).all(|w| w[0] < w[1]));

        let keys: Vec<String> = all.iter().map(ToString::to_string).collect();
        assert_eq!(
            &keys[..6],
            ["v8.0", "v8.0,lse", "v8.0,crypto", "v8.0,crypto,lse", "v8.1", "v8.1,crypto"]
        );
        assert_eq!(keys.last().map(String::as_str), Some("v9.5,crypto"));
    }

    #[test]
    fn crypto_adds_aes_and_sha2() {
        let plain = Arm64Tier::parse("v8.2").unwrap().requirements().unwrap();
        let crypto = Arm64Tier::parse("v8.2,crypto").unwrap().requirements().unwrap();
        assert!(!plain.contains(&"aes"));
        assert!(crypto.contains(&"aes") && crypto.contains(&"sha2"));
    }

    #[test]
    fn unprobeable_levels_have_no_requirements() {
        assert_eq!(Arm64Tier::parse("v8.7").unwrap().requirements(), None);
        assert_eq!(Arm64Tier::parse("v9.5,crypto").unwrap().requirements(), None);
        assert!(Arm64Tier::parse("v9.1").unwrap().requirements().unwrap().contains(&"sve2"));
    }
}
