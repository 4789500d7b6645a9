use super::LaunchError;
use crate::payload::{EmbeddedPayloads, StoredPayload};
use crate::tier::Tier;

/// Returns the stored payload for `tier`.
///
/// A correctly packaged launcher embeds every tier of its family, so a miss
/// means the table was built wrong. It is reported, never papered over with a
/// different tier.
pub fn select<'a, T: Tier>(
    payloads: &EmbeddedPayloads<'a>,
    tier: T,
) -> Result<&'a StoredPayload<'a>, LaunchError> {
    payloads
        .get(&tier.key())
        .ok_or_else(|| LaunchError::MissingPayload {
            env_var: T::ENV_VAR,
            tier: tier.key(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::CompressionKind;
    use crate::tier::Amd64Tier;

    static ENTRIES: [StoredPayload<'static>; 4] = [
        StoredPayload::new("v1", CompressionKind::None, 0, "", b""),
        StoredPayload::new("v2", CompressionKind::None, 0, "", b""),
        StoredPayload::new("v3", CompressionKind::None, 0, "", b""),
        StoredPayload::new("v4", CompressionKind::None, 0, "", b""),
    ];

    #[test]
    fn every_tier_has_a_payload() {
        let payloads = EmbeddedPayloads::new(&ENTRIES);
        for tier in Amd64Tier::all() {
            assert_eq!(select(&payloads, tier).unwrap().key(), tier.key());
        }
    }

    #[test]
    fn missing_tier_is_an_error() {
        let payloads = EmbeddedPayloads::new(&ENTRIES[..2]);
        let err = select(&payloads, Amd64Tier::V3).unwrap_err();
        assert_eq!(err.to_string(), "no payload embedded for GOAMD64=v3");
    }
}
