//! Run-time payload decoder.
//!
//! Decoding is all-or-nothing. The stored stream is checked against its digest
//! before decompression, the output is capped at the recorded size, and anything
//! but exactly that many bytes is an error.

use super::{
    CompressionKind, EmbeddedPayloads, PayloadError, Result, StoredPayload, ZSTD_WINDOW_LOG_MAX,
};
use crate::tier::Tier;
use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use std::io::Read;
use zstd::stream::raw::DParameter;

/// Decodes a payload of family `T`, resolving its dictionary from `payloads`.
///
/// A [`CompressionKind::ZstdDict`] payload is decoded against the baseline tier's
/// image, which is decoded first. The baseline must be self-contained; a chain of
/// dictionaries is rejected.
pub fn decode_payload<T: Tier>(
    payloads: &EmbeddedPayloads<'_>,
    payload: &StoredPayload<'_>,
) -> Result<Vec<u8>> {
    if !payload.compression().is_dictionary() {
        return decode_stream(payload, None);
    }

    let baseline_key = T::baseline().key();
    let baseline = payloads
        .get(&baseline_key)
        .ok_or_else(|| PayloadError::MissingDictionary {
            key: payload.key().to_string(),
            baseline: baseline_key.clone(),
        })?;
    if baseline.compression().is_dictionary() || baseline.key() == payload.key() {
        return Err(PayloadError::DictionaryChain {
            key: payload.key().to_string(),
            baseline: baseline_key,
        });
    }

    log::debug!(
        "decoding dictionary {} for {}",
        baseline.key(),
        payload.key()
    );
    let dictionary = decode_stream(baseline, None)?;
    decode_stream(payload, Some(&dictionary))
}

/// Decodes a single stored stream.
///
/// # Arguments
///
/// * `payload` - The stored payload
/// * `dictionary` - Decoded baseline image for [`CompressionKind::ZstdDict`]
pub fn decode_stream(payload: &StoredPayload<'_>, dictionary: Option<&[u8]>) -> Result<Vec<u8>> {
    let key = payload.key();
    verify_digest(payload)?;

    let expected = usize::try_from(payload.size()).map_err(|_| PayloadError::TooLarge {
        key: key.to_string(),
        size: payload.size(),
    })?;
    let decompress_err = |source| PayloadError::Decompress {
        key: key.to_string(),
        source,
    };

    let image = match payload.compression() {
        CompressionKind::None => payload.bytes().to_vec(),
        CompressionKind::Gzip => {
            let mut image = Vec::with_capacity(expected);
            // One byte of slack so overlong output is caught by the size check.
            GzDecoder::new(payload.bytes())
                .take(payload.size().saturating_add(1))
                .read_to_end(&mut image)
                .map_err(decompress_err)?;
            image
        }
        CompressionKind::Zstd => {
            zstd_decompress(payload.bytes(), None, expected).map_err(decompress_err)?
        }
        CompressionKind::ZstdDict => {
            let dictionary = dictionary.ok_or_else(|| PayloadError::MissingDictionary {
                key: key.to_string(),
                baseline: "<not decoded>".to_string(),
            })?;
            zstd_decompress(payload.bytes(), Some(dictionary), expected).map_err(decompress_err)?
        }
    };

    if image.len() != expected {
        return Err(PayloadError::SizeMismatch {
            key: key.to_string(),
            expected: payload.size(),
            actual: image.len() as u64,
        });
    }

    Ok(image)
}

fn verify_digest(payload: &StoredPayload<'_>) -> Result<()> {
    let actual = Sha256::digest(payload.bytes());
    let matches = hex::decode(payload.digest())
        .map(|expected| expected.as_slice() == actual.as_slice())
        .unwrap_or(false);

    if matches {
        Ok(())
    } else {
        Err(PayloadError::DigestMismatch {
            key: payload.key().to_string(),
        })
    }
}

fn zstd_decompress(
    stream: &[u8],
    dictionary: Option<&[u8]>,
    capacity: usize,
) -> std::io::Result<Vec<u8>> {
    let mut decompressor = match dictionary {
        Some(dictionary) => zstd::bulk::Decompressor::with_dictionary(dictionary)?,
        None => zstd::bulk::Decompressor::new()?,
    };
    decompressor.set_parameter(DParameter::WindowLogMax(ZSTD_WINDOW_LOG_MAX))?;
    decompressor.decompress(stream, capacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::encode_payload;
    use crate::tier::Amd64Tier;

    /// Deterministic pseudo-image: a large shared body with a per-tier delta.
    fn image(seed: u8, len: usize) -> Vec<u8> {
        let mut state = 0x2545_f491_u32;
        let mut out: Vec<u8> = (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            })
            .collect();
        for (i, byte) in out.iter_mut().enumerate().step_by(97) {
            *byte = byte.wrapping_add(seed).wrapping_add(i as u8);
        }
        out
    }

    fn encode_tiers(
        mode: CompressionKind,
        len: usize,
    ) -> Vec<(Vec<u8>, crate::payload::EncodedPayload)> {
        let baseline = image(0, len);
        Amd64Tier::all()
            .into_iter()
            .enumerate()
            .map(|(i, tier)| {
                let img = if i == 0 { baseline.clone() } else { image(i as u8, len) };
                let kind = mode.for_tier(tier == Amd64Tier::baseline());
                let encoded = encode_payload(&tier.key(), &img, kind, Some(&baseline)).unwrap();
                (img, encoded)
            })
            .collect()
    }

    #[test]
    fn every_kind_round_trips() {
        for mode in CompressionKind::ALL {
            let encoded = encode_tiers(mode, 64 * 1024);
            let stored: Vec<_> = encoded.iter().map(|(_, e)| e.as_stored()).collect();
            let payloads = EmbeddedPayloads::new(&stored);

            for ((original, _), payload) in encoded.iter().zip(&stored) {
                let decoded = decode_payload::<Amd64Tier>(&payloads, payload).unwrap();
                assert_eq!(&decoded, original, "{mode} {}", payload.key());
            }
        }
    }

    #[test]
    fn dictionary_shrinks_dependent_tiers() {
        let plain = encode_tiers(CompressionKind::Zstd, 64 * 1024);
        let dict = encode_tiers(CompressionKind::ZstdDict, 64 * 1024);
        assert_eq!(dict[0].1.compression, CompressionKind::Zstd);
        assert_eq!(dict[3].1.compression, CompressionKind::ZstdDict);
        assert!(dict[3].1.bytes.len() < plain[3].1.bytes.len() / 2);
    }

    #[test]
    fn empty_image_round_trips() {
        for mode in [CompressionKind::None, CompressionKind::Gzip, CompressionKind::Zstd] {
            let encoded = encode_payload("v1", &[], mode, None).unwrap();
            assert_eq!(decode_stream(&encoded.as_stored(), None).unwrap(), Vec::<u8>::new());
        }
    }

    #[test]
    fn any_flipped_byte_is_fatal() {
        for mode in CompressionKind::ALL {
            let encoded = encode_tiers(mode, 2048);
            let stored: Vec<_> = encoded.iter().map(|(_, e)| e.as_stored()).collect();
            let (_, target) = &encoded[2];

            for i in 0..target.bytes.len() {
                let mut bytes = target.bytes.clone();
                bytes[i] ^= 0x01;
                let corrupt = StoredPayload::new(
                    &target.key,
                    target.compression,
                    target.size,
                    &target.digest,
                    &bytes,
                );
                let payloads = EmbeddedPayloads::new(&stored);
                let result = decode_payload::<Amd64Tier>(&payloads, &corrupt);
                assert!(
                    matches!(result, Err(PayloadError::DigestMismatch { .. })),
                    "{mode}: flipping byte {i} was not detected"
                );
            }
        }
    }

    #[test]
    fn corrupt_dictionary_source_is_fatal() {
        let encoded = encode_tiers(CompressionKind::ZstdDict, 4096);
        let mut baseline_bytes = encoded[0].1.bytes.clone();
        let last = baseline_bytes.len() - 1;
        baseline_bytes[last] ^= 0xff;

        let mut stored: Vec<_> = encoded.iter().map(|(_, e)| e.as_stored()).collect();
        let b = &encoded[0].1;
        stored[0] = StoredPayload::new(&b.key, b.compression, b.size, &b.digest, &baseline_bytes);
        let payloads = EmbeddedPayloads::new(&stored);

        let err = decode_payload::<Amd64Tier>(&payloads, &stored[2]).unwrap_err();
        assert!(matches!(err, PayloadError::DigestMismatch { key } if key == "v1"));
    }

    #[test]
    fn wrong_recorded_size_is_fatal() {
        for mode in [CompressionKind::None, CompressionKind::Gzip, CompressionKind::Zstd] {
            let encoded = encode_payload("v1", b"0123456789", mode, None).unwrap();
            for size in [9, 11] {
                let stored = StoredPayload::new(
                    &encoded.key,
                    encoded.compression,
                    size,
                    &encoded.digest,
                    &encoded.bytes,
                );
                assert!(decode_stream(&stored, None).is_err(), "{mode} size {size}");
            }
        }
    }

    #[test]
    fn dictionary_chains_are_rejected() {
        let encoded = encode_tiers(CompressionKind::ZstdDict, 4096);
        let dependent = &encoded[1].1;
        // Pretend the baseline entry is itself dictionary-compressed.
        let fake_baseline = StoredPayload::new(
            "v1",
            CompressionKind::ZstdDict,
            dependent.size,
            &dependent.digest,
            &dependent.bytes,
        );
        let stored = [fake_baseline, encoded[2].1.as_stored()];
        let payloads = EmbeddedPayloads::new(&stored);

        let err = decode_payload::<Amd64Tier>(&payloads, &stored[1]).unwrap_err();
        assert!(matches!(err, PayloadError::DictionaryChain { .. }));
        let err = decode_payload::<Amd64Tier>(&payloads, &stored[0]).unwrap_err();
        assert!(matches!(err, PayloadError::DictionaryChain { .. }));
    }

    #[test]
    fn missing_baseline_is_fatal() {
        let encoded = encode_tiers(CompressionKind::ZstdDict, 4096);
        let stored = [encoded[3].1.as_stored()];
        let payloads = EmbeddedPayloads::new(&stored);

        let err = decode_payload::<Amd64Tier>(&payloads, &stored[0]).unwrap_err();
        assert!(matches!(err, PayloadError::MissingDictionary { .. }));
    }
}
