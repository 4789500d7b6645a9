//! Packaging-time payload encoder.

use super::{CompressionKind, MAX_ZSTD_DICT, PayloadError, Result, StoredPayload};
use flate2::{Compression, write::GzEncoder};
use sha2::{Digest, Sha256};
use std::io::Write;
use zstd::stream::raw::CParameter;

/// zstd level used for every payload.
pub const ZSTD_LEVEL: i32 = 19;

/// Smallest window zstd allows.
const ZSTD_WINDOW_LOG_MIN: u32 = 10;

/// An encoded payload owning its stream.
#[derive(Clone, Debug)]
pub struct EncodedPayload {
    pub key: String,
    pub compression: CompressionKind,
    pub size: u64,
    pub digest: String,
    pub bytes: Vec<u8>,
}

impl EncodedPayload {
    /// Borrows this payload in its embedded form.
    pub fn as_stored(&self) -> StoredPayload<'_> {
        StoredPayload::new(
            &self.key,
            self.compression,
            self.size,
            &self.digest,
            &self.bytes,
        )
    }
}

/// Encodes one executable image.
///
/// # Arguments
///
/// * `key` - Canonical tier key of the image
/// * `image` - The raw executable bytes
/// * `compression` - Encoding to apply
/// * `dictionary` - Baseline image; required by, and only used with,
///   [`CompressionKind::ZstdDict`]
pub fn encode_payload(
    key: &str,
    image: &[u8],
    compression: CompressionKind,
    dictionary: Option<&[u8]>,
) -> Result<EncodedPayload> {
    let compress_err = |source| PayloadError::Compress {
        key: key.to_string(),
        source,
    };

    let bytes = match compression {
        CompressionKind::None => image.to_vec(),
        CompressionKind::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
            encoder.write_all(image).map_err(compress_err)?;
            encoder.finish().map_err(compress_err)?
        }
        CompressionKind::Zstd => zstd_compress(image, None).map_err(compress_err)?,
        CompressionKind::ZstdDict => {
            let dictionary = dictionary.ok_or_else(|| PayloadError::MissingDictionary {
                key: key.to_string(),
                baseline: "<none supplied>".to_string(),
            })?;
            if dictionary.len() > MAX_ZSTD_DICT {
                return Err(PayloadError::DictionaryTooLarge {
                    size: dictionary.len(),
                    max: MAX_ZSTD_DICT,
                });
            }
            zstd_compress(image, Some(dictionary)).map_err(compress_err)?
        }
    };

    log::debug!(
        "encoded {key} with {compression}: {} -> {} bytes",
        image.len(),
        bytes.len()
    );

    Ok(EncodedPayload {
        key: key.to_string(),
        compression,
        size: image.len() as u64,
        digest: hex::encode(Sha256::digest(&bytes)),
        bytes,
    })
}

fn zstd_compress(image: &[u8], dictionary: Option<&[u8]>) -> std::io::Result<Vec<u8>> {
    let mut compressor = match dictionary {
        Some(dictionary) => zstd::bulk::Compressor::with_dictionary(ZSTD_LEVEL, dictionary)?,
        None => zstd::bulk::Compressor::new(ZSTD_LEVEL)?,
    };

    let reach = image.len() + dictionary.map_or(0, <[u8]>::len);
    compressor.set_parameter(CParameter::WindowLog(window_log_for(reach)))?;
    compressor.set_parameter(CParameter::ChecksumFlag(true))?;
    compressor.set_parameter(CParameter::ContentSizeFlag(true))?;
    if dictionary.is_none() {
        compressor.set_parameter(CParameter::EnableLongDistanceMatching(true))?;
    }

    compressor.compress(image)
}

/// Smallest window covering `len` bytes, within zstd's limits.
fn window_log_for(len: usize) -> u32 {
    let needed = usize::BITS - len.saturating_sub(1).leading_zeros();
    needed.clamp(ZSTD_WINDOW_LOG_MIN, super::ZSTD_WINDOW_LOG_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_covers_the_input() {
        assert_eq!(window_log_for(0), ZSTD_WINDOW_LOG_MIN);
        assert_eq!(window_log_for(1024), 10);
        assert_eq!(window_log_for(1025), 11);
        assert_eq!(window_log_for(64 << 20), 26);
        assert_eq!(window_log_for(usize::MAX), super::super::ZSTD_WINDOW_LOG_MAX);
    }

    #[test]
    fn digest_covers_the_stored_stream() {
        let encoded = encode_payload("v1", b"hello", CompressionKind::None, None).unwrap();
        assert_eq!(encoded.bytes, b"hello");
        assert_eq!(encoded.size, 5);
        assert_eq!(
            encoded.digest,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn dictionary_mode_needs_a_dictionary() {
        let err = encode_payload("v2", b"image", CompressionKind::ZstdDict, None).unwrap_err();
        assert!(matches!(err, PayloadError::MissingDictionary { .. }));
    }
}
