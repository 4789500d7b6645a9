//! Stored payload representation shared by the packager and the launcher.
//!
//! A payload is one tier's executable image. The packager encodes it into a
//! [`StoredPayload`] (compression tag, stream, decoded size and the SHA-256 of the
//! stream) and the generated launcher embeds every tier's stored form in an
//! [`EmbeddedPayloads`] table.
//!
//! # Module Organization
//!
//! - [`decode`] - reverses the encoder, resolving the baseline dictionary
//! - [`encode`] - compresses images at packaging time
//! - [`table`] - the embedded, read-only table of stored payloads

pub mod decode;
pub mod encode;
pub mod table;

pub use decode::decode_payload;
pub use encode::{EncodedPayload, encode_payload};
pub use table::EmbeddedPayloads;

use std::{fmt, str::FromStr};
use thiserror::Error;

/// Largest dictionary zstd accepts.
pub const MAX_ZSTD_DICT: usize = 1 << 31;

/// Upper bound of the zstd window the decoder accepts (2 GiB).
pub const ZSTD_WINDOW_LOG_MAX: u32 = 31;

/// Result type alias for payload operations
pub type Result<T> = std::result::Result<T, PayloadError>;

/// Encoding and decoding failures.
///
/// At run time every variant is fatal: an image that does not decode to exactly
/// the packaged bytes is never executed.
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("payload {key}: stored bytes do not match their digest")]
    DigestMismatch { key: String },

    #[error("payload {key}: decompression failed: {source}")]
    Decompress {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("payload {key}: compression failed: {source}")]
    Compress {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("payload {key}: decoded {actual} bytes, expected {expected}")]
    SizeMismatch {
        key: String,
        expected: u64,
        actual: u64,
    },

    #[error("payload {key}: {size} bytes does not fit in memory on this platform")]
    TooLarge { key: String, size: u64 },

    #[error("payload {key}: dictionary-compressed but no baseline payload {baseline} is embedded")]
    MissingDictionary { key: String, baseline: String },

    #[error("payload {key}: dictionary source {baseline} is itself dictionary-compressed")]
    DictionaryChain { key: String, baseline: String },

    #[error("dictionary of {size} bytes exceeds the zstd maximum of {max} bytes")]
    DictionaryTooLarge { size: usize, max: usize },
}

/// Compression applied to a stored payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompressionKind {
    /// Stored as-is
    None,
    /// gzip (deflate) stream
    Gzip,
    /// zstd frame with a large window
    Zstd,
    /// zstd frame primed with the baseline tier's decoded image
    ZstdDict,
}

impl CompressionKind {
    /// All kinds, in tag order.
    pub const ALL: [Self; 4] = [Self::None, Self::Gzip, Self::Zstd, Self::ZstdDict];

    /// Whether decoding needs the baseline payload first.
    pub fn is_dictionary(&self) -> bool {
        matches!(self, Self::ZstdDict)
    }

    /// Kind actually used for one tier when `self` is the packaging mode.
    ///
    /// The baseline is the dictionary source and must stay self-contained, so in
    /// dictionary mode it falls back to plain zstd.
    pub fn for_tier(self, is_baseline: bool) -> Self {
        match self {
            Self::ZstdDict if is_baseline => Self::Zstd,
            other => other,
        }
    }

    /// Variant name, as written into generated launcher code.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Gzip => "Gzip",
            Self::Zstd => "Zstd",
            Self::ZstdDict => "ZstdDict",
        }
    }
}

impl fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Zstd => "zstd",
            Self::ZstdDict => "zstd-dict",
        })
    }
}

impl FromStr for CompressionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.to_string() == s)
            .ok_or_else(|| {
                format!("unknown compression {s:?} (expected one of: none, gzip, zstd, zstd-dict)")
            })
    }
}

/// One tier's stored payload as embedded in a launcher.
#[derive(Clone, Copy, Debug)]
pub struct StoredPayload<'a> {
    key: &'a str,
    compression: CompressionKind,
    size: u64,
    digest: &'a str,
    bytes: &'a [u8],
}

impl<'a> StoredPayload<'a> {
    /// Creates a stored payload entry.
    ///
    /// # Arguments
    ///
    /// * `key` - Canonical tier key
    /// * `compression` - How `bytes` are encoded
    /// * `size` - Length of the decoded image
    /// * `digest` - Lowercase hex SHA-256 of `bytes`
    /// * `bytes` - The stored stream
    pub const fn new(
        key: &'a str,
        compression: CompressionKind,
        size: u64,
        digest: &'a str,
        bytes: &'a [u8],
    ) -> Self {
        Self {
            key,
            compression,
            size,
            digest,
            bytes,
        }
    }

    pub fn key(&self) -> &'a str {
        self.key
    }

    pub fn compression(&self) -> CompressionKind {
        self.compression
    }

    /// Length of the decoded image.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn digest(&self) -> &'a str {
        self.digest
    }

    /// The stored (possibly compressed) stream.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }
}
