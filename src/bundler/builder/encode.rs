//! Variant validation and payload encoding.
//!
//! Each variant is checked to be an executable ELF image for the family's
//! machine, then encoded and written out as a blob for the launcher crate to
//! embed. Compression runs on the blocking pool.

use super::variants::Variant;
use crate::bundler::error::{Error, ErrorExt, Result};
use crate::payload::{CompressionKind, EncodedPayload, encode_payload};
use crate::tier::Tier;
use goblin::elf::{
    Elf,
    header::{ET_DYN, ET_EXEC, machine_to_str},
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::task::JoinSet;

/// One encoded tier, written to disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayloadBlob<T> {
    pub tier: T,
    pub compression: CompressionKind,
    /// Decoded image length
    pub size: u64,
    /// Hex SHA-256 of the blob
    pub digest: String,
    /// Blob length on disk
    pub stored_size: u64,
    pub path: PathBuf,
}

impl<T: Tier> PayloadBlob<T> {
    pub fn file_name(&self) -> String {
        format!("{}.bin", self.tier.file_stem())
    }
}

/// Checks that `image` is an ELF executable for `machine`.
pub fn check_elf(image: &[u8], machine: u16) -> std::result::Result<(), String> {
    let elf = Elf::parse(image).map_err(|e| format!("not an ELF image: {e}"))?;

    if elf.header.e_machine != machine {
        return Err(format!(
            "built for {}, expected {}",
            machine_to_str(elf.header.e_machine),
            machine_to_str(machine)
        ));
    }
    if !matches!(elf.header.e_type, ET_EXEC | ET_DYN) {
        return Err(format!("ELF type {} is not executable", elf.header.e_type));
    }

    Ok(())
}

/// Reads and validates a built variant.
pub async fn load_variant<T: Tier>(variant: &Variant<T>) -> Result<Vec<u8>> {
    let image = tokio::fs::read(&variant.path)
        .await
        .fs_context("reading variant", &variant.path)?;
    check_elf(&image, T::ELF_MACHINE).map_err(|reason| Error::InvalidVariant {
        path: variant.path.clone(),
        reason,
    })?;
    Ok(image)
}

/// Encodes every variant into `payload_dir`.
///
/// With [`CompressionKind::ZstdDict`] the baseline is encoded as plain zstd
/// and every other tier against the baseline's image. Blobs come back in the
/// order of `variants`.
pub async fn encode_variants<T: Tier>(
    variants: &[Variant<T>],
    compression: CompressionKind,
    payload_dir: &Path,
) -> Result<Vec<PayloadBlob<T>>> {
    tokio::fs::create_dir_all(payload_dir)
        .await
        .fs_context("creating payload directory", payload_dir)?;

    let baseline = variants
        .iter()
        .find(|variant| variant.tier == T::baseline())
        .ok_or_else(|| {
            Error::GenericError(format!(
                "no baseline variant {}={} was built",
                T::ENV_VAR,
                T::baseline()
            ))
        })?;
    let dictionary: Option<Arc<Vec<u8>>> = if compression.is_dictionary() {
        Some(Arc::new(load_variant(baseline).await?))
    } else {
        None
    };

    let mut tasks = JoinSet::new();
    for (index, variant) in variants.iter().enumerate() {
        let image = load_variant(variant).await?;
        let kind = compression.for_tier(variant.tier == T::baseline());
        let dictionary = dictionary.clone();
        let tier = variant.tier;

        tasks.spawn_blocking(move || {
            let encoded =
                encode_payload(&tier.key(), &image, kind, dictionary.as_deref().map(Vec::as_slice))?;
            Ok::<_, Error>((index, tier, encoded))
        });
    }

    let mut blobs = Vec::with_capacity(variants.len());
    while let Some(joined) = tasks.join_next().await {
        let (index, tier, encoded) = joined??;
        let blob = write_blob(tier, encoded, payload_dir).await?;
        log::info!(
            "Encoded {}={}: {} -> {} bytes ({})",
            T::ENV_VAR,
            blob.tier,
            blob.size,
            blob.stored_size,
            blob.compression
        );
        blobs.push((index, blob));
    }

    blobs.sort_by_key(|(index, _)| *index);
    Ok(blobs.into_iter().map(|(_, blob)| blob).collect())
}

async fn write_blob<T: Tier>(
    tier: T,
    encoded: EncodedPayload,
    payload_dir: &Path,
) -> Result<PayloadBlob<T>> {
    let mut blob = PayloadBlob {
        tier,
        compression: encoded.compression,
        size: encoded.size,
        digest: encoded.digest,
        stored_size: encoded.bytes.len() as u64,
        path: PathBuf::new(),
    };
    blob.path = payload_dir.join(blob.file_name());
    tokio::fs::write(&blob.path, &encoded.bytes)
        .await
        .fs_context("writing payload", &blob.path)?;
    Ok(blob)
}
